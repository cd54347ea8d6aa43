use serde_json::json;

use super::*;

fn lead(id: usize, name: &str, company: &str, status: &str) -> Record {
    serde_json::from_value(json!({
        "id": format!("lead-{id}"),
        "name": name,
        "company": company,
        "email": format!("contact{id}@{}.test", company.to_lowercase().replace(' ', "")),
        "status": status,
        "value": 1000 * id,
        "assigned_to": null,
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-01T10:00:00Z"
    }))
    .expect("lead fixture")
}

fn sample_snapshot() -> Vec<Record> {
    let companies = ["Tech Corp", "Acme Inc", "Global Ltd", "Innovation Co"];
    let statuses = ["New", "Contacted", "Qualified", "Proposal", "Negotiation"];
    (1..=23)
        .map(|i| {
            lead(
                i,
                &format!("Lead {i}"),
                companies[i % companies.len()],
                statuses[i % statuses.len()],
            )
        })
        .collect()
}

fn filters() -> Vec<(String, StatusFilter)> {
    let mut out = Vec::new();
    for term in ["", "acme", "LEAD 1", "corp", "nothing-matches", "@global"] {
        for status in ["all", "New", "Proposal", "Unknown"] {
            out.push((term.to_string(), StatusFilter::parse(status)));
        }
    }
    out
}

#[test]
fn filtered_view_is_exactly_the_matching_records() {
    let snapshot = sample_snapshot();
    for (term, status) in filters() {
        let filtered = filter_records(&snapshot, &CollectionSpec::LEADS, &term, &status);

        for record in &filtered {
            assert!(snapshot.contains(record));
            assert!(matches(record, &CollectionSpec::LEADS, &term, &status));
        }
        let expected = snapshot
            .iter()
            .filter(|record| matches(record, &CollectionSpec::LEADS, &term, &status))
            .count();
        assert_eq!(filtered.len(), expected, "term={term:?} status={status:?}");
    }
}

#[test]
fn filtered_view_keeps_snapshot_order() {
    let snapshot = sample_snapshot();
    let filtered = filter_records(&snapshot, &CollectionSpec::LEADS, "acme", &StatusFilter::All);
    let positions: Vec<usize> = filtered
        .iter()
        .map(|record| snapshot.iter().position(|r| r.id == record.id).expect("present"))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn search_is_case_insensitive_against_stored_case() {
    let snapshot = vec![
        lead(1, "Ada", "Acme Inc", "New"),
        lead(2, "Grace", "Tech Corp", "New"),
    ];
    let filtered = filter_records(&snapshot, &CollectionSpec::LEADS, "acme", &StatusFilter::All);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].text("company"), Some("Acme Inc"));
}

#[test]
fn status_filter_requires_exact_status() {
    let snapshot = vec![
        lead(1, "Ada", "Acme Inc", "New"),
        lead(2, "Grace", "Acme Inc", "Qualified"),
    ];
    let filtered = filter_records(
        &snapshot,
        &CollectionSpec::LEADS,
        "",
        &StatusFilter::Only("Qualified".into()),
    );
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, RecordId::from("lead-2"));
}

#[test]
fn pages_never_exceed_page_size_and_concatenate_to_the_view() {
    let snapshot = sample_snapshot();
    for page_size in 1..=25 {
        let mut rebuilt = Vec::new();
        for page_index in 0..page_count(snapshot.len(), page_size) {
            let page = paginate(&snapshot, page_index, page_size);
            assert!(page.len() <= page_size);
            assert_eq!(page.page_index, page_index);
            rebuilt.extend(page.records);
        }
        assert_eq!(rebuilt, snapshot, "page_size={page_size}");
    }
}

#[test]
fn twelve_records_split_into_ten_and_two() {
    let snapshot: Vec<Record> = sample_snapshot().into_iter().take(12).collect();

    assert_eq!(paginate(&snapshot, 0, 10).len(), 10);
    assert_eq!(paginate(&snapshot, 1, 10).len(), 2);

    let clamped = paginate(&snapshot, 5, 10);
    assert_eq!(clamped.page_index, 1);
    assert_eq!(clamped.len(), 2);
}

#[test]
fn empty_view_clamps_to_first_page() {
    let page = paginate(&[], 3, 10);
    assert_eq!(page.page_index, 0);
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn zero_page_size_is_treated_as_one() {
    let snapshot = sample_snapshot();
    let page = paginate(&snapshot, 2, 0);
    assert_eq!(page.page_size, 1);
    assert_eq!(page.len(), 1);
    assert_eq!(page.records[0].id, snapshot[2].id);
}

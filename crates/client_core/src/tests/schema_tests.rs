use serde_json::json;

use super::*;

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be an object"),
    }
}

fn valid_lead() -> Fields {
    fields(json!({
        "name": "Ada Lovelace",
        "company": "Acme Inc",
        "email": "ada@acme.test",
        "phone": "+1 555-0100",
        "status": "New",
        "value": 5000,
        "assigned_to": null
    }))
}

#[test]
fn accepts_complete_lead() {
    let accepted = FieldSchema::LEADS
        .validate(&valid_lead(), ValidationMode::Create)
        .expect("valid lead");
    assert_eq!(accepted.len(), 7);
}

#[test]
fn strips_unknown_columns() {
    let mut lead = valid_lead();
    lead.insert("is_admin".into(), json!(true));

    let accepted = FieldSchema::LEADS
        .validate(&lead, ValidationMode::Create)
        .expect("valid lead");
    assert!(!accepted.contains_key("is_admin"));
}

#[test]
fn reports_every_failing_field() {
    let lead = fields(json!({
        "name": "A",
        "company": "Acme Inc",
        "email": "not-an-email",
        "status": "Won",
        "value": -1,
        "assigned_to": null
    }));

    let failures = FieldSchema::LEADS
        .validate(&lead, ValidationMode::Create)
        .expect_err("must fail");
    let names: Vec<&str> = failures.iter().map(|f| f.field.as_str()).collect();

    assert_eq!(names, vec!["name", "email", "status", "value"]);
    assert_eq!(failures[0].message, "Name must be at least 2 characters");
    assert_eq!(failures[1].message, "Invalid email address");
    assert_eq!(failures[3].message, "Value must be positive");
}

#[test]
fn create_requires_missing_columns_but_update_does_not() {
    let partial = fields(json!({ "status": "Contacted" }));

    let failures = FieldSchema::LEADS
        .validate(&partial, ValidationMode::Create)
        .expect_err("create needs all required columns");
    assert!(failures.iter().any(|f| f.field == "name" && f.message == "Required"));

    let accepted = FieldSchema::LEADS
        .validate(&partial, ValidationMode::Update)
        .expect("partial update");
    assert_eq!(accepted, partial);
}

#[test]
fn rejects_wrong_types() {
    let partial = fields(json!({ "value": "lots", "name": 7 }));
    let failures = FieldSchema::LEADS
        .validate(&partial, ValidationMode::Update)
        .expect_err("must fail");

    assert!(failures
        .iter()
        .any(|f| f.field == "value" && f.message == "Expected number"));
    assert!(failures
        .iter()
        .any(|f| f.field == "name" && f.message == "Expected string"));
}

#[test]
fn status_color_must_be_hex() {
    let status = fields(json!({ "status_name": "Cold", "status_color": "blue" }));
    let failures = FieldSchema::LEAD_STATUSES
        .validate(&status, ValidationMode::Create)
        .expect_err("must fail");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field, "status_color");

    let status = fields(json!({ "status_name": "Cold", "status_color": "#4CAF50" }));
    assert!(FieldSchema::LEAD_STATUSES
        .validate(&status, ValidationMode::Create)
        .is_ok());
}

#[test]
fn status_updates_carry_a_fresh_updated_at() {
    let before = chrono::Utc::now();
    let patch = fields(json!({ "status_color": "#FF9800", "updated_at": "1999-01-01T00:00:00Z" }));

    let accepted = FieldSchema::LEAD_STATUSES
        .validate(&patch, ValidationMode::Update)
        .expect("valid patch");

    let stamp = accepted
        .get("updated_at")
        .and_then(Value::as_str)
        .expect("updated_at stamped");
    let stamp = chrono::DateTime::parse_from_rfc3339(stamp).expect("rfc3339");
    assert!(stamp >= before - chrono::Duration::seconds(1));
    assert_eq!(accepted.get("status_color"), Some(&json!("#FF9800")));

    let created = FieldSchema::LEAD_STATUSES
        .validate(
            &fields(json!({ "status_name": "Cold", "status_color": "#4CAF50" })),
            ValidationMode::Create,
        )
        .expect("valid status");
    assert!(!created.contains_key("updated_at"));

    let lead_patch = FieldSchema::LEADS
        .validate(&fields(json!({ "status": "New" })), ValidationMode::Update)
        .expect("valid lead patch");
    assert!(!lead_patch.contains_key("updated_at"));
}

#[test]
fn deal_probability_is_bounded() {
    let deal = fields(json!({ "probability": 120 }));
    let failures = FieldSchema::DEALS
        .validate(&deal, ValidationMode::Update)
        .expect_err("must fail");
    assert_eq!(failures[0].field, "probability");
}

#[test]
fn schema_for_unknown_table_accepts_everything() {
    let spec = CollectionSpec {
        table: "notes",
        ..CollectionSpec::LEADS
    };
    let anything = fields(json!({ "x": 1 }));
    let accepted = schema_for(&spec)
        .validate(&anything, ValidationMode::Create)
        .expect("accept all");
    assert_eq!(accepted, anything);
}

#[test]
fn typed_status_and_deal_payloads_pass_their_schemas() {
    use shared::{
        domain::RecordId,
        protocol::{to_fields, NewDeal, NewStatus},
    };

    let status = to_fields(&NewStatus {
        status_name: "Warm".to_owned(),
        status_color: "#4CAF50".to_owned(),
    })
    .expect("fields");
    assert_eq!(
        FieldSchema::LEAD_STATUSES.validate(&status, ValidationMode::Create),
        Ok(status.clone())
    );

    let deal = to_fields(&NewDeal {
        lead_id: RecordId::from("9f1c"),
        amount: 2500.0,
        stage: DealStage::Negotiation,
        probability: 60.0,
        expected_close_date: "2024-09-01".to_owned(),
        owner_id: None,
        lost_reason: None,
    })
    .expect("fields");
    let accepted = FieldSchema::DEALS
        .validate(&deal, ValidationMode::Create)
        .expect("valid deal");
    assert_eq!(accepted.get("stage"), Some(&json!("negotiation")));
    assert_eq!(accepted.len(), deal.len());
}

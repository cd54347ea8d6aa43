//! Pure derivations from a snapshot: filtering, page clamping and slicing.

use std::ops::Range;

use shared::domain::{Record, RecordId};

use crate::collection::CollectionSpec;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(String),
}

impl StatusFilter {
    /// `"all"` (any case) selects everything, anything else filters on that value.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("all") {
            StatusFilter::All
        } else {
            StatusFilter::Only(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search_term: String,
    pub status_filter: StatusFilter,
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            status_filter: StatusFilter::All,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of the filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice {
    pub page_index: usize,
    pub page_size: usize,
    /// Size of the whole filtered view, not of this page.
    pub total: usize,
    pub records: Vec<Record>,
}

impl PageSlice {
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.iter().map(|record| &record.id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.iter().any(|record| &record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn matches(
    record: &Record,
    spec: &CollectionSpec,
    search_term: &str,
    status_filter: &StatusFilter,
) -> bool {
    let needle = search_term.to_lowercase();
    let matches_search = needle.is_empty()
        || spec.searchable_fields.iter().any(|field| {
            record
                .text(field)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        });

    let matches_status = match status_filter {
        StatusFilter::All => true,
        StatusFilter::Only(wanted) => spec
            .status_field
            .and_then(|field| record.text(field))
            .is_some_and(|status| status == wanted),
    };

    matches_search && matches_status
}

/// Records of `snapshot` matching the filter, in snapshot order.
pub fn filter_records(
    snapshot: &[Record],
    spec: &CollectionSpec,
    search_term: &str,
    status_filter: &StatusFilter,
) -> Vec<Record> {
    snapshot
        .iter()
        .filter(|record| matches(record, spec, search_term, status_filter))
        .cloned()
        .collect()
}

pub fn page_count(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

pub fn clamp_page_index(count: usize, page_index: usize, page_size: usize) -> usize {
    page_index.min(page_count(count, page_size).saturating_sub(1))
}

fn page_bounds(count: usize, page_index: usize, page_size: usize) -> Range<usize> {
    let start = page_index.saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);
    start..end
}

/// Slices one page out of `filtered`, clamping `page_index` into range.
/// A `page_size` of zero is treated as one.
pub fn paginate(filtered: &[Record], page_index: usize, page_size: usize) -> PageSlice {
    let page_size = page_size.max(1);
    let page_index = clamp_page_index(filtered.len(), page_index, page_size);
    let bounds = page_bounds(filtered.len(), page_index, page_size);

    PageSlice {
        page_index,
        page_size,
        total: filtered.len(),
        records: filtered[bounds].to_vec(),
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;

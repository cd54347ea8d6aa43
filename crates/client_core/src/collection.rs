/// Server ordering applied to `list`. The view never re-sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Describes one remote collection and how the view searches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub table: &'static str,
    pub searchable_fields: &'static [&'static str],
    pub status_field: Option<&'static str>,
    pub order_by: &'static str,
    pub order: SortOrder,
}

impl CollectionSpec {
    pub const LEADS: CollectionSpec = CollectionSpec {
        table: "leads",
        searchable_fields: &["name", "company", "email"],
        status_field: Some("status"),
        order_by: "created_at",
        order: SortOrder::Descending,
    };

    pub const LEAD_STATUSES: CollectionSpec = CollectionSpec {
        table: "lead_statuses",
        searchable_fields: &["status_name"],
        status_field: None,
        order_by: "created_at",
        order: SortOrder::Ascending,
    };

    pub const DEALS: CollectionSpec = CollectionSpec {
        table: "deals",
        searchable_fields: &["lead_id", "lost_reason"],
        status_field: Some("stage"),
        order_by: "created_at",
        order: SortOrder::Descending,
    };

    pub fn by_table(table: &str) -> Option<CollectionSpec> {
        [Self::LEADS, Self::LEAD_STATUSES, Self::DEALS]
            .into_iter()
            .find(|spec| spec.table == table)
    }

    /// PostgREST `order` parameter, e.g. `created_at.desc`.
    pub fn order_param(&self) -> String {
        let direction = match self.order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        format!("{}.{direction}", self.order_by)
    }
}

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use futures::future::join_all;
use shared::domain::{Fields, Record, RecordId};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod collection;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;
pub mod view;

pub use collection::{CollectionSpec, SortOrder};
pub use error::{CollectionError, StoreError};
pub use schema::{schema_for, AcceptAll, FieldSchema, Schema, ValidationMode};
pub use store::{HttpStore, RemoteStore};
pub use view::{PageSlice, StatusFilter, ViewState};

/// The last known server state of a whole collection, in server order.
pub type Snapshot = Arc<Vec<Record>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No load has finished yet.
    Loading,
    /// Data (possibly empty) is available; an error overlay may be present.
    Ready,
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    SnapshotReplaced { count: usize },
    SelectionChanged { selected: Vec<RecordId> },
    Error(String),
}

/// Outcome of [`CollectionView::bulk_delete`]. Every id is attempted; failures
/// do not undo the deletions that went through.
#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<RecordId>,
    pub failed: Vec<(RecordId, CollectionError)>,
}

impl BulkDeleteReport {
    pub fn failed_ids(&self) -> Vec<RecordId> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Filtered, paginated, selectable view over one remote collection.
///
/// The snapshot is owned by the view and replaced wholesale by [`load`]; every
/// successful mutation triggers a reload. The state lock is never held while
/// the store is awaited, so concurrent mutations race and the last load to
/// finish wins.
///
/// [`load`]: CollectionView::load
pub struct CollectionView {
    spec: CollectionSpec,
    store: Arc<dyn RemoteStore>,
    schema: Arc<dyn Schema>,
    inner: Mutex<ViewInner>,
    events: broadcast::Sender<ViewEvent>,
}

struct ViewInner {
    snapshot: Snapshot,
    loaded: bool,
    closed: bool,
    last_error: Option<CollectionError>,
    view_state: ViewState,
    filtered: Vec<Record>,
    selection: BTreeSet<RecordId>,
}

impl ViewInner {
    fn new(page_size: usize) -> Self {
        Self {
            snapshot: Arc::new(Vec::new()),
            loaded: false,
            closed: false,
            last_error: None,
            view_state: ViewState {
                page_size: page_size.max(1),
                ..ViewState::default()
            },
            filtered: Vec::new(),
            selection: BTreeSet::new(),
        }
    }

    fn page(&self) -> PageSlice {
        view::paginate(
            &self.filtered,
            self.view_state.page_index,
            self.view_state.page_size,
        )
    }

    /// Re-derives the filtered view, re-clamps the page and drops selected
    /// ids that are no longer on it. Returns the page and whether the
    /// selection shrank.
    fn recompute(&mut self, spec: &CollectionSpec) -> (PageSlice, bool) {
        self.filtered = view::filter_records(
            &self.snapshot,
            spec,
            &self.view_state.search_term,
            &self.view_state.status_filter,
        );
        let page = self.page();
        self.view_state.page_index = page.page_index;
        self.view_state.page_size = page.page_size;

        let before = self.selection.len();
        self.selection.retain(|id| page.contains(id));
        let pruned = self.selection.len() != before;
        (page, pruned)
    }

    fn selected(&self) -> Vec<RecordId> {
        self.selection.iter().cloned().collect()
    }
}

impl CollectionView {
    pub fn new(spec: CollectionSpec, store: Arc<dyn RemoteStore>) -> Self {
        let schema = schema_for(&spec);
        Self::new_with_schema(spec, store, schema)
    }

    pub fn new_with_schema(
        spec: CollectionSpec,
        store: Arc<dyn RemoteStore>,
        schema: Arc<dyn Schema>,
    ) -> Self {
        Self::new_with_dependencies(spec, store, schema, view::DEFAULT_PAGE_SIZE)
    }

    pub fn new_with_dependencies(
        spec: CollectionSpec,
        store: Arc<dyn RemoteStore>,
        schema: Arc<dyn Schema>,
        page_size: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            spec,
            store,
            schema,
            inner: Mutex::new(ViewInner::new(page_size)),
            events,
        }
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Fetches the whole collection and replaces the snapshot. On failure the
    /// previous snapshot stays and the error is kept as an overlay.
    pub async fn load(&self) -> Result<Snapshot, CollectionError> {
        self.ensure_open().await?;
        let result = self.store.list(&self.spec).await;

        let mut guard = self.inner.lock().await;
        if guard.closed {
            info!(
                collection = self.spec.table,
                "collection: discarding load result for closed view"
            );
            return Err(CollectionError::Closed);
        }
        guard.loaded = true;

        match result {
            Ok(records) => {
                let count = records.len();
                guard.snapshot = Arc::new(records);
                guard.last_error = None;
                let (_, pruned) = guard.recompute(&self.spec);
                let snapshot = guard.snapshot.clone();
                let selected = pruned.then(|| guard.selected());
                drop(guard);

                info!(collection = self.spec.table, count, "collection: snapshot replaced");
                let _ = self.events.send(ViewEvent::SnapshotReplaced { count });
                if let Some(selected) = selected {
                    let _ = self.events.send(ViewEvent::SelectionChanged { selected });
                }
                Ok(snapshot)
            }
            Err(err) => {
                let err = CollectionError::from(err);
                guard.last_error = Some(err.clone());
                drop(guard);

                warn!(collection = self.spec.table, error = %err, "collection: load failed");
                let _ = self.events.send(ViewEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Applies a search term and status filter to the current snapshot. No
    /// network call is made.
    pub async fn set_filter(
        &self,
        search_term: impl Into<String>,
        status_filter: StatusFilter,
    ) -> Vec<Record> {
        let mut guard = self.inner.lock().await;
        guard.view_state.search_term = search_term.into();
        guard.view_state.status_filter = status_filter;
        let (_, pruned) = guard.recompute(&self.spec);
        let filtered = guard.filtered.clone();
        self.notify_selection(&guard, pruned);
        filtered
    }

    /// Moves to `page_index` (clamped into range) with `page_size` rows.
    pub async fn paginate(&self, page_index: usize, page_size: usize) -> PageSlice {
        let mut guard = self.inner.lock().await;
        guard.view_state.page_index = page_index;
        guard.view_state.page_size = page_size.max(1);
        let (page, pruned) = guard.recompute(&self.spec);
        self.notify_selection(&guard, pruned);
        page
    }

    /// Changes rows per page and returns to the first page.
    pub async fn set_page_size(&self, page_size: usize) -> PageSlice {
        self.paginate(0, page_size).await
    }

    /// Toggles `id` in the selection. Ids not on the current page are
    /// ignored. Returns whether the id is selected afterwards.
    pub async fn toggle_select(&self, id: &RecordId) -> bool {
        let mut guard = self.inner.lock().await;
        if !guard.page().contains(id) {
            return false;
        }
        let selected = if guard.selection.remove(id) {
            false
        } else {
            guard.selection.insert(id.clone());
            true
        };
        self.notify_selection(&guard, true);
        selected
    }

    pub async fn select_all_on_page(&self) -> Vec<RecordId> {
        let mut guard = self.inner.lock().await;
        let page = guard.page();
        guard.selection = page.ids().cloned().collect();
        self.notify_selection(&guard, true);
        guard.selected()
    }

    pub async fn clear_selection(&self) {
        let mut guard = self.inner.lock().await;
        let changed = !guard.selection.is_empty();
        guard.selection.clear();
        self.notify_selection(&guard, changed);
    }

    /// Validates and inserts a new row, then reloads.
    pub async fn create(&self, fields: Fields) -> Result<Record, CollectionError> {
        self.ensure_open().await?;
        let fields = self
            .schema
            .validate(&fields, ValidationMode::Create)
            .map_err(CollectionError::Validation)?;

        let record = match self.store.insert(&self.spec, fields).await {
            Ok(record) => record,
            Err(err) => return Err(self.report_failure("create", err.into()).await),
        };
        info!(collection = self.spec.table, id = %record.id, "collection: record created");

        self.reload_after_mutation().await;
        Ok(record)
    }

    /// Validates the present fields and applies them to `id`, then reloads.
    pub async fn update(&self, id: &RecordId, fields: Fields) -> Result<Record, CollectionError> {
        self.ensure_open().await?;
        let fields = self
            .schema
            .validate(&fields, ValidationMode::Update)
            .map_err(CollectionError::Validation)?;

        let record = match self.store.update(&self.spec, id, fields).await {
            Ok(record) => record,
            Err(err) => return Err(self.report_failure("update", err.into()).await),
        };
        info!(collection = self.spec.table, id = %id, "collection: record updated");

        self.reload_after_mutation().await;
        Ok(record)
    }

    pub async fn delete(&self, id: &RecordId) -> Result<(), CollectionError> {
        self.ensure_open().await?;
        if let Err(err) = self.store.delete(&self.spec, id).await {
            return Err(self.report_failure("delete", err.into()).await);
        }
        info!(collection = self.spec.table, id = %id, "collection: record deleted");

        self.forget_selected(std::slice::from_ref(id)).await;
        self.reload_after_mutation().await;
        Ok(())
    }

    /// Deletes every id independently and concurrently. Nothing is aborted
    /// when one deletion fails; the report says which ids failed and why.
    pub async fn bulk_delete(&self, ids: &[RecordId]) -> Result<BulkDeleteReport, CollectionError> {
        self.ensure_open().await?;

        let mut seen = HashSet::new();
        let unique: Vec<&RecordId> = ids.iter().filter(|id| seen.insert(*id)).collect();

        let outcomes = join_all(unique.into_iter().map(|id| async move {
            (id.clone(), self.store.delete(&self.spec, id).await)
        }))
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.deleted.push(id),
                Err(err) => report.failed.push((id, err.into())),
            }
        }

        info!(
            collection = self.spec.table,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "collection: bulk delete finished"
        );

        if !report.deleted.is_empty() {
            self.forget_selected(&report.deleted).await;
            self.reload_after_mutation().await;
        }

        // Recorded after the reload, which would otherwise clear the overlay.
        if let Some((_, first)) = report.failed.first() {
            warn!(
                collection = self.spec.table,
                failed = ?report.failed_ids(),
                "collection: bulk delete partially failed"
            );
            let message = format!(
                "{} of {} deletions failed: {first}",
                report.failed.len(),
                report.failed.len() + report.deleted.len()
            );
            self.inner.lock().await.last_error = Some(first.clone());
            let _ = self.events.send(ViewEvent::Error(message));
        }
        Ok(report)
    }

    pub async fn readiness(&self) -> Readiness {
        if self.inner.lock().await.loaded {
            Readiness::Ready
        } else {
            Readiness::Loading
        }
    }

    pub async fn last_error(&self) -> Option<CollectionError> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn view_state(&self) -> ViewState {
        self.inner.lock().await.view_state.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.snapshot.clone()
    }

    pub async fn filtered(&self) -> Vec<Record> {
        self.inner.lock().await.filtered.clone()
    }

    pub async fn page(&self) -> PageSlice {
        self.inner.lock().await.page()
    }

    pub async fn page_count(&self) -> usize {
        let guard = self.inner.lock().await;
        view::page_count(guard.filtered.len(), guard.view_state.page_size)
    }

    pub async fn selection(&self) -> Vec<RecordId> {
        self.inner.lock().await.selected()
    }

    /// Puts filter, page and selection back to their defaults, keeping the
    /// snapshot and the configured page size.
    pub async fn reset_view(&self) {
        let mut guard = self.inner.lock().await;
        let page_size = guard.view_state.page_size;
        guard.view_state = ViewState {
            page_size,
            ..ViewState::default()
        };
        guard.selection.clear();
        guard.recompute(&self.spec);
        self.notify_selection(&guard, true);
    }

    /// Tears the view down. The snapshot is discarded and loads still in
    /// flight are ignored when they complete.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        guard.closed = true;
        guard.snapshot = Arc::new(Vec::new());
        guard.filtered.clear();
        guard.selection.clear();
        guard.view_state = ViewState::default();
        info!(collection = self.spec.table, "collection: view closed");
    }

    async fn ensure_open(&self) -> Result<(), CollectionError> {
        if self.inner.lock().await.closed {
            return Err(CollectionError::Closed);
        }
        Ok(())
    }

    async fn report_failure(&self, action: &str, err: CollectionError) -> CollectionError {
        warn!(collection = self.spec.table, action, error = %err, "collection: mutation failed");
        self.inner.lock().await.last_error = Some(err.clone());
        let _ = self.events.send(ViewEvent::Error(err.to_string()));
        err
    }

    /// The mutation already succeeded; a failed reload only sets the overlay.
    async fn reload_after_mutation(&self) {
        if let Err(err) = self.load().await {
            warn!(
                collection = self.spec.table,
                error = %err,
                "collection: reload after mutation failed"
            );
        }
    }

    async fn forget_selected(&self, ids: &[RecordId]) {
        let mut guard = self.inner.lock().await;
        let before = guard.selection.len();
        for id in ids {
            guard.selection.remove(id);
        }
        let changed = guard.selection.len() != before;
        self.notify_selection(&guard, changed);
    }

    fn notify_selection(&self, guard: &ViewInner, changed: bool) {
        if changed {
            let _ = self.events.send(ViewEvent::SelectionChanged {
                selected: guard.selected(),
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

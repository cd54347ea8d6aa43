use shared::{domain::RecordId, error::ValidationFailure};
use thiserror::Error;

/// Failures reported by a [`crate::store::RemoteStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("backend rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("no row with id {id}")]
    NotFound { id: RecordId },
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            StoreError::Decode(value.to_string())
        } else {
            StoreError::Network(value.to_string())
        }
    }
}

/// Failures surfaced by [`crate::CollectionView`] operations. None of them are
/// fatal; the last good snapshot stays in place.
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("validation failed: {}", join_failures(.0))]
    Validation(Vec<ValidationFailure>),
    #[error("record {id} not found")]
    NotFound { id: RecordId },
    #[error("collection view has been closed")]
    Closed,
}

impl CollectionError {
    /// Field-level failures, for inline display next to form inputs.
    pub fn validation_failures(&self) -> &[ValidationFailure] {
        match self {
            CollectionError::Validation(failures) => failures,
            _ => &[],
        }
    }
}

impl From<StoreError> for CollectionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { id } => CollectionError::NotFound { id },
            other => CollectionError::Network(other.to_string()),
        }
    }
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

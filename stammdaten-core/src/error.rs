//! Error types for the stammdaten record store.

use thiserror::Error;

/// Errors surfaced by the record store.
///
/// Backend errors are translated into these kinds exactly once, at the
/// storage boundary, and never re-wrapped further up. `RecordNotFound` is
/// only ever raised by the repository layer, never by a backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Remote 403, or the local workbook file cannot be accessed.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Remote 404: the spreadsheet/document itself is missing.
    /// Distinct from a missing row, which is `RecordNotFound`.
    #[error("Resource not found: {0}")]
    NotFoundResource(String),

    /// The tab (or its schema) does not exist yet. Recoverable by
    /// lazily creating the tab.
    #[error("Tab or range missing: {0}")]
    SchemaRangeMissing(String),

    /// Ambiguous backend failure, eligible for the health-check retry only.
    #[error("Transient backend failure: {0}")]
    TransientFailure(String),

    /// No row matches the requested id or secondary key.
    #[error("No record with {column}='{key}' in tab '{tab}'")]
    RecordNotFound {
        tab: String,
        column: String,
        key: String,
    },

    /// A caller asked for an impossible cell range (e.g. deleting the
    /// header row).
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether the health-check retry loop may try again after this error.
    ///
    /// Permission and missing-resource failures never resolve by waiting,
    /// so the retry loop stops on them immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::TransientFailure(_) | StoreError::SchemaRangeMissing(_)
        )
    }
}

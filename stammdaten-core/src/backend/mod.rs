//! Storage-engine-agnostic contract for reading and writing raw rows.
//!
//! All header/row logic lives above this seam; the two engines only differ
//! in how they move raw rows in and out of the medium.

mod sheets;
mod workbook;

pub use sheets::SheetsBackend;
pub use workbook::WorkbookBackend;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::schema::Tab;

/// Which rows of a tab an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRange {
    /// Every occupied row, header included.
    All,
    /// One row, 1-based; row 1 is the header.
    Single(usize),
}

/// The backend port both storage engines satisfy identically.
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// Raw rows for the range, header included. A tab that does not exist
    /// yet yields an empty row set on the local engine and
    /// `SchemaRangeMissing` on the remote one; callers treat both as
    /// "empty, create lazily".
    async fn get_values(&self, tab: Tab, rows: RowRange) -> StoreResult<Vec<Vec<String>>>;

    /// Overwrite an exact cell range.
    async fn update_values(
        &self,
        tab: Tab,
        rows: RowRange,
        values: Vec<Vec<String>>,
    ) -> StoreResult<()>;

    /// Add rows after the last occupied row.
    async fn append_values(&self, tab: Tab, values: Vec<Vec<String>>) -> StoreResult<()>;

    /// Remove one data row (1-based). Deleting row 1, the header, is an
    /// `InvalidRange` error.
    async fn delete_row(&self, tab: Tab, row_index: usize) -> StoreResult<()>;

    /// Idempotent tab creation; "already exists" is swallowed.
    async fn create_tab_if_missing(&self, tab: Tab) -> StoreResult<()>;

    async fn list_tabs(&self) -> StoreResult<Vec<String>>;
}

//! Tabular record store for daycare master data.
//!
//! Six entity kinds (children, parents, pickup authorizations,
//! medications, photo metadata, consents) live as tabs of one
//! spreadsheet-shaped document: row 1 is the header, every later row is
//! one record, every value is a string. Two storage engines sit behind
//! one port — a remote values API and a local multi-tab workbook file —
//! and all header/row logic runs identically above both.

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod consent;
pub mod error;
pub mod header;
pub mod record;
pub mod retry;
pub mod schema;
pub mod store;

pub use backend::{BackendPort, RowRange, SheetsBackend, WorkbookBackend};
pub use cache::{Clock, DEFAULT_CACHE_TTL, ManualClock, ReadCache, SystemClock};
pub use config::{AppConfig, GoogleConfig, LocalConfig, StorageMode};
pub use consent::DownloadConsent;
pub use error::{StoreError, StoreResult};
pub use record::Record;
pub use retry::RetryPolicy;
pub use schema::{SortOrder, Tab, TableSpec};
pub use store::{ChildrenRepository, RecordStore, Repository};

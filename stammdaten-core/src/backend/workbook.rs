//! Local storage engine: one multi-tab workbook file on disk.
//!
//! The whole document is the unit of durability. Every write reads all
//! tabs, applies the change to the one affected tab, and rewrites the
//! entire file in a single atomic save (temp file + rename), so a crash
//! mid-write cannot leave one tab newer than another. The cost is
//! O(total rows) work per single-row write, which is fine at this scale.
//!
//! There is no file lock: two concurrent local writers can overwrite each
//! other's last save. The store assumes a single writer per workbook.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{BackendPort, RowRange};
use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::schema::Tab;

type Workbook = BTreeMap<String, Vec<Vec<String>>>;

/// File-backed implementation of the backend port.
pub struct WorkbookBackend {
    path: PathBuf,
}

impl WorkbookBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        WorkbookBackend { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the workbook with all six tabs and their bootstrap headers
    /// when the file does not exist yet. Existing files are left alone.
    pub fn ensure_workbook(&self) -> StoreResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        let mut workbook = Workbook::new();
        for tab in Tab::all() {
            let header = tab
                .spec()
                .bootstrap_header
                .iter()
                .map(|c| c.to_string())
                .collect();
            workbook.insert(tab.as_str().to_string(), vec![header]);
        }
        self.save(&workbook)
    }

    fn load(&self) -> StoreResult<Workbook> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Workbook::new()),
            Err(err) => return Err(translate_io(err, &self.path)),
        };
        serde_json::from_str(&raw).map_err(|err| {
            StoreError::TransientFailure(format!(
                "workbook {} is not a valid multi-tab document: {err}",
                self.path.display()
            ))
        })
    }

    fn save(&self, workbook: &Workbook) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| translate_io(err, &self.path))?;
        }

        let serialized = serde_json::to_string_pretty(workbook).map_err(|err| {
            StoreError::TransientFailure(format!("could not serialize workbook: {err}"))
        })?;

        // All tabs land on disk in one rename so the document never mixes
        // generations.
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, serialized).map_err(|err| translate_io(err, &tmp_path))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|err| translate_io(err, &self.path))?;

        debug!(path = %self.path.display(), "workbook saved");
        Ok(())
    }
}

#[async_trait]
impl BackendPort for WorkbookBackend {
    async fn get_values(&self, tab: Tab, rows: RowRange) -> StoreResult<Vec<Vec<String>>> {
        let workbook = self.load()?;
        // A missing tab reads as empty, mirroring "tab not created yet"
        // on the remote side.
        let Some(tab_rows) = workbook.get(tab.as_str()) else {
            return Ok(Vec::new());
        };
        match rows {
            RowRange::All => Ok(tab_rows.clone()),
            RowRange::Single(index) => {
                if index == 0 {
                    return Err(StoreError::InvalidRange("row indices are 1-based".into()));
                }
                Ok(tab_rows
                    .get(index - 1)
                    .map(|row| vec![row.clone()])
                    .unwrap_or_default())
            }
        }
    }

    async fn update_values(
        &self,
        tab: Tab,
        rows: RowRange,
        values: Vec<Vec<String>>,
    ) -> StoreResult<()> {
        let mut workbook = self.load()?;
        let tab_rows = workbook.entry(tab.as_str().to_string()).or_default();

        match rows {
            RowRange::All => *tab_rows = values,
            RowRange::Single(index) => {
                if index == 0 {
                    return Err(StoreError::InvalidRange("row indices are 1-based".into()));
                }
                let [row] = values.as_slice() else {
                    return Err(StoreError::InvalidRange(format!(
                        "single-row update expects exactly one row, got {}",
                        values.len()
                    )));
                };
                if tab_rows.len() < index {
                    tab_rows.resize(index, Vec::new());
                }
                tab_rows[index - 1] = row.clone();
            }
        }

        self.save(&workbook)
    }

    async fn append_values(&self, tab: Tab, values: Vec<Vec<String>>) -> StoreResult<()> {
        let mut workbook = self.load()?;
        let tab_rows = workbook.entry(tab.as_str().to_string()).or_default();
        // Sheets appends after the last occupied row; drop trailing blank
        // padding rows so behavior matches.
        while tab_rows
            .last()
            .is_some_and(|row| codec::is_blank_row(row))
        {
            tab_rows.pop();
        }
        tab_rows.extend(values);
        self.save(&workbook)
    }

    async fn delete_row(&self, tab: Tab, row_index: usize) -> StoreResult<()> {
        if row_index <= 1 {
            return Err(StoreError::InvalidRange(
                "row 1 is the header and cannot be deleted".into(),
            ));
        }

        let mut workbook = self.load()?;
        let Some(tab_rows) = workbook.get_mut(tab.as_str()) else {
            return Err(StoreError::SchemaRangeMissing(format!(
                "tab '{tab}' does not exist in {}",
                self.path.display()
            )));
        };
        if row_index > tab_rows.len() {
            return Err(StoreError::InvalidRange(format!(
                "tab '{tab}' has {} rows, cannot delete row {row_index}",
                tab_rows.len()
            )));
        }
        tab_rows.remove(row_index - 1);
        self.save(&workbook)
    }

    async fn create_tab_if_missing(&self, tab: Tab) -> StoreResult<()> {
        let mut workbook = self.load()?;
        if workbook.contains_key(tab.as_str()) {
            return Ok(());
        }
        workbook.insert(tab.as_str().to_string(), Vec::new());
        self.save(&workbook)
    }

    async fn list_tabs(&self) -> StoreResult<Vec<String>> {
        Ok(self.load()?.keys().cloned().collect())
    }
}

fn translate_io(err: std::io::Error, path: &Path) -> StoreError {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            StoreError::PermissionDenied(format!("cannot access {}: {err}", path.display()))
        }
        _ => StoreError::TransientFailure(format!("workbook io on {}: {err}", path.display())),
    }
}

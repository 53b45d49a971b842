//! Shared test support: an in-memory implementation of the backend port.

#![allow(dead_code)]

pub mod values_api;

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use stammdaten_core::{BackendPort, RowRange, StoreError, StoreResult, Tab};

/// Backend port over an in-memory tab map, with a read counter for
/// cache-coherence assertions.
#[derive(Default)]
pub struct MemoryBackend {
    tabs: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    reads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendPort for MemoryBackend {
    async fn get_values(&self, tab: Tab, rows: RowRange) -> StoreResult<Vec<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tabs = self.tabs.lock().unwrap();
        let Some(tab_rows) = tabs.get(tab.as_str()) else {
            return Ok(Vec::new());
        };
        Ok(match rows {
            RowRange::All => tab_rows.clone(),
            RowRange::Single(index) => tab_rows
                .get(index.saturating_sub(1))
                .map(|row| vec![row.clone()])
                .unwrap_or_default(),
        })
    }

    async fn update_values(
        &self,
        tab: Tab,
        rows: RowRange,
        values: Vec<Vec<String>>,
    ) -> StoreResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let tab_rows = tabs.entry(tab.as_str().to_string()).or_default();
        match rows {
            RowRange::All => *tab_rows = values,
            RowRange::Single(index) => {
                if index == 0 || values.len() != 1 {
                    return Err(StoreError::InvalidRange("bad single-row update".into()));
                }
                if tab_rows.len() < index {
                    tab_rows.resize(index, Vec::new());
                }
                tab_rows[index - 1] = values.into_iter().next().unwrap();
            }
        }
        Ok(())
    }

    async fn append_values(&self, tab: Tab, values: Vec<Vec<String>>) -> StoreResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        tabs.entry(tab.as_str().to_string())
            .or_default()
            .extend(values);
        Ok(())
    }

    async fn delete_row(&self, tab: Tab, row_index: usize) -> StoreResult<()> {
        if row_index <= 1 {
            return Err(StoreError::InvalidRange(
                "row 1 is the header and cannot be deleted".into(),
            ));
        }
        let mut tabs = self.tabs.lock().unwrap();
        let Some(tab_rows) = tabs.get_mut(tab.as_str()) else {
            return Err(StoreError::SchemaRangeMissing(format!(
                "tab '{tab}' does not exist"
            )));
        };
        if row_index > tab_rows.len() {
            return Err(StoreError::InvalidRange(format!(
                "no row {row_index} in tab '{tab}'"
            )));
        }
        tab_rows.remove(row_index - 1);
        Ok(())
    }

    async fn create_tab_if_missing(&self, tab: Tab) -> StoreResult<()> {
        let mut tabs = self.tabs.lock().unwrap();
        tabs.entry(tab.as_str().to_string()).or_default();
        Ok(())
    }

    async fn list_tabs(&self) -> StoreResult<Vec<String>> {
        Ok(self.tabs.lock().unwrap().keys().cloned().collect())
    }
}

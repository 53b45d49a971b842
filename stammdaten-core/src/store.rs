//! Entity repositories: the store's public CRUD surface.
//!
//! One repository per entity kind, all driven by the same codec, header
//! reconciler and cache over the backend port. Updates are
//! read-modify-write at row granularity with no version check; the last
//! writer wins. Duplicate ids (possible when the backing sheet is edited
//! by hand) resolve to the first matching row.

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{BackendPort, RowRange};
use crate::cache::{DEFAULT_CACHE_TTL, ReadCache};
use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::header::{self, ensure_header};
use crate::record::Record;
use crate::retry::{self, RetryPolicy};
use crate::schema::{self, SortOrder, Tab, TableSpec};

const LIST_SIGNATURE: &str = "list";

/// The record store: one backend, one cache, six repositories.
pub struct RecordStore {
    backend: Arc<dyn BackendPort>,
    cache: Arc<ReadCache>,
    retry: RetryPolicy,
}

impl RecordStore {
    /// Store with the reference cache TTL and retry policy.
    pub fn new(backend: impl BackendPort + 'static) -> Self {
        Self::with_parts(
            Arc::new(backend),
            ReadCache::new(DEFAULT_CACHE_TTL),
            RetryPolicy::default(),
        )
    }

    pub fn with_parts(
        backend: Arc<dyn BackendPort>,
        cache: ReadCache,
        retry: RetryPolicy,
    ) -> Self {
        RecordStore {
            backend,
            cache: Arc::new(cache),
            retry,
        }
    }

    pub fn backend(&self) -> &Arc<dyn BackendPort> {
        &self.backend
    }

    /// Pre-flight read-only health check under the store's retry policy.
    pub async fn health_check(&self) -> StoreResult<Vec<String>> {
        retry::health_check(self.backend.as_ref(), &self.retry).await
    }

    pub fn children(&self) -> ChildrenRepository {
        ChildrenRepository {
            inner: self.repository(&schema::CHILDREN),
        }
    }

    pub fn parents(&self) -> Repository {
        self.repository(&schema::PARENTS)
    }

    pub fn pickup_authorizations(&self) -> Repository {
        self.repository(&schema::PICKUP_AUTHORIZATIONS)
    }

    pub fn medications(&self) -> Repository {
        self.repository(&schema::MEDICATIONS)
    }

    pub fn photo_meta(&self) -> Repository {
        self.repository(&schema::PHOTO_META)
    }

    pub fn consents(&self) -> Repository {
        self.repository(&schema::CONSENTS)
    }

    pub fn repository_for(&self, tab: Tab) -> Repository {
        self.repository(tab.spec())
    }

    fn repository(&self, spec: &'static TableSpec) -> Repository {
        Repository {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            spec,
        }
    }
}

/// Generic repository over one tab.
pub struct Repository {
    backend: Arc<dyn BackendPort>,
    cache: Arc<ReadCache>,
    spec: &'static TableSpec,
}

impl Repository {
    pub fn tab(&self) -> Tab {
        self.spec.tab
    }

    /// All non-blank records of the tab, post-processed and sorted,
    /// cached for the store's TTL.
    pub async fn list(&self) -> StoreResult<Vec<Record>> {
        if let Some(cached) = self.cache.get(self.spec.tab, LIST_SIGNATURE) {
            return Ok(cached);
        }

        // One backend read per uncached list: the header is reconciled
        // against the same row snapshot the records decode from. Rows
        // written under an older header decode their appended columns
        // as empty strings.
        let rows = header::fetch_rows(self.backend.as_ref(), self.spec).await?;
        let (header, changed) = header::reconcile_header(rows.first(), self.spec, &[]);
        if changed {
            header::write_header(self.backend.as_ref(), self.spec, &header).await?;
        }

        let mut records = Vec::new();
        for row in rows.iter().skip(1) {
            if codec::is_blank_row(row) {
                continue;
            }
            let mut record = codec::decode_row(row, &header);
            if let Some(post_read) = self.spec.post_read {
                post_read(&mut record);
            }
            records.push(record);
        }

        match self.spec.sort {
            SortOrder::Unsorted => {}
            SortOrder::ByColumn(column) => {
                records.sort_by(|a, b| a.get_or_empty(column).cmp(b.get_or_empty(column)));
            }
            SortOrder::ByColumnDesc(column) => {
                records.sort_by(|a, b| b.get_or_empty(column).cmp(a.get_or_empty(column)));
            }
        }

        self.cache
            .put(self.spec.tab, LIST_SIGNATURE, records.clone());
        Ok(records)
    }

    /// First record whose id column matches. First match wins when the
    /// backing sheet carries duplicate ids.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Record> {
        let id = id.trim();
        for record in self.list().await? {
            if record.get_or_empty(self.spec.id_column).trim() == id {
                return Ok(record);
            }
        }
        Err(self.record_not_found(self.spec.id_column, id))
    }

    /// Append one record. A non-empty id in `fields` is kept; otherwise a
    /// fresh 32-character lowercase hex id is generated. Returns the id.
    pub async fn add(&self, fields: Record) -> StoreResult<String> {
        let mut payload = fields;
        let id = match payload.get(self.spec.id_column) {
            Some(supplied) if !supplied.trim().is_empty() => supplied.trim().to_string(),
            _ => generate_record_id(),
        };
        payload.set(self.spec.id_column, &id);

        if let Some(normalize) = self.spec.normalize {
            normalize(&mut payload);
        }

        // The header must cover the full field set being written, not
        // just the required columns.
        let extra = self.extra_columns(&payload);
        let header = ensure_header(self.backend.as_ref(), self.spec, &extra).await?;

        let row = codec::encode_row(&payload, &header);
        self.backend
            .append_values(self.spec.tab, vec![row])
            .await?;

        self.cache.invalidate_tab(self.spec.tab);
        Ok(id)
    }

    /// Merge-patch one record in place: read the stored row, overwrite
    /// the patched columns, re-run entity derivation, rewrite the row.
    /// Fails with `RecordNotFound` when no row matches the id.
    pub async fn update(&self, id: &str, patch: Record) -> StoreResult<()> {
        let id = id.trim();

        // Patch columns outside the schema still get a header column so
        // their values persist for subsequent rows.
        let extra = self.extra_columns(&patch);
        ensure_header(self.backend.as_ref(), self.spec, &extra).await?;

        let (row_index, header) = self.find_row(id).await?;
        let existing_rows = self
            .backend
            .get_values(self.spec.tab, RowRange::Single(row_index))
            .await?;
        let mut merged = existing_rows
            .first()
            .map(|row| codec::decode_row(row, &header))
            .unwrap_or_default();
        merged.merge(&patch);

        if let Some(normalize) = self.spec.normalize {
            normalize(&mut merged);
        }

        let row = codec::encode_row(&merged, &header);
        self.backend
            .update_values(self.spec.tab, RowRange::Single(row_index), vec![row])
            .await?;

        self.cache.invalidate_tab(self.spec.tab);
        Ok(())
    }

    /// Remove one record's row. Not part of every entity's public
    /// surface; see `ChildrenRepository::delete`.
    pub(crate) async fn delete(&self, id: &str) -> StoreResult<()> {
        let (row_index, _) = self.find_row(id.trim()).await?;
        self.backend.delete_row(self.spec.tab, row_index).await?;
        self.cache.invalidate_tab(self.spec.tab);
        Ok(())
    }

    /// Locate a record's 1-based row index by its id column. Returns the
    /// stored header alongside. First match wins.
    async fn find_row(&self, id: &str) -> StoreResult<(usize, Vec<String>)> {
        let rows = self
            .backend
            .get_values(self.spec.tab, RowRange::All)
            .await?;

        let Some(raw_header) = rows.first() else {
            return Err(StoreError::SchemaRangeMissing(format!(
                "tab '{}' has no header row",
                self.spec.tab
            )));
        };
        let header = codec::normalize_header(raw_header);
        let Some(id_index) = header.iter().position(|c| c == self.spec.id_column) else {
            return Err(StoreError::SchemaRangeMissing(format!(
                "column '{}' missing in tab '{}'",
                self.spec.id_column, self.spec.tab
            )));
        };

        for (offset, row) in rows[1..].iter().enumerate() {
            let value = row.get(id_index).map(|cell| cell.trim()).unwrap_or("");
            if value == id {
                // Row 1 is the header, data starts at row 2.
                return Ok((offset + 2, header));
            }
        }

        Err(self.record_not_found(self.spec.id_column, id))
    }

    fn extra_columns(&self, payload: &Record) -> Vec<String> {
        payload
            .columns()
            .filter(|column| !self.spec.required_columns.contains(column))
            .map(str::to_string)
            .collect()
    }

    fn record_not_found(&self, column: &str, key: &str) -> StoreError {
        StoreError::RecordNotFound {
            tab: self.spec.tab.as_str().to_string(),
            column: column.to_string(),
            key: key.to_string(),
        }
    }
}

/// The children repository: the generic surface plus the secondary-key
/// lookup and row deletion. Children are the only entity kind with
/// end-to-end deletion in the reference system, so `delete` lives here
/// rather than on every repository.
pub struct ChildrenRepository {
    inner: Repository,
}

impl ChildrenRepository {
    pub async fn list(&self) -> StoreResult<Vec<Record>> {
        self.inner.list().await
    }

    pub async fn get_by_id(&self, child_id: &str) -> StoreResult<Record> {
        self.inner.get_by_id(child_id).await
    }

    /// First child whose `parent_email` matches, case-insensitively.
    pub async fn get_by_parent_email(&self, email: &str) -> StoreResult<Record> {
        let needle = email.trim().to_lowercase();
        for record in self.inner.list().await? {
            if record.get_or_empty("parent_email").trim().to_lowercase() == needle {
                return Ok(record);
            }
        }
        Err(self.inner.record_not_found("parent_email", email.trim()))
    }

    pub async fn add(&self, fields: Record) -> StoreResult<String> {
        self.inner.add(fields).await
    }

    pub async fn update(&self, child_id: &str, patch: Record) -> StoreResult<()> {
        self.inner.update(child_id, patch).await
    }

    pub async fn delete(&self, child_id: &str) -> StoreResult<()> {
        self.inner.delete(child_id).await
    }
}

/// Fresh record id: 32 lowercase hex characters.
fn generate_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

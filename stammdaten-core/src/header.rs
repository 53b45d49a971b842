//! Header reconciliation: additive-only, idempotent schema growth.

use tracing::debug;

use crate::backend::{BackendPort, RowRange};
use crate::codec;
use crate::error::{StoreError, StoreResult};
use crate::schema::TableSpec;

/// Make sure the tab has at least its bootstrap header and every required
/// column, plus any `extra_columns` a caller is about to write.
///
/// Pre-existing columns never move; new columns are appended at the right
/// edge, so rows written under an older header keep decoding correctly
/// (their missing trailing cells read as empty). Calling this twice with
/// the same inputs is a no-op that returns an identical header.
pub async fn ensure_header(
    backend: &dyn BackendPort,
    spec: &TableSpec,
    extra_columns: &[String],
) -> StoreResult<Vec<String>> {
    let rows = fetch_rows(backend, spec).await?;
    let (header, changed) = reconcile_header(rows.first(), spec, extra_columns);
    if changed {
        write_header(backend, spec, &header).await?;
    }
    Ok(header)
}

/// Current rows of the tab; a tab not created yet on the remote side is
/// created lazily and treated as empty.
pub(crate) async fn fetch_rows(
    backend: &dyn BackendPort,
    spec: &TableSpec,
) -> StoreResult<Vec<Vec<String>>> {
    match backend.get_values(spec.tab, RowRange::All).await {
        Ok(rows) => Ok(rows),
        Err(StoreError::SchemaRangeMissing(_)) => {
            backend.create_tab_if_missing(spec.tab).await?;
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

/// Pure reconciliation step: the header the tab must have, and whether
/// it differs from the stored one. `current` is the stored first row,
/// if any; without one the bootstrap header is the starting point.
pub(crate) fn reconcile_header(
    current: Option<&Vec<String>>,
    spec: &TableSpec,
    extra_columns: &[String],
) -> (Vec<String>, bool) {
    let mut changed = current.is_none();
    let mut header: Vec<String> = match current {
        Some(raw) => codec::normalize_header(raw),
        None => spec
            .bootstrap_header
            .iter()
            .map(|column| column.to_string())
            .collect(),
    };

    for column in spec.required_columns {
        if !header.iter().any(|existing| existing == column) {
            header.push(column.to_string());
            changed = true;
        }
    }
    for column in extra_columns {
        let column = column.trim();
        if !column.is_empty() && !header.iter().any(|existing| existing == column) {
            header.push(column.to_string());
            changed = true;
        }
    }

    (header, changed)
}

/// Rewrite only the header row; data rows stay untouched.
pub(crate) async fn write_header(
    backend: &dyn BackendPort,
    spec: &TableSpec,
    header: &[String],
) -> StoreResult<()> {
    debug!(tab = %spec.tab, columns = header.len(), "header rewritten");
    backend
        .update_values(spec.tab, RowRange::Single(1), vec![header.to_vec()])
        .await
}

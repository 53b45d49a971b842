//! Remote storage engine: the spreadsheet values API.
//!
//! Every port operation is a single synchronous request against the
//! tabular values API; failures are translated into the store's error
//! taxonomy right here and never re-wrapped further up. There is no
//! retry at this layer — only the pre-flight health check retries, and
//! it does so through its own policy.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::{BackendPort, RowRange};
use crate::config::GoogleConfig;
use crate::error::{StoreError, StoreResult};
use crate::schema::Tab;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// HTTP implementation of the backend port.
pub struct SheetsBackend {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsBackend {
    pub fn new(config: &GoogleConfig) -> Self {
        Self::with_base_url(
            DEFAULT_BASE_URL,
            &config.spreadsheet_id,
            &config.access_token,
        )
    }

    /// Point the backend at a different API host. Used by tests to drive
    /// the client against a scripted local responder.
    pub fn with_base_url(base_url: &str, spreadsheet_id: &str, access_token: &str) -> Self {
        SheetsBackend {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    fn a1_range(tab: Tab, rows: RowRange) -> String {
        match rows {
            RowRange::All => format!("{tab}!A:ZZ"),
            RowRange::Single(index) => format!("{tab}!A{index}:ZZ{index}"),
        }
    }

    async fn batch_update(&self, body: serde_json::Value) -> StoreResult<reqwest::Response> {
        let url = format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.base_url, self.spreadsheet_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(translate_transport)?;
        expect_success(response).await
    }

    async fn spreadsheet_metadata(&self) -> StoreResult<SpreadsheetMetadata> {
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=sheets.properties",
            self.base_url, self.spreadsheet_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(translate_transport)?;
        let response = expect_success(response).await?;
        response.json().await.map_err(translate_transport)
    }

    /// Numeric sheet id for a tab title; row deletion addresses sheets
    /// by id, not by title.
    async fn sheet_id(&self, tab: Tab) -> StoreResult<i64> {
        let metadata = self.spreadsheet_metadata().await?;
        metadata
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == tab.as_str())
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| {
                StoreError::SchemaRangeMissing(format!("tab '{tab}' does not exist yet"))
            })
    }
}

#[async_trait]
impl BackendPort for SheetsBackend {
    async fn get_values(&self, tab: Tab, rows: RowRange) -> StoreResult<Vec<Vec<String>>> {
        let range = Self::a1_range(tab, rows);
        debug!(%range, "values get");

        let response = self
            .http
            .get(self.values_url(&range))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(translate_transport)?;
        let response = expect_success(response).await?;

        let value_range: ValueRange = response.json().await.map_err(translate_transport)?;
        Ok(value_range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn update_values(
        &self,
        tab: Tab,
        rows: RowRange,
        values: Vec<Vec<String>>,
    ) -> StoreResult<()> {
        let range = Self::a1_range(tab, rows);
        debug!(%range, rows = values.len(), "values update");

        let response = self
            .http
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(translate_transport)?;
        expect_success(response).await?;
        Ok(())
    }

    async fn append_values(&self, tab: Tab, values: Vec<Vec<String>>) -> StoreResult<()> {
        let range = Self::a1_range(tab, RowRange::All);
        debug!(%range, rows = values.len(), "values append");

        let response = self
            .http
            .post(format!("{}:append", self.values_url(&range)))
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(translate_transport)?;
        expect_success(response).await?;
        Ok(())
    }

    async fn delete_row(&self, tab: Tab, row_index: usize) -> StoreResult<()> {
        if row_index <= 1 {
            return Err(StoreError::InvalidRange(
                "row 1 is the header and cannot be deleted".into(),
            ));
        }

        let sheet_id = self.sheet_id(tab).await?;
        debug!(%tab, row_index, "row delete");
        self.batch_update(json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_index - 1,
                        "endIndex": row_index,
                    }
                }
            }]
        }))
        .await?;
        Ok(())
    }

    async fn create_tab_if_missing(&self, tab: Tab) -> StoreResult<()> {
        let result = self
            .batch_update(json!({
                "requests": [{
                    "addSheet": { "properties": { "title": tab.as_str() } }
                }]
            }))
            .await;

        match result {
            Ok(_) => Ok(()),
            // Concurrent creation or an out-of-band tab: fine either way.
            Err(StoreError::TransientFailure(message)) if message.contains("already exists") => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn list_tabs(&self) -> StoreResult<Vec<String>> {
        let metadata = self.spreadsheet_metadata().await?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId", default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

/// The API nominally returns strings for RAW-written cells, but numbers
/// typed by hand into the sheet come back as JSON numbers.
fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn translate_transport(err: reqwest::Error) -> StoreError {
    StoreError::TransientFailure(format!("request to values api failed: {err}"))
}

async fn expect_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "values api error");
    Err(translate_status(status.as_u16(), &body))
}

/// One-shot translation of a non-success HTTP status into the error
/// taxonomy. 400 with "Unable to parse range" means the tab does not
/// exist yet and is recoverable by creating it.
fn translate_status(status: u16, body: &str) -> StoreError {
    let snippet: String = body.chars().take(300).collect();
    match status {
        403 => StoreError::PermissionDenied(format!(
            "the values api rejected the request; share the spreadsheet with the service account ({snippet})"
        )),
        404 => StoreError::NotFoundResource(format!("spreadsheet not found ({snippet})")),
        400 if body.contains("Unable to parse range") => {
            StoreError::SchemaRangeMissing(snippet)
        }
        _ => StoreError::TransientFailure(format!("values api returned status {status}: {snippet}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_status_permission_denied() {
        let err = translate_status(403, "The caller does not have permission");
        assert!(matches!(err, StoreError::PermissionDenied(_)), "{err:?}");
    }

    #[test]
    fn test_translate_status_document_missing() {
        let err = translate_status(404, "Requested entity was not found");
        assert!(matches!(err, StoreError::NotFoundResource(_)), "{err:?}");
    }

    #[test]
    fn test_translate_status_missing_tab_range() {
        let err = translate_status(400, r#"{"error": {"message": "Unable to parse range: children!A:ZZ"}}"#);
        assert!(matches!(err, StoreError::SchemaRangeMissing(_)), "{err:?}");
    }

    #[test]
    fn test_translate_status_other_bad_request_is_transient() {
        let err = translate_status(400, "Invalid value at data.values");
        assert!(matches!(err, StoreError::TransientFailure(_)), "{err:?}");
    }

    #[test]
    fn test_translate_status_server_error_is_transient() {
        let err = translate_status(503, "backend unavailable");
        assert!(matches!(err, StoreError::TransientFailure(_)), "{err:?}");
    }

    #[test]
    fn test_a1_ranges() {
        assert_eq!(
            SheetsBackend::a1_range(Tab::Children, RowRange::All),
            "children!A:ZZ"
        );
        assert_eq!(
            SheetsBackend::a1_range(Tab::Medications, RowRange::Single(7)),
            "medications!A7:ZZ7"
        );
    }

    #[test]
    fn test_cell_to_string_handles_non_string_cells() {
        assert_eq!(cell_to_string(serde_json::json!("Mia")), "Mia");
        assert_eq!(cell_to_string(serde_json::json!(42)), "42");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }
}

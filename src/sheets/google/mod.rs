// src/sheets/google/mod.rs
//! Google Sheets v4 REST backend.
//!
//! Value writes use `valueInputOption=RAW` so cell text is stored exactly as
//! sent. Structural row changes go through `spreadsheets.batchUpdate` with
//! 0-based half-open dimension ranges.

pub mod credentials;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use self::credentials::ServiceAccount;
use super::store::{
    AccessReport, SheetProperties, SpreadsheetStore, StoreError, StoreResult, WriteSummary,
};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

/// Refresh tokens this long before Google says they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    account: ServiceAccount,
    token: Mutex<Option<CachedToken>>,
    sheets_base: Url,
    drive_base: Url,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AppendValuesResponse {
    #[serde(default)]
    updates: Option<UpdateValuesResponse>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetPropertiesWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesWire {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: u32,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    #[serde(default)]
    capabilities: Option<DriveCapabilities>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveCapabilities {
    #[serde(default)]
    can_edit: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSheetsStore {
    pub fn new(account: ServiceAccount) -> StoreResult<Self> {
        let sheets_base = Url::parse(SHEETS_BASE_URL)
            .map_err(|e| StoreError::Transport(format!("invalid sheets base url: {}", e)))?;
        let drive_base = Url::parse(DRIVE_FILES_URL)
            .map_err(|e| StoreError::Transport(format!("invalid drive base url: {}", e)))?;
        info!(client_email = %account.client_email, "Using Google service account");
        Ok(Self {
            client: reqwest::Client::new(),
            account,
            token: Mutex::new(None),
            sheets_base,
            drive_base,
        })
    }

    /// Build from the service-account key JSON text.
    pub fn from_json(credentials: &str) -> StoreResult<Self> {
        Self::new(ServiceAccount::try_from_str(credentials)?)
    }

    async fn access_token(&self) -> StoreResult<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.account.fetch_access_token(&self.client).await?;
        debug!(expires_in = fresh.expires_in, "Fetched new access token");
        let value = fresh.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: now + Duration::seconds(fresh.expires_in),
        });
        Ok(value)
    }

    /// `{base}/{segments...}`, each segment percent-encoded as a path segment.
    fn url(base: &Url, segments: &[&str]) -> StoreResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("cannot extend url {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> StoreResult<Url> {
        Self::url(&self.sheets_base, &[spreadsheet_id, "values", range])
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> StoreResult<T> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }

    async fn batch_update(&self, spreadsheet_id: &str, request: serde_json::Value) -> StoreResult<()> {
        let url = Self::url(&self.sheets_base, &[&format!("{}:batchUpdate", spreadsheet_id)])?;
        let body = json!({ "requests": [request] });
        let _: serde_json::Value = self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into `StoreError::Api`, preferring Google's own
/// error message when the body carries one.
fn api_error(status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<GoogleErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.to_string()
            }
        });
    StoreError::Api { status, message }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 0-based half-open row span selecting physical row `absolute_row`.
fn row_dimension(sheet_id: i64, absolute_row: u32) -> StoreResult<serde_json::Value> {
    if absolute_row == 0 {
        return Err(StoreError::Api {
            status: 400,
            message: "row numbers start at 1".to_string(),
        });
    }
    Ok(json!({
        "sheetId": sheet_id,
        "dimension": "ROWS",
        "startIndex": absolute_row - 1,
        "endIndex": absolute_row,
    }))
}

#[async_trait]
impl SpreadsheetStore for GoogleSheetsStore {
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let url = self.values_url(spreadsheet_id, range)?;
        let body: ValueRange = self.send(self.client.get(url)).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary> {
        let mut url = self.values_url(spreadsheet_id, range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": values });
        let resp: UpdateValuesResponse = self.send(self.client.put(url).json(&body)).await?;
        debug!(spreadsheet_id, range, "Wrote range");
        Ok(WriteSummary {
            updated_range: resp.updated_range.unwrap_or_default(),
            updated_rows: resp.updated_rows.unwrap_or(0),
        })
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary> {
        let mut url = self.values_url(spreadsheet_id, &format!("{}:append", range))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": values });
        let resp: AppendValuesResponse = self.send(self.client.post(url).json(&body)).await?;
        let updates = resp.updates.unwrap_or_default();
        debug!(spreadsheet_id, range, "Appended rows");
        Ok(WriteSummary {
            updated_range: updates.updated_range.unwrap_or_default(),
            updated_rows: updates.updated_rows.unwrap_or(0),
        })
    }

    async fn insert_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()> {
        let request = json!({
            "insertDimension": {
                "range": row_dimension(sheet_id, absolute_row)?,
                "inheritFromBefore": absolute_row > 1,
            }
        });
        self.batch_update(spreadsheet_id, request).await
    }

    async fn delete_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()> {
        let request = json!({
            "deleteDimension": { "range": row_dimension(sheet_id, absolute_row)? }
        });
        self.batch_update(spreadsheet_id, request).await
    }

    async fn sheet_properties(&self, spreadsheet_id: &str) -> StoreResult<Vec<SheetProperties>> {
        let mut url = Self::url(&self.sheets_base, &[spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title,index)");
        let meta: SpreadsheetMetadata = self.send(self.client.get(url)).await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| SheetProperties {
                sheet_id: s.properties.sheet_id,
                title: s.properties.title,
                index: s.properties.index,
            })
            .collect())
    }

    async fn check_access(&self, spreadsheet_id: &str) -> StoreResult<AccessReport> {
        let mut url = Self::url(&self.drive_base, &[spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "capabilities/canEdit")
            .append_pair("supportsAllDrives", "true");
        match self.send::<DriveFile>(self.client.get(url)).await {
            Ok(file) => Ok(AccessReport {
                readable: true,
                writable: file
                    .capabilities
                    .and_then(|c| c.can_edit)
                    .unwrap_or(false),
            }),
            // Drive reports files not shared with the caller as missing
            Err(StoreError::Api { status: 404, .. }) => Ok(AccessReport {
                readable: false,
                writable: false,
            }),
            Err(e) => Err(e),
        }
    }

    fn caller_identity(&self) -> String {
        self.account.client_email.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_prefers_google_message() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let err = api_error(403, body);
        assert_eq!(
            err,
            StoreError::Api {
                status: 403,
                message: "The caller does not have permission".to_string()
            }
        );
        assert!(err.is_permission_denied());

        let err = api_error(502, "  Bad Gateway  ");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
        let err = api_error(500, "");
        assert_eq!(err.to_string(), "HTTP 500: empty response body");
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let base = Url::parse(SHEETS_BASE_URL).unwrap();
        let url = GoogleSheetsStore::url(&base, &["abc", "values", "'My Tab'!A1:Z1:append"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Tab'!A1:Z1:append"
        );
    }

    #[test]
    fn test_row_dimension_is_half_open() {
        let range = row_dimension(7, 5).unwrap();
        assert_eq!(range["startIndex"], 4);
        assert_eq!(range["endIndex"], 5);
        assert_eq!(range["sheetId"], 7);
        assert!(row_dimension(7, 0).is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(json!("x")), "x");
        assert_eq!(cell_text(json!(12)), "12");
        assert_eq!(cell_text(json!(true)), "true");
        assert_eq!(cell_text(serde_json::Value::Null), "");
    }
}

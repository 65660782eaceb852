//! Google Sheets `values.get` client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

use super::{CellValue, SheetSource, SourceError};
use crate::config::{SheetsAuth, SheetsConfig};

/// Cell range read from every sheet; row 1 is the header.
const DATA_RANGE: &str = "A2:Z1000";

/// Data rows covered by [`DATA_RANGE`]. A full range may hide more rows.
const MAX_DATA_ROWS: usize = 999;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Reads sheets of one spreadsheet over the Sheets v4 REST API.
#[derive(Debug, Clone)]
pub struct GoogleSheetsSource {
    client: Client,
    config: SheetsConfig,
}

impl GoogleSheetsSource {
    /// Builds a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the HTTP client cannot be
    /// constructed (TLS backend initialisation).
    pub fn new(config: SheetsConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn values_url(&self, sheet: &str) -> Result<Url, SourceError> {
        let range = format!("{sheet}!{DATA_RANGE}");
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| SourceError::Unavailable(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SourceError::Unavailable("base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                range.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("majorDimension", "ROWS");
        if let Some(SheetsAuth::ApiKey(key)) = &self.config.auth {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, SourceError> {
        let url = self.values_url(sheet)?;
        let mut request = self.client.get(url);
        if let Some(SheetsAuth::AccessToken(token)) = &self.config.auth {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(sheet, %status, "sheets api request failed");
            return Err(classify_status(sheet, status, &body));
        }

        let range: ValueRange = response.json().await.map_err(|e| SourceError::Sheet {
            sheet: sheet.to_string(),
            reason: format!("malformed response: {e}"),
        })?;

        tracing::debug!(sheet, rows = range.values.len(), "sheet fetched");
        check_row_limit(sheet, range.values.len())?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::from).collect())
            .collect())
    }
}

/// Maps an HTTP failure to the sync's notion of fatal vs per-sheet.
///
/// Google answers an unknown tab or bad range with 400; everything else
/// (auth, missing spreadsheet, quota, server errors) concerns the whole
/// source.
fn classify_status(sheet: &str, status: StatusCode, body: &str) -> SourceError {
    let detail: String = body.chars().take(200).collect();
    if status == StatusCode::BAD_REQUEST {
        SourceError::Sheet {
            sheet: sheet.to_string(),
            reason: format!("HTTP {status}: {detail}"),
        }
    } else {
        SourceError::Unavailable(format!("HTTP {status}: {detail}"))
    }
}

/// Rejects a sheet that fills the whole read range, so rows beyond it are
/// not mistaken for removed items.
fn check_row_limit(sheet: &str, rows: usize) -> Result<(), SourceError> {
    if rows >= MAX_DATA_ROWS {
        tracing::warn!(sheet, rows, "sheet fills the read range");
        return Err(SourceError::Sheet {
            sheet: sheet.to_string(),
            reason: format!("{rows} rows reach the read limit of {MAX_DATA_ROWS}"),
        });
    }
    Ok(())
}

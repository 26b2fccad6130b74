//! Spreadsheet gateway: pointer-cell read, row insertion, and cell writes.
//!
//! The sheet has a fixed-format region, so a new entry is not a simple
//! append: a pointer cell names the next insertion row, a row is inserted at
//! that index, and the topic's cells are written into the inserted row. The
//! trait exposes those three primitives; sequencing them (and serializing
//! the sequence across concurrent requests) is the orchestrator's job.
//!
//! `SheetsClient` is the production implementation over the Google Sheets v4
//! REST API.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::GatewayError;

/// A single cell write: an A1 range and the value to place there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub range: String,
    pub value: String,
}

impl CellWrite {
    pub fn new(range: impl Into<String>, value: impl Into<String>) -> Self {
        CellWrite {
            range: range.into(),
            value: value.into(),
        }
    }
}

/// Mutates and reads the reservation spreadsheet.
pub trait SheetsGateway {
    /// Reads a single cell. Returns `None` if the cell is empty.
    fn read_cell(
        &self,
        range: &str,
    ) -> impl Future<Output = Result<Option<String>, GatewayError>> + Send;

    /// Inserts one row at `at_index` (0-based) in the sheet with the given
    /// numeric sheet ID, inheriting formatting from the row before.
    fn insert_row(
        &self,
        sheet_id: i64,
        at_index: u32,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Writes values into cells. Values are interpreted as user-entered, so
    /// formulas (e.g., HYPERLINK) take effect.
    fn batch_write_cells(
        &self,
        writes: Vec<CellWrite>,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<T: SheetsGateway + Send + Sync> SheetsGateway for std::sync::Arc<T> {
    fn read_cell(
        &self,
        range: &str,
    ) -> impl Future<Output = Result<Option<String>, GatewayError>> + Send {
        (**self).read_cell(range)
    }

    fn insert_row(
        &self,
        sheet_id: i64,
        at_index: u32,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).insert_row(sheet_id, at_index)
    }

    fn batch_write_cells(
        &self,
        writes: Vec<CellWrite>,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).batch_write_cells(writes)
    }
}

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// A Google Sheets client scoped to one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

impl SheetsClient {
    /// Creates a client for the given spreadsheet, with a bounded per-request
    /// timeout. `token` is an OAuth bearer token for the spreadsheets scope.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Self::with_base_url(SHEETS_API_BASE, spreadsheet_id, token, timeout)
    }

    /// Like [`SheetsClient::new`] but against a different API base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GatewayError::from_reqwest("failed to build spreadsheet HTTP client", e)
            })?;
        Ok(SheetsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        })
    }

    /// Builds the URL for a single-range values read, percent-encoding the
    /// range (A1 ranges contain `!`, and sheet names may contain spaces).
    fn values_url(&self, range: &str) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GatewayError::malformed(format!("invalid sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::malformed("sheets base URL cannot carry a path"))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }

    async fn post_json(&self, url: String, body: serde_json::Value) -> Result<(), GatewayError> {
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest("spreadsheet request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(
                "spreadsheet rejected the request",
                status.as_u16(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

/// Response shape of a `values/{range}` read.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsGateway for SheetsClient {
    async fn read_cell(&self, range: &str) -> Result<Option<String>, GatewayError> {
        let url = self.values_url(range)?;
        debug!(%range, "reading pointer cell");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest("spreadsheet read failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(
                format!("spreadsheet rejected read of {}", range),
                status.as_u16(),
            ));
        }

        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest("malformed spreadsheet response", e))?;

        Ok(value_range
            .values
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }

    async fn insert_row(&self, sheet_id: i64, at_index: u32) -> Result<(), GatewayError> {
        debug!(sheet_id, at_index, "inserting spreadsheet row");
        let url = format!("{}/{}:batchUpdate", self.base_url, self.spreadsheet_id);
        self.post_json(
            url,
            json!({
                "requests": [{
                    "insertDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": at_index,
                            "endIndex": at_index + 1,
                        },
                        "inheritFromBefore": true,
                    }
                }]
            }),
        )
        .await
    }

    async fn batch_write_cells(&self, writes: Vec<CellWrite>) -> Result<(), GatewayError> {
        debug!(count = writes.len(), "writing spreadsheet cells");
        let url = format!(
            "{}/{}/values:batchUpdate",
            self.base_url, self.spreadsheet_id
        );
        let data: Vec<serde_json::Value> = writes
            .iter()
            .map(|w| json!({ "range": w.range, "values": [[w.value]] }))
            .collect();
        self.post_json(
            url,
            json!({
                "valueInputOption": "USER_ENTERED",
                "data": data,
            }),
        )
        .await
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{RowSet, SheetId, WorksheetName},
    error::GatewayError,
};
use tracing::{debug, info};

pub mod auth;

pub use auth::{ServiceAccountKey, StaticTokenSource, TokenProvider, TokenSource};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// The narrow interface the rest of the system sees of the remote tabular
/// store: read everything, append one row, list the tabs.
#[async_trait]
pub trait SpreadsheetGateway: Send + Sync {
    async fn list_worksheets(
        &self,
        sheet_id: &SheetId,
    ) -> Result<Vec<WorksheetName>, GatewayError>;

    async fn read_all_records(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
    ) -> Result<RowSet, GatewayError>;

    async fn append_row(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
        values: &[String],
    ) -> Result<(), GatewayError>;
}

/// Stand-in used before a service account has been uploaded. Every call
/// fails with a credentials error instead of reaching the network.
pub struct UnconfiguredGateway;

#[async_trait]
impl SpreadsheetGateway for UnconfiguredGateway {
    async fn list_worksheets(
        &self,
        _sheet_id: &SheetId,
    ) -> Result<Vec<WorksheetName>, GatewayError> {
        Err(GatewayError::Credentials(
            "no service account configured".to_string(),
        ))
    }

    async fn read_all_records(
        &self,
        _sheet_id: &SheetId,
        _worksheet: &WorksheetName,
    ) -> Result<RowSet, GatewayError> {
        Err(GatewayError::Credentials(
            "no service account configured".to_string(),
        ))
    }

    async fn append_row(
        &self,
        _sheet_id: &SheetId,
        _worksheet: &WorksheetName,
        _values: &[String],
    ) -> Result<(), GatewayError> {
        Err(GatewayError::Credentials(
            "no service account configured".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}

/// Gateway backed by a Sheets-v4-style REST surface. The base URL is
/// injectable so tests can point it at an in-process server.
pub struct HttpSheetsGateway {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpSheetsGateway {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(tokens, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(tokens: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), tokens, base_url)
    }

    /// Injectable client, used by tests that need proxy-free requests to an
    /// in-process server.
    pub fn with_http_client(
        http: Client,
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    async fn classify_failure(&self, sheet_id: &SheetId, response: Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => GatewayError::SpreadsheetNotFound {
                sheet_id: sheet_id.0.clone(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Permission(format!(
                "the spreadsheet service denied access ({status}): {body}"
            )),
            _ => GatewayError::Transport(format!("unexpected status {status}: {body}")),
        }
    }

    async fn fetch_metadata(&self, sheet_id: &SheetId) -> Result<SpreadsheetMeta, GatewayError> {
        let token = self.tokens.bearer_token().await?;
        let response = self
            .http
            .get(format!(
                "{}/v4/spreadsheets/{}?fields=sheets.properties.title",
                self.base_url, sheet_id.0
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.classify_failure(sheet_id, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid metadata response: {e}")))
    }

    async fn fetch_values(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
    ) -> Result<ValueRange, GatewayError> {
        let token = self.tokens.bearer_token().await?;
        let response = self
            .http
            .get(format!(
                "{}/v4/spreadsheets/{}/values/{}",
                self.base_url, sheet_id.0, worksheet.0
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.classify_failure(sheet_id, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid value range response: {e}")))
    }

    async fn ensure_worksheet_exists(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
    ) -> Result<(), GatewayError> {
        let titles = self.list_worksheets(sheet_id).await?;
        if titles.iter().any(|t| t == worksheet) {
            return Ok(());
        }
        Err(GatewayError::WorksheetNotFound {
            worksheet: worksheet.0.clone(),
        })
    }
}

#[async_trait]
impl SpreadsheetGateway for HttpSheetsGateway {
    async fn list_worksheets(
        &self,
        sheet_id: &SheetId,
    ) -> Result<Vec<WorksheetName>, GatewayError> {
        let meta = self.fetch_metadata(sheet_id).await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|entry| WorksheetName(entry.properties.title))
            .collect())
    }

    async fn read_all_records(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
    ) -> Result<RowSet, GatewayError> {
        // Resolve the tab against the live list first so a missing worksheet
        // is reported as such rather than as an opaque range error.
        self.ensure_worksheet_exists(sheet_id, worksheet).await?;

        let range = self.fetch_values(sheet_id, worksheet).await?;
        let mut raw = range.values.into_iter();
        let Some(header) = raw.next() else {
            return Ok(RowSet::default());
        };

        let mut rows = RowSet::new(header);
        for values in raw {
            rows.push_row(values);
        }
        debug!(
            sheet_id = %sheet_id,
            worksheet = %worksheet,
            rows = rows.len(),
            columns = rows.columns.len(),
            "read worksheet records"
        );
        Ok(rows)
    }

    async fn append_row(
        &self,
        sheet_id: &SheetId,
        worksheet: &WorksheetName,
        values: &[String],
    ) -> Result<(), GatewayError> {
        let token = self.tokens.bearer_token().await?;
        let response = self
            .http
            .post(format!(
                "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
                self.base_url, sheet_id.0, worksheet.0
            ))
            .bearer_auth(token)
            .json(&AppendRequest {
                values: vec![values.to_vec()],
            })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.classify_failure(sheet_id, response).await);
        }
        info!(
            sheet_id = %sheet_id,
            worksheet = %worksheet,
            cells = values.len(),
            "appended row to worksheet"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection before any side effect. Fully recoverable: the form keeps the
/// entered values and the user corrects and resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("the video URL field is required")]
    MissingVideoUrl,
    #[error("video URL '{url}' must start with http:// or https://")]
    MalformedVideoUrl { url: String },
}

/// Failures at the spreadsheet gateway boundary. Surfaced per-target as a
/// Failed outcome, never fatal, never retried automatically.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("spreadsheet '{sheet_id}' not found")]
    SpreadsheetNotFound { sheet_id: String },
    #[error("worksheet '{worksheet}' not found in the spreadsheet")]
    WorksheetNotFound { worksheet: String },
    #[error("permission denied by the spreadsheet service: {0}")]
    Permission(String),
    #[error("spreadsheet transport failure: {0}")]
    Transport(String),
    #[error("service account credentials unavailable: {0}")]
    Credentials(String),
}

/// Failures at the webhook boundary. The distinguishing reason is kept for
/// user-facing diagnostics; all variants are equally terminal per attempt.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("webhook request timed out")]
    Timeout,
    #[error("webhook connection failed: {0}")]
    Connection(String),
    #[error("http status {code}, body {body}")]
    Status { code: u16, body: String },
}

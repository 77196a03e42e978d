use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{error::WebhookError, protocol::WebhookPayload};
use tracing::info;
use url::Url;

/// How long one delivery attempt may take end to end.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One-shot delivery of a submission to an external receiver. A single
/// attempt per submission; retrying is the caller's (human) decision.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, url: &Url, payload: &WebhookPayload) -> Result<(), WebhookError>;
}

/// Delivers the payload as a JSON POST. Any 200/201/202 response counts as
/// accepted; everything else is a failure carrying the response body.
pub struct HttpWebhookSink {
    http: Client,
    timeout: Duration,
}

impl HttpWebhookSink {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_http_client(Client::new(), timeout)
    }

    /// Injectable client, used by tests that need proxy-free requests to an
    /// in-process receiver.
    pub fn with_http_client(http: Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

impl Default for HttpWebhookSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, url: &Url, payload: &WebhookPayload) -> Result<(), WebhookError> {
        let response = self
            .http
            .post(url.clone())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Timeout
                } else {
                    WebhookError::Connection(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => {
                info!(url = %url, "webhook accepted submission");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(WebhookError::Status {
                    code: status.as_u16(),
                    body,
                })
            }
        }
    }
}

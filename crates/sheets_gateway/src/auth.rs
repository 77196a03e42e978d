use std::{
    path::Path,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::GatewayError;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are treated as expired this long before the service says so, so a
/// token never dies mid-request.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// A parsed Google service-account key file. Deserialization fails when any
/// required field is absent, which is the upload-time validity check.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json_str(raw: &str) -> Result<Self, GatewayError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| GatewayError::Credentials(format!("invalid service account JSON: {e}")))?;
        if key.key_type != "service_account" {
            return Err(GatewayError::Credentials(format!(
                "unexpected key type '{}', expected 'service_account'",
                key.key_type
            )));
        }
        Ok(key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Credentials(format!(
                "failed to read service account file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

fn build_claims(key: &ServiceAccountKey, now_epoch: i64) -> AssertionClaims {
    AssertionClaims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now_epoch,
        exp: now_epoch + ASSERTION_LIFETIME_SECS,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Something that can produce a bearer token for the spreadsheet service.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String, GatewayError>;
}

/// A pre-issued token, used by tests and by callers that manage their own
/// credential exchange.
pub struct StaticTokenSource(pub String);

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn bearer_token(&self) -> Result<String, GatewayError> {
        Ok(self.0.clone())
    }
}

/// Mints an RS256 service-account assertion, exchanges it at the key's
/// `token_uri`, and caches the bearer token until shortly before expiry.
/// One provider per uploaded credential; a credential change means a new
/// provider.
pub struct TokenProvider {
    http: Client,
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            http: Client::new(),
            key,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    async fn exchange(&self) -> Result<(String, Duration), GatewayError> {
        let claims = build_claims(&self.key, Utc::now().timestamp());
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| GatewayError::Credentials(format!("invalid private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| GatewayError::Credentials(format!("failed to sign assertion: {e}")))?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Credentials(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Credentials(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Credentials(format!("invalid token response: {e}")))?;
        Ok((token.access_token, Duration::from_secs(token.expires_in)))
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn bearer_token(&self) -> Result<String, GatewayError> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh() {
                debug!(client_email = %self.key.client_email, "reusing cached bearer token");
                return Ok(cached.access_token.clone());
            }
            *guard = None;
        }

        let (access_token, lifetime) = self.exchange().await?;
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_SLACK);
        info!(
            client_email = %self.key.client_email,
            lifetime_secs = lifetime.as_secs(),
            "minted new bearer token"
        );
        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::config::GoogleCredentials;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum GoogleAuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges the long-lived refresh token for short-lived access tokens.
pub struct GoogleTokenSource {
    client: Client,
    credentials: GoogleCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleTokenSource {
    pub fn new(client: Client, credentials: GoogleCredentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, GoogleAuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self.client.post(TOKEN_ENDPOINT).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("invalid_grant") {
                error!("Google refresh token has expired or been revoked; generate a new one");
            }
            return Err(GoogleAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        debug!(lifetime_secs = lifetime.as_secs(), "refreshed Google access token");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });
        Ok(token.access_token)
    }
}

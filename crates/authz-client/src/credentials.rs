//! OAuth2 client-credentials token source for hosted oracles.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::OracleError;

const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub api_token_issuer: String,
    pub api_audience: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_token_issuer", &self.api_token_issuer)
            .field("api_audience", &self.api_audience)
            .finish()
    }
}

impl ClientCredentials {
    pub fn token_url(&self) -> String {
        let issuer = self.api_token_issuer.trim_end_matches('/');
        if issuer.starts_with("http://") || issuer.starts_with("https://") {
            format!("{issuer}/oauth/token")
        } else {
            format!("https://{issuer}/oauth/token")
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Fetches and caches bearer tokens.
pub(crate) struct TokenSource {
    http: reqwest::Client,
    credentials: ClientCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(crate) fn new(http: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self {
            http,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub(crate) async fn bearer(&self) -> Result<String, OracleError> {
        let mut guard = self.cached.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, OracleError> {
        let url = self.credentials.token_url();
        debug!(target = "authz-client", %url, "requesting oracle access token");
        let response = self
            .http
            .post(&url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
                audience: &self.credentials.api_audience,
            })
            .send()
            .await
            .map_err(|err| OracleError::Unavailable(format!("token request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::Rejected {
                status: status.as_u16(),
                message: format!("token issuer: {message}"),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| OracleError::InvalidResponse(format!("token response: {err}")))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME));
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(issuer: &str) -> ClientCredentials {
        ClientCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            api_token_issuer: issuer.into(),
            api_audience: "https://api.fga.example/".into(),
        }
    }

    #[test]
    fn bare_issuer_gets_https_scheme() {
        assert_eq!(
            credentials("issuer.fga.example").token_url(),
            "https://issuer.fga.example/oauth/token"
        );
        assert_eq!(
            credentials("http://127.0.0.1:9000/").token_url(),
            "http://127.0.0.1:9000/oauth/token"
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", credentials("issuer"));
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}

//! OAuth2 refresh-token grant with an in-memory access token cache.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StorageError;

/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 client credentials and the long-lived refresh token.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Hands out access tokens, refreshing them only when the cached one is
/// about to expire.
pub struct TokenSource {
    client: Client,
    credentials: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    #[must_use]
    pub fn new(client: Client, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`] when Google rejects the refresh token
    /// and [`StorageError::Http`] on transport failure.
    pub async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.refresh().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn refresh(&self) -> Result<CachedToken, StorageError> {
        tracing::debug!(token_url = %self.credentials.token_url, "refreshing Google access token");
        let response = self
            .client
            .post(&self.credentials.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StorageError::http("token refresh", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::http("token refresh", e))?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Google token refresh rejected");
            return Err(StorageError::Auth(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| StorageError::Deserialize {
                context: "token refresh".to_owned(),
                source: e,
            })?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn source(server: &MockServer) -> TokenSource {
        TokenSource::new(
            Client::new(),
            OAuthCredentials {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                refresh_token: "refresh".into(),
                token_url: format!("{}/token", server.uri()),
            },
        )
    }

    #[tokio::test]
    async fn token_is_cached_until_near_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.first",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = source(&server);
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.first");
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.first");
    }

    #[tokio::test]
    async fn short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let tokens = source(&server);
        tokens.access_token().await.unwrap();
        tokens.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_refresh_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "invalid_grant" })),
            )
            .mount(&server)
            .await;

        let err = source(&server).access_token().await.unwrap_err();
        assert!(
            matches!(err, StorageError::Auth(ref msg) if msg.contains("invalid_grant")),
            "got {err:?}"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = OAuthCredentials {
            client_id: "cid".into(),
            client_secret: "hunter2".into(),
            refresh_token: "1//refresh".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("1//refresh"));
    }
}

//! Google Drive and Sheets REST clients sharing one OAuth token source.

mod auth;
mod drive;
mod sheets;

use std::sync::Arc;

use canvass_core::AppConfig;
use reqwest::{Client, RequestBuilder};

use crate::error::StorageError;

pub use auth::{OAuthCredentials, TokenSource};
pub use drive::DrivePhotoStore;
pub use sheets::SheetsClient;

/// HTTP client plus bearer-token source used by every Google call.
pub struct GoogleClient {
    http: Client,
    tokens: TokenSource,
}

impl GoogleClient {
    /// Upload and append calls keep the transport's default timeout; only
    /// the connect phase is bounded.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Http`] if the HTTP client cannot be constructed.
    pub fn new(credentials: OAuthCredentials, user_agent: &str) -> Result<Self, StorageError> {
        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(|e| StorageError::http("client construction", e))?;
        Ok(Self {
            tokens: TokenSource::new(http.clone(), credentials),
            http,
        })
    }

    /// Builds the Drive store and Sheets client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Http`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<(DrivePhotoStore, SheetsClient), StorageError> {
        let google = &config.google;
        let client = Arc::new(Self::new(
            OAuthCredentials {
                client_id: google.client_id.clone(),
                client_secret: google.client_secret.clone(),
                refresh_token: google.refresh_token.clone(),
                token_url: google.token_url.clone(),
            },
            &config.user_agent,
        )?);

        let drive = DrivePhotoStore::new(
            client.clone(),
            &google.drive_base_url,
            google.drive_folder_id.clone(),
        );
        let sheets = SheetsClient::new(
            client,
            &google.sheets_base_url,
            &google.sheet_id,
            &config.visit_sheet,
        );
        Ok((drive, sheets))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Attaches a bearer token, sends, checks the status and parses the
    /// JSON body. An empty body parses as `null`.
    pub(crate) async fn send_json(
        &self,
        context: &str,
        request: RequestBuilder,
    ) -> Result<serde_json::Value, StorageError> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::http(context, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::http(context, e))?;

        if !status.is_success() {
            return Err(StorageError::UnexpectedStatus {
                context: context.to_owned(),
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StorageError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_owned(),
    }
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}

#[cfg(test)]
pub(crate) mod test_support {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Mounts a token endpoint on `server` and returns a client using it.
    pub(crate) async fn google_client(server: &MockServer) -> Arc<GoogleClient> {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test-token",
                "expires_in": 3600
            })))
            .mount(server)
            .await;

        Arc::new(
            GoogleClient::new(
                OAuthCredentials {
                    client_id: "cid".into(),
                    client_secret: "secret".into(),
                    refresh_token: "refresh".into(),
                    token_url: format!("{}/token", server.uri()),
                },
                "canvass-test",
            )
            .expect("client"),
        )
    }
}

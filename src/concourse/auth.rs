use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{BoardError, Result};

const CLIENT_ID: &str = "fly";
const CLIENT_SECRET: &str = "Zmx5";
const SCOPES: &str = "openid profile email federated:id groups";

/// Bearer token returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token_type: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
}

/// Exchanges a username and password for a bearer token using the OAuth2
/// resource owner password credentials grant against `{base_url}/sky/token`.
pub struct TokenAcquirer {
    client: Client,
    token_url: String,
}

impl TokenAcquirer {
    pub fn new(base_url: &str, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("progress-board/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| BoardError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: format!("{}/sky/token", base_url.trim_end_matches('/')),
        })
    }

    /// Performs the password grant.
    ///
    /// # Errors
    ///
    /// * `AuthenticationRejected` when the endpoint answers with a 4xx status
    /// * `MalformedTokenResponse` when the body has no usable token
    /// * `Network` on transport failures
    pub async fn acquire(&self, username: &str, password: &str) -> Result<AccessToken> {
        debug!("POST {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(CLIENT_ID, Some(CLIENT_SECRET))
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
                ("scope", SCOPES),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("Response code: {status}");

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(BoardError::AuthenticationRejected {
                status: status.as_u16(),
                body,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BoardError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| BoardError::MalformedTokenResponse(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(BoardError::MalformedTokenResponse(
                "response did not include an access_token".to_string(),
            ));
        }

        let token_type = if token.token_type.is_empty() {
            "Bearer".to_string()
        } else {
            token.token_type
        };

        info!("Obtained {token_type} token for user {username}");

        Ok(AccessToken {
            token_type,
            value: token.access_token,
        })
    }
}

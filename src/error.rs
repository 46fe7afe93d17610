use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("AuthenticationRejected: token endpoint returned HTTP {status}: {body}")]
    AuthenticationRejected { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("Unauthorized: the saved token was rejected by the CI server")]
    Unauthorized,

    #[error("API request failed with HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BoardError>;

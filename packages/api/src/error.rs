//! Error type for every remote call made by the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, TLS, connection reset, body decode).
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// OTP dispatch or verification was refused.
    #[error("{0}")]
    Auth(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("image upload failed: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ApiError {
    /// Whether the backend reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_) | ApiError::Status { status: 404, .. })
    }
}

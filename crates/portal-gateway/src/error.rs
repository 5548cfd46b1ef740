//! Gateway error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Terminal: the session could not be renewed after a 401
    #[error("Authentication required: {0}")]
    Authentication(#[from] RefreshError),

    /// Terminal: the API rejected the request even after a retry
    #[error("Unauthorized: {method} {path}")]
    Unauthorized { method: String, path: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// True for failures that require the user to sign in again
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::Authentication(_) | GatewayError::Unauthorized { .. }
        )
    }
}

/// Outcome of a shared refresh; cloned to every waiter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Silent sign-in failed: {0}")]
    SigninFailed(String),

    #[error("Silent sign-in produced no session")]
    NoSession,

    #[error("Refresh task aborted: {0}")]
    Aborted(String),
}

impl From<portal_auth::AuthError> for RefreshError {
    fn from(err: portal_auth::AuthError) -> Self {
        RefreshError::SigninFailed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),
}

//! Identity error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login required: no refresh token in session")]
    LoginRequired,

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Redirect failed: {0}")]
    Redirect(String),
}

/// Failure to decode an access token payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Token must have 3 segments, found {0}")]
    Malformed(usize),

    #[error("Payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Payload is not valid JSON: {0}")]
    Json(String),
}

//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Auth error: {0}")]
    Auth(#[from] portal_auth::AuthError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] portal_gateway::GatewayError),

    #[error("User error: {0}")]
    User(#[from] portal_users::UserError),

    #[error("Tab error: {0}")]
    Tab(#[from] portal_tabs::TabError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

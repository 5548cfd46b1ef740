//! User administration error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Admin role required")]
    NotAdmin,

    #[error("Username must be at least {0} characters")]
    UsernameTooShort(usize),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("{0} cannot be empty")]
    MissingField(&'static str),

    #[error("Gateway error: {0}")]
    Gateway(#[from] portal_gateway::GatewayError),
}

//! Tab coordination error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Malformed leader message: {0}")]
    Malformed(#[from] serde_json::Error),
}

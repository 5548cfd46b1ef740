//! CLI commands
//!
//! Each command returns a `CommandResult`; the binary prints it as JSON.

pub mod dashboard;
pub mod diagnostics;
pub mod session;
pub mod users;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for CommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

pub fn render<T: Serialize>(result: CommandResult<T>) -> String {
    serde_json::to_string_pretty(&result)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"data":null,"error":"{e}"}}"#))
}

//! User account types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::UserError;
use crate::Result;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Creator,
    #[default]
    Basic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Creator => "Creator",
            Role::Basic => "Basic",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "creator" => Ok(Role::Creator),
            "basic" => Ok(Role::Basic),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Application user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Subject id of the matching identity provider account
    pub keycloak_user_id: String,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Create-user form input, including the password confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFormData {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl UserFormData {
    /// Check the form and turn it into a registration request
    pub fn validate(self) -> Result<UserRegistrationRequest> {
        if self.username.trim().is_empty() {
            return Err(UserError::MissingField("Username"));
        }
        if self.username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(UserError::UsernameTooShort(MIN_USERNAME_LEN));
        }
        if self.email.trim().is_empty() {
            return Err(UserError::MissingField("Email"));
        }
        if self.password != self.confirm_password {
            return Err(UserError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        Ok(UserRegistrationRequest {
            username: self.username,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
        })
    }
}

//! Session data structure

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::claims::{parse_claims, Claims};
use crate::error::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer credential presented to the API
    pub access_token: String,
    /// Absolute expiry in seconds since the epoch
    pub expires_at: Option<i64>,
    /// Used for non-interactive renewal
    pub refresh_token: Option<String>,
    /// Passed as a hint on sign-out
    pub id_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Build a session that expires `expires_in` seconds from now
    pub fn expiring_in(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self::new(access_token, Some(now_secs().saturating_add(expires_in)))
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// True when the token expires before `now + margin`.
    ///
    /// A session without an expiry never needs renewal.
    pub fn expires_within(&self, margin: i64, now: i64) -> bool {
        self.expires_at
            .map(|expires_at| expires_at < now.saturating_add(margin))
            .unwrap_or(false)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_within(0, now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn claims(&self) -> std::result::Result<Claims, DecodeError> {
        parse_claims(&self.access_token)
    }
}

/// Current time in seconds since the epoch
pub(crate) fn now_secs() -> i64 {
    Utc::now().timestamp()
}

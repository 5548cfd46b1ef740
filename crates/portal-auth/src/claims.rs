//! Access token claims and realm roles

use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The subset of JWT claims the portal reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub preferred_username: Option<String>,
    pub given_name: Option<String>,
    pub email: Option<String>,
    pub realm_access: Option<RealmAccess>,
}

impl Claims {
    pub fn roles(&self) -> Roles {
        let raw = self
            .realm_access
            .as_ref()
            .map(|access| access.roles.as_slice())
            .unwrap_or_default();
        Roles::from_names(raw)
    }

    /// Display name, preferring the given name
    pub fn display_name(&self) -> Option<&str> {
        self.given_name
            .as_deref()
            .or(self.preferred_username.as_deref())
    }
}

/// Decode the payload segment of a JWT without verifying its signature.
///
/// The API validates signatures; the client only needs the claims for gating.
pub fn parse_claims(token: &str) -> Result<Claims, DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::Malformed(parts.len()));
    }

    let payload = parts[1]
        .trim_end_matches('=')
        .replace('+', "-")
        .replace('/', "_");
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json(e.to_string()))
}

/// Realm roles, normalized to lowercase for case-insensitive checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roles(BTreeSet<String>);

impl Roles {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self(
            names
                .iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        )
    }

    /// Roles of an optional access token; undecodable tokens carry no roles
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(parse_claims) {
            Some(Ok(claims)) => claims.roles(),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Could not decode access token claims");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.0.contains(&role.to_lowercase())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("Admin")
    }

    pub fn is_creator(&self) -> bool {
        self.has_role("Creator")
    }

    pub fn is_basic(&self) -> bool {
        self.has_role("Basic")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

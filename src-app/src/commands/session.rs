//! Sign-in state and route commands
use chrono::{DateTime, Utc};
use serde::Serialize;

use portal_core::{IdentityProvider, Route, View};

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub welcome_name: Option<String>,
    pub roles: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub can_refresh: bool,
    pub tab_id: String,
}

#[derive(Debug, Serialize)]
pub struct RedirectInfo {
    /// Where a browser would have been sent
    pub url: Option<String>,
}

impl RedirectInfo {
    fn from_state(state: &AppState) -> Self {
        Self {
            url: state.navigator().last().map(|url| url.to_string()),
        }
    }
}

pub fn whoami(state: &AppState) -> CommandResult<SessionInfo> {
    let app = state.app();
    let session = state.oidc().session();

    CommandResult::ok(SessionInfo {
        authenticated: session.is_some(),
        welcome_name: app.welcome_name(),
        roles: app.roles().iter().map(str::to_string).collect(),
        expires_at: session
            .as_ref()
            .and_then(|s| s.expires_at)
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        expired: session
            .as_ref()
            .is_some_and(|s| s.is_expired(Utc::now().timestamp())),
        can_refresh: session.as_ref().is_some_and(|s| s.can_refresh()),
        tab_id: app.status().tab_id.to_string(),
    })
}

/// Render a path, following client-side redirects
pub async fn open(state: &AppState, path: &str) -> CommandResult<View> {
    let mut path = path.to_string();
    loop {
        match state.app().open(&path).await {
            Ok(View::Redirect(route)) if route != Route::Logout => {
                tracing::debug!(from = %path, to = %route, "Following redirect");
                path = route.path().to_string();
            }
            other => return other.into(),
        }
    }
}

pub async fn login(state: &AppState) -> CommandResult<RedirectInfo> {
    match state.app().login().await {
        Ok(()) => CommandResult::ok(RedirectInfo::from_state(state)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn logout(state: &AppState, global: bool) -> CommandResult<RedirectInfo> {
    if !global {
        state.app().logout_local().await;
        return CommandResult::ok(RedirectInfo { url: None });
    }
    match state.app().logout_global().await {
        Ok(()) => CommandResult::ok(RedirectInfo::from_state(state)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

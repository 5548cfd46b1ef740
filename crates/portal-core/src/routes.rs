//! Client routes and the sign-in guard

use portal_auth::{IdentityProvider, SigninState};
use serde::Serialize;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Home,
    Dashboard,
    Logout,
}

impl Route {
    /// Resolve a location path; `/` and `/home` both land on Home
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_matches('/') {
            "" | "home" => Some(Route::Home),
            "dashboard" => Some(Route::Dashboard),
            "logout" => Some(Route::Logout),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Dashboard => "/dashboard",
            Route::Logout => "/logout",
        }
    }

    /// Routes that require a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Provider still restoring the session
    Loading,
    /// Sign-in redirect issued; nothing renders
    RedirectingToLogin,
    Granted,
}

/// Check a route against the current sign-in state.
///
/// Unauthenticated visits to a protected route start the interactive
/// sign-in, carrying the requested path so the callback can return to it.
pub async fn guard(route: Route, provider: &dyn IdentityProvider) -> Result<RouteAccess> {
    if !route.is_protected() {
        return Ok(RouteAccess::Granted);
    }
    if provider.is_loading() {
        return Ok(RouteAccess::Loading);
    }
    if !provider.is_authenticated() {
        tracing::info!(route = %route, "Not signed in, redirecting to login");
        provider
            .signin_redirect(Some(SigninState::return_to(route.path())))
            .await?;
        return Ok(RouteAccess::RedirectingToLogin);
    }
    Ok(RouteAccess::Granted)
}

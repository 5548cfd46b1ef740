//! Identity provider seam
//!
//! Mirrors the surface of a standard OIDC client: the current session, a
//! best-effort silent renewal and the interactive redirects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::Result;

/// State round-tripped through the sign-in redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninState {
    pub return_to: Option<String>,
}

impl SigninState {
    pub fn return_to(path: impl Into<String>) -> Self {
        Self {
            return_to: Some(path.into()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The session currently held, if any
    fn session(&self) -> Option<Session>;

    /// True while the provider is still restoring or processing a sign-in
    fn is_loading(&self) -> bool {
        false
    }

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Non-interactive renewal. `Ok(None)` means the provider produced no user.
    async fn signin_silent(&self) -> Result<Option<Session>>;

    /// Interactive full-page redirect to the sign-in endpoint
    async fn signin_redirect(&self, state: Option<SigninState>) -> Result<()>;

    async fn signout_redirect(&self) -> Result<()>;

    /// Forget the local session without contacting the provider
    async fn remove_user(&self);
}

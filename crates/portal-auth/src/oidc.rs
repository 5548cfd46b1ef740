//! In-memory OIDC client
//!
//! Holds the session obtained by the provider's code flow and renews it with
//! the `refresh_token` grant. Interactive flows are handed to a [`Navigator`].

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::OidcConfig;
use crate::error::AuthError;
use crate::navigator::Navigator;
use crate::provider::{IdentityProvider, SigninState};
use crate::session::{now_secs, Session};
use crate::Result;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    id_token: Option<String>,
}

pub struct OidcClient {
    config: OidcConfig,
    http: reqwest::Client,
    navigator: Arc<dyn Navigator>,
    session: Arc<RwLock<Option<Session>>>,
    loading: Arc<AtomicBool>,
}

impl OidcClient {
    pub fn new(config: OidcConfig, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            navigator,
            session: Arc::new(RwLock::new(None)),
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Install a session produced by the code flow
    pub fn set_session(&self, session: Session) {
        tracing::debug!(expires_at = ?session.expires_at, "Session installed");
        *self.session.write() = Some(session);
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    /// Authorization URL for an interactive sign-in
    pub fn signin_url(&self, state: Option<&SigninState>) -> Result<url::Url> {
        let mut url = self.config.authorization_endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", self.config.redirect_uri.as_str())
                .append_pair("response_type", "code")
                .append_pair("scope", &self.config.scope);
            if let Some(state) = state {
                query.append_pair("state", &serde_json::to_string(state)?);
            }
        }
        Ok(url)
    }

    /// End-session URL, carrying the id token hint when present
    pub fn signout_url(&self, id_token: Option<&str>) -> Result<url::Url> {
        let mut url = self.config.end_session_endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair(
                    "post_logout_redirect_uri",
                    self.config.post_logout_redirect_uri.as_str(),
                );
            if let Some(hint) = id_token {
                query.append_pair("id_token_hint", hint);
            }
        }
        Ok(url)
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<Session> {
        let endpoint = self.config.token_endpoint()?;
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", self.config.scope.as_str()),
        ];

        let response = self.http.post(endpoint).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&body)?;

        Ok(Session {
            access_token: token.access_token,
            expires_at: token.expires_in.map(|secs| now_secs().saturating_add(secs)),
            // Providers that do not rotate refresh tokens omit it
            refresh_token: token.refresh_token.or_else(|| Some(refresh_token.to_string())),
            id_token: token.id_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    async fn signin_silent(&self) -> Result<Option<Session>> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or(AuthError::LoginRequired)?;

        let session = self.refresh_grant(&refresh_token).await?;
        self.set_session(session.clone());

        tracing::info!(expires_at = ?session.expires_at, "Silent sign-in renewed session");

        Ok(Some(session))
    }

    async fn signin_redirect(&self, state: Option<SigninState>) -> Result<()> {
        let url = self.signin_url(state.as_ref())?;
        self.navigator.navigate(&url);
        Ok(())
    }

    async fn signout_redirect(&self) -> Result<()> {
        let id_token = self
            .session
            .write()
            .take()
            .and_then(|session| session.id_token);
        let url = self.signout_url(id_token.as_deref())?;
        self.navigator.navigate(&url);
        Ok(())
    }

    async fn remove_user(&self) {
        self.session.write().take();
        tracing::info!("Local session removed");
    }
}

impl Clone for OidcClient {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            navigator: Arc::clone(&self.navigator),
            session: Arc::clone(&self.session),
            loading: Arc::clone(&self.loading),
        }
    }
}

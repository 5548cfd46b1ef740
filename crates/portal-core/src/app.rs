//! Application state container
//!
//! Owns one tab's worth of state: the identity provider, the gateway shared
//! by every API consumer, and the tab's election. Views are produced from
//! here and never hold state of their own.

use serde::Serialize;
use std::sync::Arc;

use portal_auth::{parse_claims, IdentityProvider, Roles};
use portal_gateway::{Gateway, Transport};
use portal_tabs::{ChannelHub, ElectorHandle, LeaderElector, LeaderStatus};
use portal_users::{User, UserApi};

use crate::config::Config;
use crate::error::CoreError;
use crate::gate::TabGate;
use crate::routes::{guard, Route, RouteAccess};
use crate::Result;

/// Data behind the dashboard page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub welcome_name: Option<String>,
    pub roles: Vec<String>,
    pub is_admin: bool,
    pub is_creator: bool,
    pub is_basic: bool,
    /// Result of `GET /list`
    pub items: Vec<String>,
    /// Only loaded for admins
    pub users: Option<Vec<User>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum View {
    Blocked { notice: String },
    Loading,
    RedirectingToLogin,
    Home { authenticated: bool },
    Dashboard(Dashboard),
    /// Client-side navigation to another route
    Redirect(Route),
    NotFound,
}

pub struct App {
    config: Config,
    provider: Arc<dyn IdentityProvider>,
    gateway: Gateway,
    users: UserApi,
    elector: ElectorHandle,
}

impl App {
    /// Start the tab election and wire the API clients around `provider`.
    ///
    /// Without a `hub` the tab has no way to see its peers and renders
    /// unconditionally.
    pub fn mount(
        config: Config,
        provider: Arc<dyn IdentityProvider>,
        transport: Arc<dyn Transport>,
        hub: Option<&ChannelHub>,
    ) -> Self {
        let channel = hub.map(|hub| hub.open(&config.tab_channel));
        let elector = LeaderElector::start(channel, config.election.clone());
        let gateway = Gateway::new(transport, Arc::clone(&provider), config.gateway.clone());
        let users = UserApi::new(gateway.clone());

        tracing::info!(
            tab_id = %elector.tab_id(),
            channel = %config.tab_channel,
            "App mounted"
        );

        Self {
            config,
            provider,
            gateway,
            users,
            elector,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn users(&self) -> &UserApi {
        &self.users
    }

    pub fn status(&self) -> LeaderStatus {
        self.elector.status()
    }

    /// Wait for the election to settle and decide whether to render
    pub async fn gate(&self) -> TabGate {
        let status = self.elector.settled().await;
        TabGate::from_status(&status)
    }

    pub fn roles(&self) -> Roles {
        self.users.roles()
    }

    /// Given name if the token carries one, else the username
    pub fn welcome_name(&self) -> Option<String> {
        let session = self.provider.session()?;
        match parse_claims(&session.access_token) {
            Ok(claims) => claims.display_name().map(str::to_string),
            Err(e) => {
                tracing::debug!(error = %e, "Access token claims unreadable");
                None
            }
        }
    }

    /// Resolve a location to the view it renders
    pub async fn open(&self, path: &str) -> Result<View> {
        match self.gate().await {
            TabGate::Render => {}
            TabGate::Blocked { notice } => return Ok(View::Blocked { notice }),
            TabGate::Pending => return Ok(View::Loading),
        }

        let Some(route) = Route::from_path(path) else {
            tracing::debug!(path, "No route matches");
            return Ok(View::NotFound);
        };

        match guard(route, self.provider.as_ref()).await? {
            RouteAccess::Loading => return Ok(View::Loading),
            RouteAccess::RedirectingToLogin => return Ok(View::RedirectingToLogin),
            RouteAccess::Granted => {}
        }

        let view = match route {
            Route::Home => {
                if self.provider.is_loading() {
                    View::Loading
                } else {
                    View::Home {
                        authenticated: self.provider.is_authenticated(),
                    }
                }
            }
            Route::Dashboard => View::Dashboard(self.dashboard().await?),
            Route::Logout => View::Redirect(Route::Home),
        };
        Ok(view)
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        if !self.provider.is_authenticated() {
            return Err(CoreError::Auth(portal_auth::AuthError::LoginRequired));
        }

        let roles = self.roles();
        let items: Vec<String> = self.gateway.get_json("/list").await?;
        let users = if roles.is_admin() {
            Some(self.users.list_users().await?)
        } else {
            None
        };

        Ok(Dashboard {
            welcome_name: self.welcome_name(),
            roles: roles.iter().map(str::to_string).collect(),
            is_admin: roles.is_admin(),
            is_creator: roles.is_creator(),
            is_basic: roles.is_basic(),
            items,
            users,
        })
    }

    pub async fn login(&self) -> Result<()> {
        self.provider.signin_redirect(None).await?;
        Ok(())
    }

    /// Forget the session in this app only; the provider session stays
    pub async fn logout_local(&self) {
        self.provider.remove_user().await;
        tracing::info!("Signed out locally");
    }

    /// End the session at the identity provider
    pub async fn logout_global(&self) -> Result<()> {
        self.provider.signout_redirect().await?;
        Ok(())
    }

    /// Tear down the election, announcing this tab's departure
    pub async fn unmount(self) {
        tracing::info!(tab_id = %self.elector.tab_id(), "App unmounting");
        self.elector.shutdown().await;
    }
}

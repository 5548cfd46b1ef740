//! Application state management
use std::path::Path;
use std::sync::Arc;

use portal_core::{
    App, ChannelHub, Config, CoreError, HttpTransport, LogNavigator, OidcClient, Result, Session,
};

/// Config file if given, then `PORTAL_*` overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Session handed over by whoever completed the sign-in
fn session_from_env<F>(lookup: F) -> Result<Option<Session>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(access_token) = lookup("PORTAL_ACCESS_TOKEN") else {
        return Ok(None);
    };

    let mut session = match lookup("PORTAL_EXPIRES_IN") {
        Some(raw) => {
            let expires_in: i64 = raw.parse().map_err(|_| {
                CoreError::Config(format!("PORTAL_EXPIRES_IN is not a number: {raw}"))
            })?;
            Session::expiring_in(access_token, expires_in)
        }
        None => Session::new(access_token, None),
    };
    if let Some(refresh_token) = lookup("PORTAL_REFRESH_TOKEN") {
        session = session.with_refresh_token(refresh_token);
    }
    if let Some(id_token) = lookup("PORTAL_ID_TOKEN") {
        session = session.with_id_token(id_token);
    }
    Ok(Some(session))
}

pub struct AppState {
    app: App,
    oidc: OidcClient,
    navigator: LogNavigator,
    hub: ChannelHub,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let navigator = LogNavigator::new();
        let oidc = OidcClient::new(config.oidc.clone(), Arc::new(navigator.clone()));

        match session_from_env(|key| std::env::var(key).ok())? {
            Some(session) => oidc.set_session(session),
            None => tracing::info!("No session in the environment; running signed out"),
        }

        let transport = HttpTransport::new(config.api_base_url.clone());
        let hub = ChannelHub::new();
        let app = App::mount(config, Arc::new(oidc.clone()), Arc::new(transport), Some(&hub));

        Ok(Self {
            app,
            oidc,
            navigator,
            hub,
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn oidc(&self) -> &OidcClient {
        &self.oidc
    }

    pub fn navigator(&self) -> &LogNavigator {
        &self.navigator
    }

    /// Shared bus for simulated sibling tabs
    pub fn hub(&self) -> &ChannelHub {
        &self.hub
    }

    pub async fn shutdown(self) {
        self.app.unmount().await;
    }
}

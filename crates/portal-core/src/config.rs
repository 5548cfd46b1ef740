//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use portal_auth::OidcConfig;
use portal_gateway::GatewayConfig;
use portal_tabs::ElectionConfig;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API root; request paths are appended to it
    pub api_base_url: Url,
    pub oidc: OidcConfig,
    pub gateway: GatewayConfig,
    pub election: ElectionConfig,
    /// Broadcast channel shared by all tabs of the app
    pub tab_channel: String,
}

impl Config {
    /// Read a JSON config file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        if config.gateway.refresh_margin_secs < 0 {
            return Err(CoreError::Config(format!(
                "gateway.refresh_margin_secs must not be negative: {}",
                config.gateway.refresh_margin_secs
            )));
        }
        Ok(config)
    }

    /// Defaults overridden by `PORTAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORTAL_API_BASE_URL") {
            self.api_base_url = parse_url("PORTAL_API_BASE_URL", &v)?;
        }
        if let Some(v) = lookup("PORTAL_AUTHORITY") {
            self.oidc.authority = parse_url("PORTAL_AUTHORITY", &v)?;
        }
        if let Some(v) = lookup("PORTAL_CLIENT_ID") {
            self.oidc.client_id = v;
        }
        if let Some(v) = lookup("PORTAL_REDIRECT_URI") {
            self.oidc.redirect_uri = parse_url("PORTAL_REDIRECT_URI", &v)?;
        }
        if let Some(v) = lookup("PORTAL_POST_LOGOUT_REDIRECT_URI") {
            self.oidc.post_logout_redirect_uri =
                parse_url("PORTAL_POST_LOGOUT_REDIRECT_URI", &v)?;
        }
        if let Some(v) = lookup("PORTAL_SCOPE") {
            self.oidc.scope = v;
        }
        if let Some(v) = lookup("PORTAL_TAB_CHANNEL") {
            self.tab_channel = v;
        }
        if let Some(v) = lookup("PORTAL_REFRESH_MARGIN_SECS") {
            let margin: i64 = v.parse().map_err(|_| {
                CoreError::Config(format!("PORTAL_REFRESH_MARGIN_SECS is not a number: {v}"))
            })?;
            if margin < 0 {
                return Err(CoreError::Config(format!(
                    "PORTAL_REFRESH_MARGIN_SECS must not be negative: {margin}"
                )));
            }
            self.gateway.refresh_margin_secs = margin;
        }
        Ok(())
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| CoreError::Config(format!("{key}: {e}")))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse("http://localhost:8080/api").expect("static API URL"),
            oidc: OidcConfig::default(),
            gateway: GatewayConfig::default(),
            election: ElectionConfig::default(),
            tab_channel: "my-app-tab".to_string(),
        }
    }
}

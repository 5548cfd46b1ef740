//! Portal Core
//!
//! Central coordination layer: wires the identity client, the authorized
//! gateway and the user API together, and gates the router behind the
//! single-tab election.

mod app;
mod config;
mod error;
mod gate;
mod routes;

pub use app::{App, Dashboard, View};
pub use config::Config;
pub use error::CoreError;
pub use gate::TabGate;
pub use routes::{guard, Route, RouteAccess};

// Re-export core components
pub use portal_auth::{
    parse_claims, Claims, IdentityProvider, LogNavigator, Navigator, OidcClient, OidcConfig,
    Roles, Session, SigninState,
};
pub use portal_gateway::{
    Gateway, GatewayConfig, GatewayError, HttpTransport, OutgoingRequest, Response, Transport,
};
pub use portal_tabs::{
    ChannelHub, ElectionConfig, ElectionState, ElectorHandle, LeaderElector, LeaderStatus,
};
pub use portal_users::{Role, User, UserApi, UserError, UserFormData, UserRegistrationRequest};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}

//! Portal Identity
//!
//! Session state, access-token claims and the identity provider seam.
//! The OIDC handshake itself (code exchange, PKCE challenge) belongs to the
//! provider; this crate only reads sessions and asks for refreshes/redirects.

mod claims;
mod config;
mod error;
mod navigator;
mod oidc;
mod provider;
mod session;

pub use claims::{parse_claims, Claims, RealmAccess, Roles};
pub use config::OidcConfig;
pub use error::{AuthError, DecodeError};
pub use navigator::{LogNavigator, Navigator};
pub use oidc::OidcClient;
pub use provider::{IdentityProvider, SigninState};
pub use session::Session;

pub type Result<T> = std::result::Result<T, AuthError>;

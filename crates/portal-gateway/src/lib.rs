//! Portal Authorized Request Gateway
//!
//! Every backend call passes through [`Gateway`]:
//! - attaches the bearer token of the current session
//! - refreshes proactively when the token is about to expire
//! - refreshes and retries exactly once on a 401
//! - collapses concurrent refreshes into one in-flight operation

mod error;
mod gateway;
mod refresh;
mod request;
mod transport;

pub use error::{GatewayError, RefreshError, TransportError};
pub use gateway::{Gateway, GatewayConfig};
pub use refresh::{RefreshAttempt, RefreshCoordinator};
pub use request::OutgoingRequest;
pub use transport::{HttpTransport, Response, Transport};

pub type Result<T> = std::result::Result<T, GatewayError>;

//! Portal Single-Tab Enforcement
//!
//! Tabs of the same origin elect one leader over a named broadcast channel.
//! Only the leader drives the session; followers show a blocking notice.
//!
//! ```text
//! Querying --(leader heard)--> Follower
//!    |
//!    +--(window elapsed)----> Leader --(every second)--> LEADER_ALIVE
//! ```

mod channel;
mod elector;
mod error;
mod message;
mod state;

pub use channel::{ChannelHub, TabChannel};
pub use elector::{ElectionConfig, ElectorHandle, LeaderElector, LeaderStatus};
pub use error::TabError;
pub use message::{LeaderMessage, TabId};
pub use state::ElectionState;

pub type Result<T> = std::result::Result<T, TabError>;

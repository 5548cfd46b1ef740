//! Election State Machine
//!
//! ```text
//! Querying
//!   ↓ window elapsed, nobody answered
//! Leader
//!
//! Querying
//!   ↓ LEADER_ALIVE / I_AM_LEADER from another tab
//! Follower
//! ```
//!
//! There is no way back: a follower stays a follower when the leader closes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    /// Asked who leads, waiting for the window to elapse
    Querying,
    /// This tab drives the session
    Leader,
    /// Another tab leads
    Follower,
}

impl ElectionState {
    pub fn can_transition_to(&self, target: ElectionState) -> bool {
        match (self, target) {
            (ElectionState::Querying, ElectionState::Leader) => true,
            (ElectionState::Querying, ElectionState::Follower) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ElectionState::Querying)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionState::Querying => "querying",
            ElectionState::Leader => "leader",
            ElectionState::Follower => "follower",
        }
    }
}

impl std::fmt::Display for ElectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

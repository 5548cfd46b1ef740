//! Single-tab render gate

use portal_tabs::{ElectionState, LeaderStatus};

const BLOCKED_NOTICE: &str =
    "This application is already open in another tab. Close this tab or switch to the other one.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabGate {
    /// Election window still open
    Pending,
    Render,
    Blocked { notice: String },
}

impl TabGate {
    pub fn from_status(status: &LeaderStatus) -> Self {
        match status.state {
            ElectionState::Querying => TabGate::Pending,
            ElectionState::Follower if status.other_open => TabGate::Blocked {
                notice: BLOCKED_NOTICE.to_string(),
            },
            // A leader that hears a second leader keeps rendering
            ElectionState::Leader | ElectionState::Follower => TabGate::Render,
        }
    }

    pub fn renders(&self) -> bool {
        matches!(self, TabGate::Render)
    }
}

impl From<&LeaderStatus> for TabGate {
    fn from(status: &LeaderStatus) -> Self {
        Self::from_status(status)
    }
}

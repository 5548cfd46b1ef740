//! Cross-tab leader messages
//!
//! Wire format is `{"type": "WHO_IS_LEADER", "id": "<tab id>"}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Random per-tab identity, lives as long as the tab
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderMessage {
    WhoIsLeader { id: TabId },
    IAmLeader { id: TabId },
    LeaderAlive { id: TabId },
    LeaderDead { id: TabId },
}

impl LeaderMessage {
    /// The tab that sent this message
    pub fn sender(&self) -> &TabId {
        match self {
            LeaderMessage::WhoIsLeader { id }
            | LeaderMessage::IAmLeader { id }
            | LeaderMessage::LeaderAlive { id }
            | LeaderMessage::LeaderDead { id } => id,
        }
    }

    /// True for messages that announce an existing leader
    pub fn announces_leader(&self) -> bool {
        matches!(
            self,
            LeaderMessage::IAmLeader { .. } | LeaderMessage::LeaderAlive { .. }
        )
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

//! Named broadcast channels shared by all tabs of an origin

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::message::LeaderMessage;
use crate::Result;

const CHANNEL_CAPACITY: usize = 64;

/// The origin: hands out channels by name, one bus per name
pub struct ChannelHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Join the named channel. Every open channel sees every post, including
    /// its own.
    pub fn open(&self, name: &str) -> TabChannel {
        let sender = self
            .channels
            .write()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        let receiver = sender.subscribe();

        TabChannel {
            name: name.to_string(),
            sender,
            receiver,
        }
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChannelHub {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

pub struct TabChannel {
    name: String,
    sender: broadcast::Sender<String>,
    receiver: broadcast::Receiver<String>,
}

impl TabChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn post(&self, message: &LeaderMessage) -> Result<()> {
        let raw = message.encode()?;
        self.post_raw(raw);
        Ok(())
    }

    pub fn post_raw(&self, raw: impl Into<String>) {
        // Only fails when nobody listens, which is not an error for a broadcast
        if self.sender.send(raw.into()).is_err() {
            tracing::debug!(channel = %self.name, "Broadcast with no listeners");
        }
    }

    /// Next raw message; `None` once the channel is closed
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(raw) => return Some(raw),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.name, skipped, "Tab channel lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

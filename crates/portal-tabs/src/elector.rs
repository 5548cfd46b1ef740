//! Leader election task
//!
//! Each tab runs one election task for its lifetime. The task owns the tab's
//! channel and timers; the [`ElectorHandle`] only observes status and signals
//! teardown.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::channel::TabChannel;
use crate::error::TabError;
use crate::message::{LeaderMessage, TabId};
use crate::state::ElectionState;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// How long to wait for an existing leader to answer
    pub election_window_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl ElectionConfig {
    pub fn election_window(&self) -> Duration {
        Duration::from_millis(self.election_window_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_window_ms: 200,
            heartbeat_interval_ms: 1000,
        }
    }
}

/// Snapshot of what this tab believes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderStatus {
    pub tab_id: TabId,
    pub state: ElectionState,
    pub leader_id: Option<TabId>,
    pub is_leader: bool,
    /// Another tab of this application is open
    pub other_open: bool,
}

impl LeaderStatus {
    fn querying(tab_id: TabId) -> Self {
        Self {
            tab_id,
            state: ElectionState::Querying,
            leader_id: None,
            is_leader: false,
            other_open: false,
        }
    }
}

pub struct LeaderElector {
    status: LeaderStatus,
    channel: TabChannel,
    config: ElectionConfig,
    publisher: watch::Sender<LeaderStatus>,
}

impl LeaderElector {
    /// Start electing on `channel`.
    ///
    /// Without a channel the runtime has no cross-tab primitive: the tab acts
    /// as leader and sees no other tabs.
    pub fn start(channel: Option<TabChannel>, config: ElectionConfig) -> ElectorHandle {
        let tab_id = TabId::random();

        let Some(channel) = channel else {
            tracing::info!(tab_id = %tab_id, "No tab channel available, running standalone");
            let status = LeaderStatus {
                leader_id: Some(tab_id.clone()),
                state: ElectionState::Leader,
                is_leader: true,
                other_open: false,
                tab_id,
            };
            let (publisher, status) = watch::channel(status);
            return ElectorHandle {
                status,
                _publisher: Some(publisher),
                shutdown: None,
                task: None,
            };
        };

        let (publisher, status) = watch::channel(LeaderStatus::querying(tab_id.clone()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let elector = LeaderElector {
            status: LeaderStatus::querying(tab_id),
            channel,
            config,
            publisher,
        };
        let task = tokio::spawn(elector.run(shutdown_rx));

        ElectorHandle {
            status,
            _publisher: None,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        tracing::debug!(tab_id = %self.status.tab_id, channel = %self.channel.name(), "Asking for leader");
        self.post(LeaderMessage::WhoIsLeader {
            id: self.status.tab_id.clone(),
        });

        let window = time::sleep(self.config.election_window());
        tokio::pin!(window);
        let mut heartbeat: Option<Interval> = None;

        loop {
            tokio::select! {
                // Fires on explicit shutdown and when the handle is dropped
                _ = &mut shutdown => break,
                _ = &mut window, if self.status.state == ElectionState::Querying => {
                    heartbeat = self.become_leader();
                }
                _ = next_heartbeat(&mut heartbeat) => {
                    self.post(LeaderMessage::LeaderAlive {
                        id: self.status.tab_id.clone(),
                    });
                }
                raw = self.channel.recv() => match raw {
                    Some(raw) => self.handle(&raw),
                    None => break,
                },
            }
        }

        self.post(LeaderMessage::LeaderDead {
            id: self.status.tab_id.clone(),
        });
        tracing::info!(tab_id = %self.status.tab_id, state = %self.status.state, "Tab closed");
    }

    fn become_leader(&mut self) -> Option<Interval> {
        if let Err(e) = self.transition_to(ElectionState::Leader) {
            tracing::warn!(error = %e, "Cannot take leadership");
            return None;
        }

        self.status.is_leader = true;
        self.status.leader_id = Some(self.status.tab_id.clone());
        self.publish();

        tracing::info!(tab_id = %self.status.tab_id, "No leader answered, taking leadership");
        self.post(LeaderMessage::IAmLeader {
            id: self.status.tab_id.clone(),
        });

        let period = self.config.heartbeat_interval();
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(interval)
    }

    fn handle(&mut self, raw: &str) {
        let message = match LeaderMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed tab message");
                return;
            }
        };

        if message.sender() == &self.status.tab_id {
            return;
        }

        if message.announces_leader() {
            self.observe_leader(message.sender().clone());
            return;
        }

        match message {
            LeaderMessage::WhoIsLeader { id } => {
                if self.status.state == ElectionState::Leader {
                    tracing::debug!(asker = %id, "Answering leader query");
                    self.post(LeaderMessage::LeaderAlive {
                        id: self.status.tab_id.clone(),
                    });
                }
            }
            LeaderMessage::LeaderDead { id } => {
                // Followers do not re-run the election
                if self.status.leader_id.as_ref() == Some(&id) {
                    tracing::info!(leader_id = %id, "Leader tab closed");
                }
            }
            LeaderMessage::IAmLeader { .. } | LeaderMessage::LeaderAlive { .. } => {}
        }
    }

    fn observe_leader(&mut self, id: TabId) {
        match self.status.state {
            ElectionState::Querying => {
                if let Err(e) = self.transition_to(ElectionState::Follower) {
                    tracing::warn!(error = %e, "Cannot follow");
                    return;
                }
                tracing::info!(leader_id = %id, "Another tab leads, following");
            }
            ElectionState::Leader => {
                // Two tabs raced through the window; the protocol keeps both
                tracing::warn!(other_leader = %id, "Another tab also claims leadership");
            }
            ElectionState::Follower => {}
        }

        let changed = self.status.leader_id.as_ref() != Some(&id) || !self.status.other_open;
        if self.status.state == ElectionState::Follower {
            self.status.leader_id = Some(id);
        }
        self.status.other_open = true;
        if changed {
            self.publish();
        }
    }

    fn transition_to(&mut self, target: ElectionState) -> Result<()> {
        if !self.status.state.can_transition_to(target) {
            return Err(TabError::InvalidTransition {
                from: self.status.state.to_string(),
                to: target.to_string(),
            });
        }

        tracing::debug!(
            tab_id = %self.status.tab_id,
            from = %self.status.state,
            to = %target,
            "Election state transition"
        );
        self.status.state = target;
        Ok(())
    }

    fn post(&self, message: LeaderMessage) {
        if let Err(e) = self.channel.post(&message) {
            tracing::warn!(error = %e, "Failed to post tab message");
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.status.clone());
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Observes one tab's election and tears it down
pub struct ElectorHandle {
    status: watch::Receiver<LeaderStatus>,
    // Keeps the standalone status channel open
    _publisher: Option<watch::Sender<LeaderStatus>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ElectorHandle {
    pub fn status(&self) -> LeaderStatus {
        self.status.borrow().clone()
    }

    pub fn tab_id(&self) -> TabId {
        self.status.borrow().tab_id.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LeaderStatus> {
        self.status.clone()
    }

    /// Wait until the tab is either leader or follower
    pub async fn settled(&self) -> LeaderStatus {
        let mut rx = self.status.clone();
        if rx.wait_for(|status| status.state.is_settled()).await.is_err() {
            tracing::debug!("Election task ended before settling");
        }
        let status = rx.borrow().clone();
        status
    }

    /// Announce LEADER_DEAD, stop the heartbeat and close the channel
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Election task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelHub;
    use tokio::time::{timeout, Instant};

    const CHANNEL: &str = "my-app-tab";

    async fn next_message(channel: &mut TabChannel) -> LeaderMessage {
        let raw = timeout(Duration::from_secs(5), channel.recv())
            .await
            .expect("message within 5s")
            .expect("channel open");
        LeaderMessage::decode(&raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_tab_becomes_leader_and_heartbeats() {
        let hub = ChannelHub::new();
        let mut observer = hub.open(CHANNEL);
        let start = Instant::now();

        let handle = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        let status = handle.settled().await;

        assert_eq!(status.state, ElectionState::Leader);
        assert!(status.is_leader);
        assert!(!status.other_open);
        assert_eq!(status.leader_id.as_ref(), Some(&handle.tab_id()));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(250));

        let id = handle.tab_id();
        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::WhoIsLeader { id: id.clone() }
        );
        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::IAmLeader { id: id.clone() }
        );

        let mut beats = Vec::new();
        for _ in 0..3 {
            assert_eq!(
                next_message(&mut observer).await,
                LeaderMessage::LeaderAlive { id: id.clone() }
            );
            beats.push(Instant::now());
        }
        assert_eq!(beats[1] - beats[0], Duration::from_secs(1));
        assert_eq!(beats[2] - beats[1], Duration::from_secs(1));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_tab_follows() {
        let hub = ChannelHub::new();
        let first = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        first.settled().await;

        time::sleep(Duration::from_millis(500)).await;

        let second = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        let status = second.settled().await;

        assert_eq!(status.state, ElectionState::Follower);
        assert!(!status.is_leader);
        assert!(status.other_open);
        assert_eq!(status.leader_id, Some(first.tab_id()));

        // The leader is unaffected by the newcomer
        assert_eq!(first.status().state, ElectionState::Leader);

        second.shutdown().await;
        first.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_leader_answers_queries() {
        let hub = ChannelHub::new();
        let leader = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        leader.settled().await;

        let mut observer = hub.open(CHANNEL);
        let asked_at = Instant::now();
        observer
            .post(&LeaderMessage::WhoIsLeader { id: "observer".into() })
            .unwrap();

        // Own query comes back first on a shared bus
        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::WhoIsLeader { id: "observer".into() }
        );
        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::LeaderAlive { id: leader.tab_id() }
        );
        assert_eq!(Instant::now(), asked_at);

        leader.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_stays_after_leader_dies() {
        let hub = ChannelHub::new();
        let first = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        first.settled().await;
        let second = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        second.settled().await;

        let mut observer = hub.open(CHANNEL);
        let leader_id = first.tab_id();
        first.shutdown().await;
        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::LeaderDead { id: leader_id }
        );

        time::sleep(Duration::from_secs(5)).await;
        let status = second.status();
        assert_eq!(status.state, ElectionState::Follower);
        assert!(!status.is_leader);

        second.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_announces_death() {
        let hub = ChannelHub::new();
        let handle = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        handle.settled().await;
        let id = handle.tab_id();

        let mut observer = hub.open(CHANNEL);
        drop(handle);

        assert_eq!(
            next_message(&mut observer).await,
            LeaderMessage::LeaderDead { id }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_messages_ignored() {
        let hub = ChannelHub::new();
        let noise = hub.open(CHANNEL);

        let handle = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        noise.post_raw("garbage");
        noise.post_raw(r#"{"type":"SOMETHING_ELSE","id":"x"}"#);

        let status = handle.settled().await;
        assert_eq!(status.state, ElectionState::Leader);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_claims_keep_both_leaders() {
        let hub = ChannelHub::new();
        let handle = LeaderElector::start(Some(hub.open(CHANNEL)), ElectionConfig::default());
        handle.settled().await;

        let rival = hub.open(CHANNEL);
        rival
            .post(&LeaderMessage::IAmLeader { id: "rival".into() })
            .unwrap();
        time::sleep(Duration::from_millis(10)).await;

        let status = handle.status();
        assert_eq!(status.state, ElectionState::Leader);
        assert!(status.is_leader);
        assert!(status.other_open);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_without_channel_acts_as_leader() {
        let handle = LeaderElector::start(None, ElectionConfig::default());

        let status = handle.status();
        assert_eq!(status.state, ElectionState::Leader);
        assert!(status.is_leader);
        assert!(!status.other_open);
        assert_eq!(handle.settled().await, status);

        handle.shutdown().await;
    }
}

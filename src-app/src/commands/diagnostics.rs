//! Tab election diagnostics
use serde::Serialize;

use portal_core::{ElectionState, ElectorHandle, LeaderElector, LeaderStatus, TabGate};

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TabReport {
    pub tab_id: String,
    pub state: ElectionState,
    pub leader_id: Option<String>,
    pub other_open: bool,
    pub renders: bool,
}

impl From<&LeaderStatus> for TabReport {
    fn from(status: &LeaderStatus) -> Self {
        Self {
            tab_id: status.tab_id.to_string(),
            state: status.state,
            leader_id: status.leader_id.as_ref().map(|id| id.to_string()),
            other_open: status.other_open,
            renders: TabGate::from_status(status).renders(),
        }
    }
}

/// Settle this tab's election, open `peers` more tabs on the same channel
/// and report every tab's view of the election once Ctrl-C arrives.
pub async fn tabs(state: &AppState, peers: usize) -> CommandResult<Vec<TabReport>> {
    let app = state.app();
    let gate = app.gate().await;
    tracing::info!(tab_id = %app.status().tab_id, renders = gate.renders(), "Tab settled");

    let config = app.config();
    let mut handles: Vec<ElectorHandle> = Vec::with_capacity(peers);
    for _ in 0..peers {
        let channel = state.hub().open(&config.tab_channel);
        let handle = LeaderElector::start(Some(channel), config.election.clone());
        let status = handle.settled().await;
        tracing::info!(
            tab_id = %status.tab_id,
            state = %status.state,
            "Peer tab settled"
        );
        handles.push(handle);
    }

    tracing::info!("Watching election, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        return CommandResult::err(format!("Failed to listen for Ctrl-C: {e}"));
    }

    let mut reports = vec![TabReport::from(&app.status())];
    reports.extend(handles.iter().map(|h| TabReport::from(&h.status())));

    for handle in handles {
        handle.shutdown().await;
    }
    CommandResult::ok(reports)
}

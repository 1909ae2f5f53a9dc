use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use streamvisor_common::ChannelId;

/// Where a channel is in its restart loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// Removing stale outputs before the first start.
    Starting,
    /// The engine is running.
    Running,
    /// The engine exited; outputs are being removed.
    Cleaning,
    /// Waiting out the restart delay.
    Restarting,
    /// The supervisor has shut down.
    Stopped,
}

/// Snapshot of one channel, for observability only.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub index: ChannelId,
    pub source_address: String,
    pub state: ChannelState,
    /// Completed engine runs.
    pub restarts: u64,
    pub last_exit_code: Option<i32>,
    pub last_exit_at: Option<DateTime<Utc>>,
    pub running_since: Option<DateTime<Utc>>,
}

impl ChannelStatus {
    pub fn new(index: ChannelId, source_address: impl Into<String>) -> Self {
        Self {
            index,
            source_address: source_address.into(),
            state: ChannelState::Starting,
            restarts: 0,
            last_exit_code: None,
            last_exit_at: None,
            running_since: None,
        }
    }
}

/// Shared handle to one channel's status. Only its own supervisor writes it.
pub type StatusHandle = Arc<RwLock<ChannelStatus>>;

pub(super) fn set_state(status: &StatusHandle, state: ChannelState) {
    let mut status = status.write();
    status.state = state;
    match state {
        ChannelState::Running => status.running_since = Some(Utc::now()),
        _ => status.running_since = None,
    }
}

pub(super) fn record_exit(status: &StatusHandle, code: Option<i32>) {
    let mut status = status.write();
    status.restarts += 1;
    status.last_exit_code = code;
    status.last_exit_at = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_update_timestamps() {
        let status: StatusHandle = Arc::new(RwLock::new(ChannelStatus::new(2, "udp://x:2222")));

        set_state(&status, ChannelState::Running);
        assert!(status.read().running_since.is_some());

        record_exit(&status, Some(1));
        set_state(&status, ChannelState::Cleaning);

        let snapshot = status.read().clone();
        assert_eq!(snapshot.state, ChannelState::Cleaning);
        assert_eq!(snapshot.restarts, 1);
        assert_eq!(snapshot.last_exit_code, Some(1));
        assert!(snapshot.last_exit_at.is_some());
        assert!(snapshot.running_since.is_none());
    }

    #[test]
    fn serializes_state_lowercase() {
        let status = ChannelStatus::new(0, "udp://localhost:2220");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "starting");
        assert_eq!(json["index"], 0);
        assert!(json["last_exit_code"].is_null());
    }
}

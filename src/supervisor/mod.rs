//! Per-channel restart loop.
//!
//! Each [`ChannelSupervisor`] owns one channel and cycles through
//! `Running → Cleaning → Restarting → Running` until cancelled:
//!
//! - **Running**: the engine runs until its process terminates.
//! - **Cleaning**: the channel's segments and manifest are removed, then one
//!   lifecycle event is broadcast.
//! - **Restarting**: the [`RestartPolicy`] delay is waited out.
//!
//! Engine failures never stop the loop. Supervisors share nothing except the
//! event bus.

mod policy;
mod status;

pub use policy::RestartPolicy;
pub use status::{ChannelState, ChannelStatus, StatusHandle};

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use streamvisor_av::{Engine, EngineExit};
use streamvisor_common::{ChannelDescriptor, EventKind, LifecycleEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cleaner;
use crate::config::EventsConfig;
use crate::events::EventBus;

/// Which lifecycle events a supervisor emits besides `closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOptions {
    /// Broadcast `started` at the beginning of each run.
    pub emit_started: bool,
    /// Broadcast `errored` rather than `closed` after a failed run.
    pub distinguish_errors: bool,
}

impl From<&EventsConfig> for EventOptions {
    fn from(config: &EventsConfig) -> Self {
        Self {
            emit_started: config.emit_started,
            distinguish_errors: config.distinguish_errors,
        }
    }
}

enum Phase {
    Running,
    Cleaning(EventKind),
    Restarting,
}

/// Supervises the engine for one channel.
pub struct ChannelSupervisor {
    channel: ChannelDescriptor,
    engine: Arc<dyn Engine>,
    bus: Arc<EventBus>,
    policy: RestartPolicy,
    options: EventOptions,
    status: StatusHandle,
}

impl ChannelSupervisor {
    pub fn new(channel: ChannelDescriptor, engine: Arc<dyn Engine>, bus: Arc<EventBus>) -> Self {
        let status = Arc::new(RwLock::new(ChannelStatus::new(
            channel.index,
            channel.source_address.clone(),
        )));
        Self {
            channel,
            engine,
            bus,
            policy: RestartPolicy::default(),
            options: EventOptions::default(),
            status,
        }
    }

    pub fn with_policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: EventOptions) -> Self {
        self.options = options;
        self
    }

    /// Handle to this channel's live status.
    pub fn status(&self) -> StatusHandle {
        Arc::clone(&self.status)
    }

    /// Run the restart loop until `cancel` fires.
    ///
    /// Cancellation while the engine runs drops the engine future, which
    /// stops the engine process.
    pub async fn run(self, cancel: CancellationToken) {
        let index = self.channel.index;
        tracing::info!(channel = index, "Supervising {}", self.channel);

        // Outputs left behind by a previous process.
        self.clean().await;

        let mut attempt: u32 = 0;
        let mut phase = Phase::Running;

        loop {
            phase = match phase {
                Phase::Running => {
                    status::set_state(&self.status, ChannelState::Running);
                    if self.options.emit_started {
                        self.bus.broadcast(LifecycleEvent::started(index));
                    }

                    let started = Instant::now();
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        result = self.engine.run(&self.channel) => result,
                    };

                    if self.policy.is_stable(started.elapsed()) {
                        attempt = 0;
                    }
                    Phase::Cleaning(self.on_exit(result))
                }
                Phase::Cleaning(kind) => {
                    status::set_state(&self.status, ChannelState::Cleaning);
                    self.clean().await;
                    self.bus.broadcast(LifecycleEvent::new(index, kind));
                    Phase::Restarting
                }
                Phase::Restarting => {
                    status::set_state(&self.status, ChannelState::Restarting);
                    let delay = self.policy.next(attempt);
                    attempt = attempt.saturating_add(1);

                    if !delay.is_zero() {
                        tracing::debug!(channel = index, "Restarting in {:?}", delay);
                    }
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    Phase::Running
                }
            };
        }

        status::set_state(&self.status, ChannelState::Stopped);
        tracing::info!(channel = index, "Supervisor stopped");
    }

    /// Spawn [`run`](Self::run) on its own task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Log how the engine ended and pick the event to broadcast.
    fn on_exit(&self, result: streamvisor_av::Result<EngineExit>) -> EventKind {
        let index = self.channel.index;
        let failed = match result {
            Ok(exit) if exit.success => {
                tracing::info!(channel = index, "{} exited", self.engine.name());
                status::record_exit(&self.status, exit.code);
                false
            }
            Ok(exit) => {
                tracing::warn!(
                    channel = index,
                    "{} exited with status {:?}",
                    self.engine.name(),
                    exit.code
                );
                status::record_exit(&self.status, exit.code);
                true
            }
            Err(e) => {
                tracing::error!(channel = index, "{} failed: {}", self.engine.name(), e);
                status::record_exit(&self.status, None);
                true
            }
        };

        if failed && self.options.distinguish_errors {
            EventKind::Errored
        } else {
            EventKind::Closed
        }
    }

    async fn clean(&self) {
        let channel = self.channel.clone();
        match tokio::task::spawn_blocking(move || cleaner::clean_channel(&channel)).await {
            Ok(report) if !report.is_clean() => {
                tracing::warn!(
                    channel = self.channel.index,
                    "{} files could not be removed",
                    report.failed.len()
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(channel = self.channel.index, "Cleanup task failed: {}", e);
            }
        }
    }
}

/// The running supervisors of every channel.
pub struct ChannelSet {
    statuses: Vec<StatusHandle>,
    handles: Vec<JoinHandle<()>>,
}

impl ChannelSet {
    /// Spawn one supervisor per channel, all stopped by `cancel`.
    pub fn spawn(
        channels: Vec<ChannelDescriptor>,
        engine: Arc<dyn Engine>,
        bus: Arc<EventBus>,
        policy: RestartPolicy,
        options: EventOptions,
        cancel: &CancellationToken,
    ) -> Self {
        let mut statuses = Vec::with_capacity(channels.len());
        let mut handles = Vec::with_capacity(channels.len());

        for channel in channels {
            let supervisor = ChannelSupervisor::new(channel, Arc::clone(&engine), Arc::clone(&bus))
                .with_policy(policy)
                .with_options(options);
            statuses.push(supervisor.status());
            handles.push(supervisor.spawn(cancel.child_token()));
        }

        tracing::info!("Started {} channel supervisors", handles.len());
        Self { statuses, handles }
    }

    pub fn statuses(&self) -> Vec<StatusHandle> {
        self.statuses.clone()
    }

    /// Wait for every supervisor to stop.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Supervisor task failed: {}", e);
            }
        }
    }
}

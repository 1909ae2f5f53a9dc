//! Channel and lifecycle event types.
//!
//! A [`ChannelDescriptor`] is resolved once at startup and never changes.
//! [`LifecycleEvent`]s are small `Copy` values fanned out to every observer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths;

/// Index of a channel, starting at 0.
pub type ChannelId = u32;

/// Static configuration for one supervised channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Channel index; also the `channelId` carried by its events.
    pub index: ChannelId,
    /// Live network source the engine reads from.
    pub source_address: String,
    /// Directory holding segments for every channel.
    pub output_dir: PathBuf,
    /// Manifest written by the engine for this channel.
    pub manifest_path: PathBuf,
    /// Per-channel engine log file.
    pub log_path: PathBuf,
}

impl ChannelDescriptor {
    /// Build a descriptor using the standard naming rules in [`paths`].
    pub fn new(
        index: ChannelId,
        source_address: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        log_dir: impl AsRef<Path>,
    ) -> Self {
        let output_dir = output_dir.into();
        Self {
            index,
            source_address: source_address.into(),
            manifest_path: output_dir.join(paths::manifest_file_name(index)),
            log_path: log_dir.as_ref().join(paths::log_file_name(index)),
            output_dir,
        }
    }

    /// File name prefix shared by every segment of this channel.
    pub fn segment_prefix(&self) -> String {
        paths::segment_prefix(self.index)
    }

    /// printf-style segment path handed to the engine.
    pub fn segment_pattern(&self, extension: &str) -> PathBuf {
        self.output_dir.join(paths::segment_pattern(self.index, extension))
    }

    /// File name of the fMP4 initialization segment, relative to the manifest.
    pub fn init_segment_name(&self) -> String {
        paths::init_segment_name(self.index)
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} <- {} -> {}",
            self.index,
            self.source_address,
            self.manifest_path.display()
        )
    }
}

/// What happened to a channel's engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The engine process was started.
    Started,
    /// The engine process terminated and the channel is restarting.
    Closed,
    /// The engine process failed and the channel is restarting.
    Errored,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification about one channel's engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "channelId")]
    pub channel_id: ChannelId,
    #[serde(rename = "eventType")]
    pub kind: EventKind,
}

impl LifecycleEvent {
    pub fn new(channel_id: ChannelId, kind: EventKind) -> Self {
        Self { channel_id, kind }
    }

    pub fn started(channel_id: ChannelId) -> Self {
        Self::new(channel_id, EventKind::Started)
    }

    pub fn closed(channel_id: ChannelId) -> Self {
        Self::new(channel_id, EventKind::Closed)
    }

    pub fn errored(channel_id: ChannelId) -> Self {
        Self::new(channel_id, EventKind::Errored)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (channel {})", self.kind, self.channel_id)
    }
}

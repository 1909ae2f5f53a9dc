use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use streamvisor_av::HlsSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub restart: RestartConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port serving segments and the event stream
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3002
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where the live sources are and how many there are.
///
/// Channel `i` reads `udp://{source_host}:{base_port + i}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_channel_count")]
    pub count: u32,

    #[serde(default = "default_base_port")]
    pub base_port: u16,

    #[serde(default = "default_source_host")]
    pub source_host: String,

    /// UDP read timeout passed to the engine, in microseconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_us: u64,
}

fn default_channel_count() -> u32 {
    1
}
fn default_base_port() -> u16 {
    2220
}
fn default_source_host() -> String {
    "localhost".to_string()
}
fn default_source_timeout() -> u64 {
    60_000_000
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            count: default_channel_count(),
            base_port: default_base_port(),
            source_host: default_source_host(),
            source_timeout_us: default_source_timeout(),
        }
    }
}

impl ChannelsConfig {
    /// Source address for the channel at `index`.
    pub fn source_address(&self, index: u32) -> String {
        let port = u32::from(self.base_port) + index;
        format!(
            "udp://{}:{}?timeout={}",
            self.source_host, port, self.source_timeout_us
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("streams")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Events buffered per observer before new ones are dropped
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Interval between SSE keep-alive comments
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Broadcast `started` when an engine run begins
    #[serde(default)]
    pub emit_started: bool,

    /// Broadcast `errored` instead of `closed` for failed runs
    #[serde(default)]
    pub distinguish_errors: bool,
}

fn default_inbox_capacity() -> usize {
    10
}
fn default_keepalive() -> u64 {
    15
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            keepalive_secs: default_keepalive(),
            emit_started: false,
            distinguish_errors: false,
        }
    }
}

/// Delay between an engine exit and the next start.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestartConfig {
    #[serde(default = "default_first_delay")]
    pub first_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_factor")]
    pub factor: f64,

    /// A run lasting at least this long resets the backoff
    #[serde(default = "default_stable_after")]
    pub stable_after_secs: u64,
}

fn default_first_delay() -> u64 {
    250
}
fn default_max_delay() -> u64 {
    5_000
}
fn default_factor() -> f64 {
    2.0
}
fn default_stable_after() -> u64 {
    30
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            first_delay_ms: default_first_delay(),
            max_delay_ms: default_max_delay(),
            factor: default_factor(),
            stable_after_secs: default_stable_after(),
        }
    }
}

impl RestartConfig {
    pub fn first_delay(&self) -> Duration {
        Duration::from_millis(self.first_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn stable_after(&self) -> Duration {
        Duration::from_secs(self.stable_after_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Explicit ffmpeg binary; looked up on PATH when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Copy engine output to our stdout/stderr as well as the channel log
    #[serde(default = "default_mirror_output")]
    pub mirror_output: bool,

    #[serde(default)]
    pub hls: HlsSettings,
}

fn default_mirror_output() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            mirror_output: default_mirror_output(),
            hls: HlsSettings::default(),
        }
    }
}

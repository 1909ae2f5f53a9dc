//! The transcoding engine seam.
//!
//! A channel supervisor only needs one thing from an engine: run until the
//! process terminates and report how it ended. [`FfmpegEngine`] is the
//! production implementation; tests substitute their own [`Engine`].

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use async_trait::async_trait;
use streamvisor_common::ChannelDescriptor;

use crate::command::ToolCommand;
use crate::hls::HlsSettings;
use crate::{tools, Result};

/// How an engine run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Whether the process reported success.
    pub success: bool,
}

impl EngineExit {
    /// A clean exit with status 0.
    pub fn success() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }

    /// A failed exit; `None` means the process was killed by a signal.
    pub fn failure(code: Option<i32>) -> Self {
        Self {
            code,
            success: false,
        }
    }
}

impl From<ExitStatus> for EngineExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// Something that converts a channel's live source into segments.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run the engine for `channel` until it terminates.
    ///
    /// Returns `Err` only if the engine could not be started or observed.
    /// Dropping the future must stop the engine.
    async fn run(&self, channel: &ChannelDescriptor) -> Result<EngineExit>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "engine"
    }
}

/// Runs ffmpeg with [`HlsSettings`] for each channel.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
    settings: HlsSettings,
    mirror_output: bool,
}

impl FfmpegEngine {
    /// Create an engine using the given ffmpeg binary.
    pub fn new(program: PathBuf, settings: HlsSettings) -> Self {
        Self {
            program,
            settings,
            mirror_output: true,
        }
    }

    /// Locate ffmpeg, preferring a configured path over `PATH`.
    pub fn discover(configured: Option<&Path>, settings: HlsSettings) -> Result<Self> {
        let program = tools::find_ffmpeg(configured)?;
        Ok(Self::new(program, settings))
    }

    /// Whether engine output is also copied to our stdout/stderr.
    pub fn with_mirror_output(mut self, mirror: bool) -> Self {
        self.mirror_output = mirror;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The command that would be run for `channel`.
    pub fn command(&self, channel: &ChannelDescriptor) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.args(self.settings.ffmpeg_args(channel))
            .log_to(channel.log_path.clone())
            .mirror(self.mirror_output);
        cmd
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn run(&self, channel: &ChannelDescriptor) -> Result<EngineExit> {
        tracing::info!(
            channel = channel.index,
            source = %channel.source_address,
            "Starting ffmpeg for channel {}",
            channel.index
        );
        let status = self.command(channel).run().await?;
        Ok(EngineExit::from(status))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_targets_channel_log() {
        let channel = ChannelDescriptor::new(5, "udp://localhost:2225", "streams", "logs");
        let engine = FfmpegEngine::new(PathBuf::from("ffmpeg"), HlsSettings::default());
        let cmd = engine.command(&channel);
        assert_eq!(cmd.get_args()[2], "udp://localhost:2225");
        assert!(cmd.get_args().last().unwrap().ends_with("stream5.m3u8"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_binary_reports_failure_exit() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ChannelDescriptor::new(0, "udp://localhost:2220", dir.path(), dir.path());
        // `false` ignores its arguments and exits 1.
        let engine = FfmpegEngine::new(PathBuf::from("false"), HlsSettings::default())
            .with_mirror_output(false);

        let exit = engine.run(&channel).await.unwrap();
        assert_eq!(exit, EngineExit::failure(Some(1)));
        assert!(channel.log_path.exists());
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ChannelDescriptor::new(0, "udp://localhost:2220", dir.path(), dir.path());
        let engine = FfmpegEngine::new(PathBuf::from("nonexistent_ffmpeg_12345"), HlsSettings::default());
        assert!(engine.run(&channel).await.is_err());
    }
}

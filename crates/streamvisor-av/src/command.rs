//! Builder for running a long-lived external process to completion.
//!
//! Unlike a one-shot tool call, an engine process may run for hours, so there
//! is no timeout. Its stdout and stderr are streamed as they arrive into an
//! optional log file and, optionally, into this process's own stdout/stderr.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::{Error, Result};

const PUMP_BUFFER: usize = 8 * 1024;

/// A builder for an external process whose output is teed while it runs.
///
/// # Example
///
/// ```no_run
/// use streamvisor_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> streamvisor_av::Result<()> {
/// let status = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .args(["-i", "udp://localhost:2220", "-f", "hls", "streams/stream0.m3u8"])
///     .log_to("logs/channel_0.log")
///     .run()
///     .await?;
/// println!("ffmpeg exited with {status}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    log_path: Option<PathBuf>,
    mirror: bool,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            log_path: None,
            mirror: true,
        }
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append the process output to this file (created if missing).
    pub fn log_to(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.log_path = Some(path.into());
        self
    }

    /// Whether to copy the process output to our own stdout/stderr (default: true).
    pub fn mirror(&mut self, mirror: bool) -> &mut Self {
        self.mirror = mirror;
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Spawn the process and wait for it to terminate.
    ///
    /// Any exit status is returned as `Ok`; only failing to spawn or wait is
    /// an error. Dropping the returned future kills the child.
    ///
    /// # Errors
    ///
    /// - [`Error::Spawn`] if the process cannot be started.
    /// - [`Error::ToolFailed`] if waiting on the process fails.
    pub async fn run(&self) -> Result<ExitStatus> {
        let tool = self.program_name();

        let log = match self.log_path {
            Some(ref path) => open_log(path).await,
            None => None,
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            tool: tool.clone(),
            source,
        })?;
        tracing::debug!(tool = %tool, pid = child.id(), "Spawned process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes append to the same file through separate handles.
        let (out_log, err_log) = match log {
            Some(file) => {
                let dup = file.try_clone().await.ok();
                (Some(file), dup)
            }
            None => (None, None),
        };

        let out_mirror = self.mirror.then(tokio::io::stdout);
        let err_mirror = self.mirror.then(tokio::io::stderr);

        let (status, _, _) = tokio::join!(
            child.wait(),
            pump(stdout, out_log, out_mirror),
            pump(stderr, err_log, err_mirror),
        );

        status.map_err(|e| Error::tool_failed(tool, format!("I/O error waiting for process: {e}")))
    }
}

async fn open_log(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path).await {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("Failed to open log file {:?}, output will not be logged: {}", path, e);
            None
        }
    }
}

/// Copy `src` into the log file and mirror until EOF.
///
/// A sink that fails is dropped; the pipe keeps being drained so the child
/// never blocks on a full pipe.
async fn pump<R, W>(src: Option<R>, mut log: Option<File>, mut mirror: Option<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(mut src) = src else {
        return;
    };
    let mut buf = vec![0u8; PUMP_BUFFER];

    loop {
        let n = match src.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("Process pipe read failed: {}", e);
                break;
            }
        };

        if let Some(file) = log.as_mut() {
            if let Err(e) = file.write_all(&buf[..n]).await {
                tracing::warn!("Failed to write process log: {}", e);
                log = None;
            }
        }
        if let Some(out) = mirror.as_mut() {
            if out.write_all(&buf[..n]).await.is_err() {
                mirror = None;
            }
        }
    }

    if let Some(mut file) = log {
        let _ = file.flush().await;
    }
    if let Some(mut out) = mirror {
        let _ = out.flush().await;
    }
}

//! Discovery of the binaries channel engines depend on.
//!
//! Every channel spawns ffmpeg, so a missing ffmpeg leaves all channels
//! cycling through restarts. ffprobe is only reported by `check-tools` to help
//! inspect a source feed; nothing at runtime needs it.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The transcoder every channel runs.
pub const FFMPEG: &str = "ffmpeg";

/// Stream inspector, reported for diagnostics only.
pub const FFPROBE: &str = "ffprobe";

/// What `check-tools` found for one binary.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    /// Channels cannot run without it.
    pub required: bool,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    /// A required tool that could not be run.
    pub fn is_blocking(&self) -> bool {
        self.required && !self.available
    }
}

/// Run `<name> -version` and record whether it succeeded.
///
/// Both ffmpeg and ffprobe print their banner for `-version` and exit 0.
///
/// # Example
///
/// ```no_run
/// use streamvisor_av::check_tool;
///
/// let info = check_tool("ffmpeg", true);
/// if info.is_blocking() {
///     eprintln!("channels will not start until ffmpeg is installed");
/// }
/// ```
pub fn check_tool(name: &str, required: bool) -> ToolInfo {
    let banner = Command::new(name)
        .arg("-version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| {
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(str::to_string)
        });

    let available = banner.is_some();
    ToolInfo {
        name: name.to_string(),
        required,
        available,
        version: banner.flatten(),
        path: available.then(|| which::which(name).ok()).flatten(),
    }
}

/// Report ffmpeg (required) and ffprobe (optional).
pub fn check_tools() -> Vec<ToolInfo> {
    vec![check_tool(FFMPEG, true), check_tool(FFPROBE, false)]
}

/// Resolve the ffmpeg binary to spawn.
///
/// A configured path that exists is used as-is; one that does not is logged
/// and `PATH` is searched instead.
pub fn find_ffmpeg(configured: Option<&Path>) -> Result<PathBuf> {
    find_binary(FFMPEG, configured)
}

fn find_binary(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured {} path {:?} does not exist, searching PATH",
            name,
            path
        );
    }

    which::which(name).map_err(|_| Error::tool_not_found(name))
}

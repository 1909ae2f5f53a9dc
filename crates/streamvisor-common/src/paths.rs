//! Naming rules for per-channel output files.
//!
//! Segment names carry the channel index followed by a `_` delimiter
//! (`stream_1_004.m4s`), so channel 1 never matches channel 10's files.
//! Manifests keep the legacy `stream<index>.m3u8` name that players request.

use std::path::Path;

use crate::types::ChannelId;

/// Extensions of files the engine writes as segments.
pub const SEGMENT_EXTENSIONS: &[&str] = &["m4s", "ts", "mp4"];

/// Prefix shared by every segment of a channel, delimiter included.
pub fn segment_prefix(index: ChannelId) -> String {
    format!("stream_{index}_")
}

/// printf-style segment file name handed to the engine.
///
/// `extension` follows the container the engine writes (`m4s` for fMP4,
/// `ts` for MPEG-TS).
pub fn segment_pattern(index: ChannelId, extension: &str) -> String {
    format!("{}%03d.{extension}", segment_prefix(index))
}

/// Per-channel fMP4 initialization segment name.
pub fn init_segment_name(index: ChannelId) -> String {
    format!("{}init.mp4", segment_prefix(index))
}

/// Manifest file name for a channel.
pub fn manifest_file_name(index: ChannelId) -> String {
    format!("stream{index}.m3u8")
}

/// Engine log file name for a channel.
pub fn log_file_name(index: ChannelId) -> String {
    format!("channel_{index}.log")
}

/// Check if a path has a segment extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use streamvisor_common::paths::is_segment_file;
///
/// assert!(is_segment_file(Path::new("stream_0_001.m4s")));
/// assert!(is_segment_file(Path::new("/srv/streams/stream_0_001.TS")));
/// assert!(!is_segment_file(Path::new("stream0.m3u8")));
/// ```
pub fn is_segment_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SEGMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a file name is a segment carrying the given prefix.
///
/// `prefix` is expected to come from [`segment_prefix`], delimiter included.
///
/// ```
/// use streamvisor_common::paths::{is_prefixed_segment, segment_prefix};
///
/// assert!(is_prefixed_segment("stream_1_004.m4s", &segment_prefix(1)));
/// assert!(!is_prefixed_segment("stream_10_004.m4s", &segment_prefix(1)));
/// ```
pub fn is_prefixed_segment(file_name: &str, prefix: &str) -> bool {
    file_name.starts_with(prefix) && is_segment_file(Path::new(file_name))
}

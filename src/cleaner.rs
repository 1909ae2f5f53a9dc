//! Removal of a channel's stale segments and manifest.
//!
//! The output directory is shared with the static file server, which may be
//! reading a segment while it is deleted. Such races, and any other per-file
//! failure, are recorded and logged but never stop the rest of the cleanup.

use std::io;
use std::path::Path;
use streamvisor_common::paths::is_prefixed_segment;
use streamvisor_common::{ChannelDescriptor, Error};
use walkdir::WalkDir;

/// What a cleanup pass did.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Segment files removed.
    pub removed: usize,
    /// Whether the manifest existed and was removed.
    pub manifest_removed: bool,
    /// Files that could not be removed.
    pub failed: Vec<Error>,
}

impl CleanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remove every segment in `output_dir` named `<prefix>*.<segment ext>`, then
/// the manifest at `manifest_path`.
///
/// `prefix` must end with a delimiter (see
/// [`streamvisor_common::paths::segment_prefix`]) so one channel's prefix is
/// never a prefix of another's.
pub fn clean(output_dir: &Path, manifest_path: &Path, prefix: &str) -> CleanReport {
    let mut report = CleanReport::default();

    if output_dir.is_dir() {
        for entry in WalkDir::new(output_dir).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Typically an entry deleted while walking.
                    tracing::debug!("Skipping unreadable entry in {:?}: {}", output_dir, e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if !is_prefixed_segment(&entry.file_name().to_string_lossy(), prefix) {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove segment {:?}: {}", entry.path(), e);
                    report.failed.push(Error::cleanup(entry.path(), e));
                }
            }
        }
    }

    match std::fs::remove_file(manifest_path) {
        Ok(()) => report.manifest_removed = true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!("Failed to remove manifest {:?}: {}", manifest_path, e);
            report.failed.push(Error::cleanup(manifest_path, e));
        }
    }

    report
}

/// [`clean`] for one channel's outputs.
pub fn clean_channel(channel: &ChannelDescriptor) -> CleanReport {
    let report = clean(
        &channel.output_dir,
        &channel.manifest_path,
        &channel.segment_prefix(),
    );
    tracing::debug!(
        channel = channel.index,
        "Cleaned {} segments (manifest removed: {}, failures: {})",
        report.removed,
        report.manifest_removed,
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn removes_only_own_channel() {
        let dir = tempdir().unwrap();
        let out = dir.path();
        for name in [
            "stream_1_000.m4s",
            "stream_1_001.m4s",
            "stream_1_002.ts",
            "stream_1_init.mp4",
            "stream1.m3u8",
            "stream_10_000.m4s",
            "stream_10_init.mp4",
            "stream10.m3u8",
            "stream_11_000.ts",
            "notes.txt",
        ] {
            touch(out, name);
        }

        let channel = ChannelDescriptor::new(1, "udp://localhost:2221", out, out);
        let report = clean_channel(&channel);

        assert_eq!(report.removed, 4);
        assert!(report.manifest_removed);
        assert!(report.is_clean());

        let mut left: Vec<String> = fs::read_dir(out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "notes.txt",
                "stream10.m3u8",
                "stream_10_000.m4s",
                "stream_10_init.mp4",
                "stream_11_000.ts",
            ]
        );
    }

    #[test]
    fn prefixed_non_segments_survive() {
        let dir = tempdir().unwrap();
        let out = dir.path();
        for name in ["stream_2_000.ts", "stream_2_000.ts.tmp", "stream_2_playlist.m3u8"] {
            touch(out, name);
        }

        let report = clean(out, &out.join("stream2.m3u8"), "stream_2_");
        assert_eq!(report.removed, 1);
        assert!(out.join("stream_2_000.ts.tmp").exists());
        assert!(out.join("stream_2_playlist.m3u8").exists());
    }

    #[test]
    fn already_clean_directory() {
        let dir = tempdir().unwrap();
        let channel = ChannelDescriptor::new(0, "udp://localhost:2220", dir.path(), dir.path());

        let report = clean_channel(&channel);
        assert_eq!(report.removed, 0);
        assert!(!report.manifest_removed);
        assert!(report.is_clean());
    }

    #[test]
    fn missing_output_dir_is_tolerated() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let report = clean(&missing, &missing.join("stream0.m3u8"), "stream_0_");
        assert_eq!(report.removed, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn nested_segments_are_removed() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("old");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "stream_0_007.m4s");
        touch(&nested, "stream_0_keep.txt");

        let report = clean(dir.path(), &dir.path().join("stream0.m3u8"), "stream_0_");
        assert_eq!(report.removed, 1);
        assert!(nested.join("stream_0_keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failures_do_not_stop_cleanup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        touch(&locked, "stream_0_001.m4s");
        touch(dir.path(), "stream_0_002.m4s");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let report = clean(dir.path(), &dir.path().join("stream0.m3u8"), "stream_0_");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root ignores directory permissions, so only the outer file is certain.
        assert!(!dir.path().join("stream_0_002.m4s").exists());
        assert_eq!(report.removed + report.failed.len(), 2);
    }
}

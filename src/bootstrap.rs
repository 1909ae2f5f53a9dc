//! One-time preparation of the filesystem layout before any channel starts.

use crate::config::PathsConfig;
use std::path::Path;
use streamvisor_common::{Error, Result};

/// Create the output and log directories.
///
/// This is the only fatal path in the process: the caller is expected to
/// exit if it fails.
pub fn prepare_directories(paths: &PathsConfig) -> Result<()> {
    ensure_dir(&paths.output_dir)?;
    ensure_dir(&paths.log_dir)?;
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::bootstrap(path, e))?;
    tracing::debug!("Directory ready: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_nested_directories() {
        let dir = tempdir().unwrap();
        let paths = PathsConfig {
            output_dir: dir.path().join("a/streams"),
            log_dir: dir.path().join("b/logs"),
        };

        prepare_directories(&paths).unwrap();
        assert!(paths.output_dir.is_dir());
        assert!(paths.log_dir.is_dir());

        // Existing directories are fine.
        prepare_directories(&paths).unwrap();
    }

    #[test]
    fn file_in_the_way_is_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("streams");
        std::fs::write(&blocker, b"").unwrap();

        let paths = PathsConfig {
            output_dir: blocker.clone(),
            log_dir: dir.path().join("logs"),
        };

        let err = prepare_directories(&paths).unwrap_err();
        assert!(err.is_fatal());
        match err {
            Error::Bootstrap { path, .. } => assert_eq!(path, blocker),
            other => panic!("unexpected error: {other}"),
        }
    }
}

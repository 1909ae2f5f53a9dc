//! Common error types used throughout streamvisor.
//!
//! Only [`Error::Bootstrap`] is ever allowed to stop the process. Every other
//! variant is logged by the component that hit it and the component carries on.

use std::path::PathBuf;

/// Common error type for streamvisor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required directory could not be prepared at startup.
    #[error("failed to prepare directory {}: {source}", path.display())]
    Bootstrap {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stale output file could not be removed.
    #[error("failed to remove {}: {source}", path.display())]
    Cleanup {
        /// The file that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Bootstrap error.
    pub fn bootstrap(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Bootstrap {
            path: path.into(),
            source,
        }
    }

    /// Create a new Cleanup error.
    pub fn cleanup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Cleanup {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bootstrap { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn bootstrap_display_and_fatal() {
        let err = Error::bootstrap(
            "/nope/streams",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "failed to prepare directory /nope/streams: denied"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn cleanup_is_not_fatal() {
        let err = Error::cleanup(
            "streams/stream_0_001.m4s",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("stream_0_001.m4s"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn io_from_std() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_fatal());
    }
}

//! Error types for the polling watcher.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
///
/// Only `add`/`remove` and construction surface these to callers. Failures
/// inside a poll tick are turned into events or logged and dropped.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Path does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("Path is already being watched: {path}")]
    AlreadyWatched { path: PathBuf },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Listing or classifying a directory failed mid-scan. Never returned
    /// from the public API.
    #[error("Failed to scan {path}: {source}")]
    ScanFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No tokio runtime available to drive polling")]
    NoRuntime,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WatchError {
    /// Map a stat failure on an explicitly requested path.
    pub(crate) fn from_stat(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            WatchError::NotFound { path }
        } else {
            WatchError::Io { path, source }
        }
    }
}

//! Polling file system watcher
//!
//! This crate watches files and directories by periodically stat-ing them:
//! - Per-path poll tasks on the tokio runtime (100ms default interval)
//! - mtime comparison for files, mtime + link count for directories
//! - Optional recursive expansion of directories into file watches
//! - `new` / `change` / `delete` events fanned out to listeners in order
//!
//! ```no_run
//! # async fn demo() -> Result<(), tickwatch::WatchError> {
//! use tickwatch::{Watcher, WatcherConfig};
//!
//! let watcher = Watcher::new(WatcherConfig::default())?;
//! watcher
//!     .add("./src", false)?
//!     .add("./lib", true)?
//!     .on_change(|event| println!("{} {}", event.kind, event.path.display()));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod path;
pub mod registry;
pub mod snapshot;

mod poll;
mod scan;

pub use config::WatcherConfig;
pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind, EventSink, Listener};
pub use registry::{WatchId, WatchKind, WatchRegistry, WatchTarget};
pub use snapshot::{EntryKind, MetadataSnapshot};

use poll::PollEngine;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Polling file system watcher
///
/// Owns its watch table and listener list; dropping it stops every poll task.
/// Mutating calls return `&Self` so they can be chained.
pub struct Watcher {
    engine: Arc<PollEngine>,
}

impl Watcher {
    /// Create a watcher driven by the current tokio runtime
    pub fn new(config: WatcherConfig) -> Result<Self, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Create a watcher whose poll tasks run on `runtime`
    pub fn with_runtime(config: WatcherConfig, runtime: Handle) -> Result<Self, WatchError> {
        config.validate()?;

        info!(
            "Starting watcher (file interval: {:?}, directory interval: {:?})",
            config.file_interval(),
            config.dir_interval()
        );

        Ok(Self {
            engine: Arc::new(PollEngine::new(config, runtime)),
        })
    }

    /// Start watching a file or directory
    ///
    /// Relative paths are resolved against the current directory. `recursive`
    /// only applies to directories. Fails with `NotFound` if the path does
    /// not exist and `AlreadyWatched` if exactly this path is already watched.
    pub fn add(&self, path: impl AsRef<Path>, recursive: bool) -> Result<&Self, WatchError> {
        let path = path::normalize(path.as_ref())?;
        let metadata =
            std::fs::metadata(&path).map_err(|e| WatchError::from_stat(path.clone(), e))?;

        if metadata.is_dir() {
            self.engine.start_directory(&path, recursive, None)?;
        } else if metadata.is_file() {
            self.engine.start_file(&path, None)?;
        } else {
            return Err(WatchError::InvalidArgument {
                reason: format!("{} is neither a file nor a directory", path.display()),
            });
        }

        Ok(self)
    }

    /// Stop watching a path
    ///
    /// Directories are torn down with the recursion flag they were added
    /// with. Paths that are not watched are ignored.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<&Self, WatchError> {
        let path = path::normalize(path.as_ref())?;

        match self.engine.stop(&path) {
            Some(kind) => debug!("Removed {:?} watch on {}", kind, path.display()),
            None => debug!("Not watched, nothing to remove: {}", path.display()),
        }

        Ok(self)
    }

    /// Register a listener for change events
    ///
    /// Listeners run synchronously on the poll task that detected the change,
    /// in registration order. Listeners must not panic: one that does is
    /// logged and skips the remaining listeners for that event, though the
    /// watch keeps polling.
    pub fn on_change<F>(&self, listener: F) -> &Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.engine.sink().subscribe(Arc::new(listener));
        self
    }

    /// Drop all listeners. Watches keep polling.
    pub fn clear_listeners(&self) -> &Self {
        self.engine.sink().unsubscribe_all();
        self
    }

    pub fn is_watched(&self, path: impl AsRef<Path>) -> bool {
        self.target(path).is_some()
    }

    pub fn target(&self, path: impl AsRef<Path>) -> Option<WatchTarget> {
        let path = path::normalize(path.as_ref()).ok()?;
        self.engine.target(&path)
    }

    /// All watched paths, sorted
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.engine.paths()
    }

    pub fn listener_count(&self) -> usize {
        self.engine.sink().len()
    }

    pub fn config(&self) -> &WatcherConfig {
        self.engine.config()
    }

    /// Stop every watch. Listeners are kept.
    pub fn close(&self) {
        self.engine.shutdown();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("watched", &self.engine.paths().len())
            .field("listeners", &self.listener_count())
            .field("config", self.config())
            .finish()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

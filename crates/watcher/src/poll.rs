//! Per-path polling engine
//!
//! Every watched path owns one tokio task that wakes on a fixed interval,
//! stats the path and compares the result with the previous snapshot:
//! - Files report `change` when their mtime moves and `delete` once the stat
//!   comes back not-found (the watch then ends on its own)
//! - Directories never report anything themselves; a moved mtime or link
//!   count triggers a diff scan of their children
//!
//! The registry and the task handles live behind one mutex so that
//! register-then-spawn and unregister-then-cancel are atomic with respect to
//! poll ticks. Events are never emitted while that lock is held, and a
//! listener that panics never takes a poll task down with it.

use crate::config::WatcherConfig;
use crate::error::WatchError;
use crate::event::{ChangeEvent, ChangeKind, EventSink};
use crate::registry::{WatchId, WatchKind, WatchRegistry, WatchTarget};
use crate::scan::{DirectoryScanner, ScanMode};
use crate::snapshot::MetadataSnapshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Registry entries and the task driving each of them
#[derive(Default)]
struct EngineState {
    registry: WatchRegistry,
    tasks: HashMap<PathBuf, JoinHandle<()>>,
}

impl EngineState {
    /// Drop the entry and cancel its task.
    fn release(&mut self, path: &Path) -> Option<WatchTarget> {
        let target = self.registry.delete(path)?;
        if let Some(task) = self.tasks.remove(path) {
            task.abort();
        }
        Some(target)
    }
}

/// Directory whose scan is registering children.
///
/// Registrations made on its behalf are refused once it has been removed, so
/// an in-flight scan cannot resurrect watches under a torn-down directory.
#[derive(Debug, Clone)]
pub(crate) struct ScanOwner {
    pub path: PathBuf,
    pub id: WatchId,
}

/// Outcome of a single poll tick
enum Tick {
    Idle,
    Updated(MetadataSnapshot),
    Finished,
}

pub(crate) struct PollEngine {
    state: Mutex<EngineState>,
    sink: EventSink,
    config: WatcherConfig,
    runtime: Handle,
    next_id: AtomicU64,
}

impl PollEngine {
    pub(crate) fn new(config: WatcherConfig, runtime: Handle) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            sink: EventSink::new(),
            config,
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub(crate) fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Fan an event out to the listeners.
    ///
    /// A panicking listener cuts this event's fan-out short; the tick that
    /// produced it carries on and the watch keeps polling.
    pub(crate) fn emit(&self, event: &ChangeEvent) {
        if panic::catch_unwind(AssertUnwindSafe(|| self.sink.emit(event))).is_err() {
            warn!(
                "Listener panicked handling {} {}",
                event.kind,
                event.path.display()
            );
        }
    }

    fn next_id(&self) -> WatchId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Start polling a regular file.
    ///
    /// Returns the baseline snapshot when a watch was registered. A path that
    /// vanished or is not a regular file yields `Ok(None)`.
    pub(crate) fn start_file(
        self: &Arc<Self>,
        path: &Path,
        owner: Option<&ScanOwner>,
    ) -> Result<Option<MetadataSnapshot>, WatchError> {
        let snapshot = match MetadataSnapshot::capture(path) {
            Ok(snapshot) if snapshot.is_file() => snapshot,
            Ok(_) => {
                trace!("Not a regular file, skipping: {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        let mut state = self.state.lock();
        if let Some(owner) = owner {
            if !state.registry.is_current(&owner.path, owner.id) {
                return Ok(None);
            }
        }

        let id = self.next_id();
        state
            .registry
            .put(WatchTarget::file(path.to_path_buf(), id))?;

        let task = self.runtime.spawn(poll_file(
            Arc::downgrade(self),
            path.to_path_buf(),
            id,
            snapshot.clone(),
            self.config.file_interval(),
        ));
        state.tasks.insert(path.to_path_buf(), task);

        debug!("Watching file {}", path.display());
        Ok(Some(snapshot))
    }

    /// Stop polling a file. Returns false if it was not watched as a file.
    pub(crate) fn stop_file(&self, path: &Path) -> bool {
        let mut state = self.state.lock();
        match state.registry.get(path) {
            Some(target) if target.kind == WatchKind::File => {}
            _ => return false,
        }
        state.release(path);
        debug!("Stopped watching file {}", path.display());
        true
    }

    /// Register a directory, baseline-scan it and start polling it.
    ///
    /// Returns false when the directory disappeared before it could be
    /// registered or was removed again while its baseline scan ran.
    pub(crate) fn start_directory(
        self: &Arc<Self>,
        path: &Path,
        recursive: bool,
        owner: Option<&ScanOwner>,
    ) -> Result<bool, WatchError> {
        // Snapshot before scanning: anything created mid-scan shows up as a
        // directory change on the first tick.
        let snapshot = match MetadataSnapshot::capture(path) {
            Ok(snapshot) if snapshot.is_dir() => snapshot,
            Ok(_) => return Ok(false),
            Err(e) => {
                debug!("Skipping directory {}: {}", path.display(), e);
                return Ok(false);
            }
        };

        let id = {
            let mut state = self.state.lock();
            if let Some(owner) = owner {
                if !state.registry.is_current(&owner.path, owner.id) {
                    return Ok(false);
                }
            }
            let id = self.next_id();
            state
                .registry
                .put(WatchTarget::directory(path.to_path_buf(), recursive, id))?;
            id
        };

        DirectoryScanner::new(self, path, id).scan(recursive, ScanMode::Baseline);

        let mut state = self.state.lock();
        if !state.registry.is_current(path, id) {
            return Ok(false);
        }
        let task = self.runtime.spawn(poll_directory(
            Arc::downgrade(self),
            path.to_path_buf(),
            id,
            snapshot,
            self.config.dir_interval(),
        ));
        state.tasks.insert(path.to_path_buf(), task);

        debug!(
            "Watching directory {} (recursive: {})",
            path.display(),
            recursive
        );
        Ok(true)
    }

    /// Stop a directory and every watch beneath it.
    ///
    /// The directory's own entry goes first so its in-flight scans stop
    /// registering children; descendants are then torn down using the
    /// recursion flag recorded when it was added.
    pub(crate) fn stop_directory(self: &Arc<Self>, path: &Path) -> bool {
        let target = {
            let mut state = self.state.lock();
            match state.registry.get(path) {
                Some(target) if target.is_dir() => {}
                _ => return false,
            }
            state.release(path)
        };

        let Some(target) = target else {
            return false;
        };

        DirectoryScanner::new(self, path, target.id).scan(target.recursive, ScanMode::Teardown);
        debug!("Stopped watching directory {}", path.display());
        true
    }

    /// Stop whatever is registered at `path`.
    pub(crate) fn stop(self: &Arc<Self>, path: &Path) -> Option<WatchKind> {
        let kind = self.state.lock().registry.get(path).map(|t| t.kind)?;
        let stopped = match kind {
            WatchKind::File => self.stop_file(path),
            WatchKind::Directory => self.stop_directory(path),
        };
        stopped.then_some(kind)
    }

    /// Cancel every task and forget every entry.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        for (_, task) in state.tasks.drain() {
            task.abort();
        }
        state.registry.clear();
    }

    pub(crate) fn target(&self, path: &Path) -> Option<WatchTarget> {
        self.state.lock().registry.get(path).cloned()
    }

    pub(crate) fn children_of(&self, dir: &Path) -> Vec<WatchTarget> {
        self.state.lock().registry.children_of(dir)
    }

    pub(crate) fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .state
            .lock()
            .registry
            .paths()
            .map(Path::to_path_buf)
            .collect();
        paths.sort();
        paths
    }

    fn is_current(&self, path: &Path, id: WatchId) -> bool {
        self.state.lock().registry.is_current(path, id)
    }

    fn file_tick(&self, path: &Path, id: WatchId, last: &MetadataSnapshot) -> Tick {
        match MetadataSnapshot::capture(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let released = {
                    let mut state = self.state.lock();
                    if state.registry.is_current(path, id) {
                        state.registry.delete(path);
                        // This task is the one finishing; detach, don't abort
                        state.tasks.remove(path);
                        true
                    } else {
                        false
                    }
                };

                if released {
                    debug!("Watched file deleted: {}", path.display());
                    self.emit(&ChangeEvent::new(
                        path.to_path_buf(),
                        last.clone(),
                        last.clone(),
                        ChangeKind::Delete,
                    ));
                }
                Tick::Finished
            }
            Err(e) => {
                debug!("Stat failed for {}, skipping tick: {}", path.display(), e);
                Tick::Idle
            }
            Ok(current) => {
                if !last.file_changed(&current) {
                    return Tick::Idle;
                }
                if !self.is_current(path, id) {
                    return Tick::Finished;
                }

                self.emit(&ChangeEvent::new(
                    path.to_path_buf(),
                    last.clone(),
                    current.clone(),
                    ChangeKind::Change,
                ));
                Tick::Updated(current)
            }
        }
    }

    fn directory_tick(self: &Arc<Self>, path: &Path, id: WatchId, last: &MetadataSnapshot) -> Tick {
        let current = match MetadataSnapshot::capture(path) {
            Ok(current) => current,
            Err(e) => {
                // Deleted directories keep their entry until removed explicitly
                trace!("Directory stat failed for {}: {}", path.display(), e);
                return Tick::Idle;
            }
        };

        if !last.dir_changed(&current) {
            return Tick::Idle;
        }

        let recursive = {
            let state = self.state.lock();
            match state.registry.get(path) {
                Some(target) if target.id == id => target.recursive,
                _ => return Tick::Finished,
            }
        };

        debug!("Directory changed, rescanning: {}", path.display());
        DirectoryScanner::new(self, path, id).scan(recursive, ScanMode::Diff);
        Tick::Updated(current)
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn poll_file(
    engine: Weak<PollEngine>,
    path: PathBuf,
    id: WatchId,
    mut last: MetadataSnapshot,
    period: Duration,
) {
    let mut ticker = ticker(period);

    loop {
        ticker.tick().await;

        let Some(engine) = engine.upgrade() else {
            break;
        };
        match engine.file_tick(&path, id, &last) {
            Tick::Idle => {}
            Tick::Updated(current) => last = current,
            Tick::Finished => break,
        }
    }

    trace!("File poll ended: {}", path.display());
}

async fn poll_directory(
    engine: Weak<PollEngine>,
    path: PathBuf,
    id: WatchId,
    mut last: MetadataSnapshot,
    period: Duration,
) {
    let mut ticker = ticker(period);

    loop {
        ticker.tick().await;

        let Some(engine) = engine.upgrade() else {
            break;
        };
        match engine.directory_tick(&path, id, &last) {
            Tick::Idle => {}
            Tick::Updated(current) => last = current,
            Tick::Finished => break,
        }
    }

    trace!("Directory poll ended: {}", path.display());
}

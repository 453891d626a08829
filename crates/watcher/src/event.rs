//! Change events and the listener fan-out

use crate::snapshot::MetadataSnapshot;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Kind of change detected on a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File appeared in a watched directory
    New,
    /// File mtime moved
    Change,
    /// File no longer exists
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Change => "change",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A detected transition on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub previous: MetadataSnapshot,
    pub current: MetadataSnapshot,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(
        path: PathBuf,
        previous: MetadataSnapshot,
        current: MetadataSnapshot,
        kind: ChangeKind,
    ) -> Self {
        Self {
            path,
            previous,
            current,
            kind,
        }
    }
}

/// Observer callback.
pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Ordered list of listeners.
///
/// `emit` runs every listener synchronously, in subscription order, on the
/// poll task that produced the event. A listener that panics unwinds out of
/// `emit` and skips the listeners after it.
#[derive(Default)]
pub struct EventSink {
    listeners: RwLock<Vec<Listener>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) {
        self.listeners.write().push(listener);
    }

    pub fn unsubscribe_all(&self) {
        self.listeners.write().clear();
    }

    pub fn emit(&self, event: &ChangeEvent) {
        // Snapshot so listeners can re-enter the watcher
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("listeners", &self.len())
            .finish()
    }
}

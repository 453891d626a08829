//! Watch registry: which paths are watched, and how.

use crate::error::WatchError;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Generation number distinguishing successive watches of the same path.
pub type WatchId = u64;

/// What a registry entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    File,
    Directory,
}

/// A path under observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    /// Absolute, normalised path
    pub path: PathBuf,
    pub kind: WatchKind,
    /// Only meaningful for directories
    pub recursive: bool,
    /// Generation of this watch
    pub id: WatchId,
}

impl WatchTarget {
    pub fn file(path: PathBuf, id: WatchId) -> Self {
        Self {
            path,
            kind: WatchKind::File,
            recursive: false,
            id,
        }
    }

    pub fn directory(path: PathBuf, recursive: bool, id: WatchId) -> Self {
        Self {
            path,
            kind: WatchKind::Directory,
            recursive,
            id,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == WatchKind::Directory
    }
}

/// Map from normalised path to its watch target.
///
/// Pure bookkeeping. Callers serialise access (the engine keeps it behind a
/// single mutex).
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: HashMap<PathBuf, WatchTarget>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match lookup.
    pub fn has(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert a target, rejecting duplicates.
    pub fn put(&mut self, target: WatchTarget) -> Result<(), WatchError> {
        if self.has(&target.path) {
            return Err(WatchError::AlreadyWatched { path: target.path });
        }
        self.entries.insert(target.path.clone(), target);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&WatchTarget> {
        self.entries.get(path)
    }

    /// Remove an entry. Absent paths are fine.
    pub fn delete(&mut self, path: &Path) -> Option<WatchTarget> {
        self.entries.remove(path)
    }

    /// True while `path` is still registered under generation `id`.
    pub fn is_current(&self, path: &Path, id: WatchId) -> bool {
        self.entries.get(path).is_some_and(|t| t.id == id)
    }

    /// Targets whose immediate parent is `dir`.
    pub fn children_of(&self, dir: &Path) -> Vec<WatchTarget> {
        self.entries
            .values()
            .filter(|t| t.path.parent() == Some(dir))
            .cloned()
            .collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

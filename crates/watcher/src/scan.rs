//! Directory scanning
//!
//! Expands a watched directory into watches on its children. Three modes:
//! - Baseline: register existing children silently when a directory is added
//! - Diff: register children not seen before and report files as `new`
//! - Teardown: stop every registered child when a directory is removed
//!
//! Subdirectories found by a diff scan get a baseline scan of their own, so
//! files already inside them are watched but not reported as `new`.

use crate::error::WatchError;
use crate::event::{ChangeEvent, ChangeKind};
use crate::poll::{PollEngine, ScanOwner};
use crate::registry::{WatchId, WatchKind};
use crate::snapshot::MetadataSnapshot;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    Baseline,
    Diff,
    Teardown,
}

pub(crate) struct DirectoryScanner<'a> {
    engine: &'a Arc<PollEngine>,
    owner: ScanOwner,
}

impl<'a> DirectoryScanner<'a> {
    pub(crate) fn new(engine: &'a Arc<PollEngine>, dir: &Path, id: WatchId) -> Self {
        Self {
            engine,
            owner: ScanOwner {
                path: dir.to_path_buf(),
                id,
            },
        }
    }

    pub(crate) fn scan(&self, recursive: bool, mode: ScanMode) {
        if mode == ScanMode::Teardown {
            self.teardown(recursive);
            return;
        }

        // Listing races with deletion of the directory itself
        let children = match list_children(&self.owner.path) {
            Ok(children) => children,
            Err(e) => {
                debug!("{}", e);
                return;
            }
        };

        for child in children {
            self.visit(child, recursive, mode);
        }
    }

    fn visit(&self, child: PathBuf, recursive: bool, mode: ScanMode) {
        let snapshot = match MetadataSnapshot::capture(&child) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                trace!("Child vanished mid-scan {}: {}", child.display(), e);
                return;
            }
        };

        if snapshot.is_file() {
            match self.engine.start_file(&child, Some(&self.owner)) {
                Ok(Some(registered)) if mode == ScanMode::Diff => {
                    debug!("New file: {}", child.display());
                    self.engine.emit(&ChangeEvent::new(
                        child,
                        registered.clone(),
                        registered,
                        ChangeKind::New,
                    ));
                }
                Ok(_) | Err(WatchError::AlreadyWatched { .. }) => {}
                Err(e) => debug!("Failed to watch {}: {}", child.display(), e),
            }
        } else if snapshot.is_dir() && recursive {
            match self.engine.start_directory(&child, recursive, Some(&self.owner)) {
                Ok(_) | Err(WatchError::AlreadyWatched { .. }) => {}
                Err(e) => debug!("Failed to watch {}: {}", child.display(), e),
            }
        }
    }

    /// Works off the registry rather than the disk so a directory that is
    /// already gone still releases everything under it.
    fn teardown(&self, recursive: bool) {
        for child in self.engine.children_of(&self.owner.path) {
            match child.kind {
                WatchKind::File => {
                    self.engine.stop_file(&child.path);
                }
                WatchKind::Directory if recursive => {
                    self.engine.stop_directory(&child.path);
                }
                WatchKind::Directory => {}
            }
        }
    }
}

/// Immediate children of `dir`.
///
/// Fails only when `dir` itself cannot be read; unreadable entries are
/// skipped.
pub(crate) fn list_children(dir: &Path) -> Result<Vec<PathBuf>, WatchError> {
    let mut children = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) => children.push(entry.into_path()),
            Err(e) if e.depth() == 0 => {
                return Err(WatchError::ScanFailure {
                    path: dir.to_path_buf(),
                    source: io::Error::from(e),
                });
            }
            Err(e) => trace!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_children_one_level() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/nested.txt"), b"n").unwrap();

        let mut children = list_children(root).unwrap();
        children.sort();

        assert_eq!(children, vec![root.join("a.txt"), root.join("sub")]);
    }

    #[test]
    fn test_list_children_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_children(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_dir_is_scan_failure() {
        let temp_dir = TempDir::new().unwrap();
        let err = list_children(&temp_dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, WatchError::ScanFailure { .. }));
    }
}

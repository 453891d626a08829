//! Metadata snapshots taken on each poll tick

use serde::Serialize;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What a stat call found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// Last observed stat result for a watched path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSnapshot {
    /// Modification time
    pub mtime: SystemTime,
    /// Inode change time (unix only)
    pub ctime: Option<SystemTime>,
    /// Hard link count (1 where the platform does not report it)
    pub nlink: u64,
    /// Size in bytes
    pub len: u64,
    pub kind: EntryKind,
}

impl MetadataSnapshot {
    /// Stat `path`, following symlinks.
    pub fn capture(path: &Path) -> io::Result<Self> {
        std::fs::metadata(path).map(|m| Self::from_metadata(&m))
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        let kind = if metadata.is_file() {
            EntryKind::File
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        };

        Self {
            mtime: metadata.modified().unwrap_or(UNIX_EPOCH),
            ctime: change_time(metadata),
            nlink: link_count(metadata),
            len: metadata.len(),
            kind,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Files only compare mtime.
    pub fn file_changed(&self, current: &MetadataSnapshot) -> bool {
        self.mtime != current.mtime
    }

    /// A directory's mtime or link count moving means its entries changed.
    pub fn dir_changed(&self, current: &MetadataSnapshot) -> bool {
        self.mtime != current.mtime || self.nlink != current.nlink
    }
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;

    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    Some(UNIX_EPOCH + Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

#[cfg(unix)]
fn link_count(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &Metadata) -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_capture_classifies_entries() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let snap = MetadataSnapshot::capture(&file).unwrap();
        assert!(snap.is_file());
        assert_eq!(snap.len, 5);

        let snap = MetadataSnapshot::capture(temp_dir.path()).unwrap();
        assert!(snap.is_dir());
    }

    #[test]
    fn test_capture_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = MetadataSnapshot::capture(&temp_dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_file_changed_only_looks_at_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"one").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_000_000, 0)).unwrap();
        let before = MetadataSnapshot::capture(&file).unwrap();

        // Same mtime, different size: invisible
        fs::write(&file, b"longer content").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_000_000, 0)).unwrap();
        let same = MetadataSnapshot::capture(&file).unwrap();
        assert!(!before.file_changed(&same));

        set_file_mtime(&file, FileTime::from_unix_time(1_000_005, 0)).unwrap();
        let after = MetadataSnapshot::capture(&file).unwrap();
        assert!(before.file_changed(&after));
    }

    #[test]
    fn test_dir_changed_on_link_count() {
        let base = MetadataSnapshot {
            mtime: UNIX_EPOCH,
            ctime: None,
            nlink: 2,
            len: 0,
            kind: EntryKind::Directory,
        };
        let more_links = MetadataSnapshot { nlink: 3, ..base.clone() };

        assert!(base.dir_changed(&more_links));
        assert!(!base.dir_changed(&base.clone()));
    }
}

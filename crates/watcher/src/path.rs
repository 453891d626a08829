//! Registry key normalisation
//!
//! Keys are absolute and lexically normalised. Symlinks are deliberately left
//! alone so a path that has since been deleted still maps to the key it was
//! registered under.

use crate::error::WatchError;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` against the current working directory and fold `.`/`..`.
pub fn normalize(path: &Path) -> Result<PathBuf, WatchError> {
    if path.as_os_str().is_empty() {
        return Err(WatchError::InvalidArgument {
            reason: "path must not be empty".to_string(),
        });
    }

    if path.is_absolute() {
        return Ok(normalize_with(Path::new("/"), path));
    }

    let cwd = std::env::current_dir().map_err(|source| WatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize_with(&cwd, path))
}

/// Join `path` onto `base` (unless already absolute) and fold components.
pub fn normalize_with(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays at the root
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

//! Path utility functions for normalization and comparison.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

use super::Runtime;

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep the `..` when there is nothing left to pop
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check if `path` is `dir` or lies below it, comparing normalized components.
///
/// `/pkg/x/../../etc` is NOT under `/pkg`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    let normalized_path = normalize_path(path);
    let normalized_dir = normalize_path(dir);

    let path_components: Vec<_> = normalized_path.components().collect();
    let dir_components: Vec<_> = normalized_dir.components().collect();

    if path_components.len() < dir_components.len() {
        return false;
    }

    dir_components
        .iter()
        .zip(path_components.iter())
        .all(|(d, p)| d == p)
}

/// Resolve `path` to an absolute, symlink-free spelling, even when its tail
/// does not exist yet.
///
/// The longest existing prefix is canonicalized and the remaining components
/// are appended and normalized, so `<tmp>/x/../pkg/a.tgz` and `<tmp>/pkg/a.tgz`
/// resolve to the same path.
#[tracing::instrument(skip(runtime))]
pub fn resolve_path<R: Runtime>(runtime: &R, path: &Path) -> Result<PathBuf> {
    let components: Vec<Component> = path.components().collect();

    for split in (0..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        let existing = if prefix.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            prefix
        };

        if runtime.exists(&existing) {
            let mut resolved = runtime.canonicalize(&existing)?;
            resolved.extend(&components[split..]);
            return Ok(normalize_path(&resolved));
        }
    }

    bail!("Cannot resolve {}", path.display())
}

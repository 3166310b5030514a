//! Path normalization between native, project-relative and persisted forms
//!
//! In memory, tracked files are kept as project-relative [`PathBuf`]s using the
//! host's separators. In the project file they are always written with forward
//! slashes so a project can move between platforms.

use std::path::{Component, Path, PathBuf};

use super::error::{ProjectError, ProjectResult};

/// Render a project-relative path in its persisted, `/`-separated form
pub fn to_persisted(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse a persisted path back into native form
///
/// Backslashes written by older project files are accepted as separators too.
pub fn from_persisted(text: &str) -> PathBuf {
    text.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// Make `path` relative to `root` and resolve `.`/`..` lexically
///
/// Absolute paths (and remote-addressed paths sharing the root's prefix) must
/// lie below `root`; relative paths are taken to be relative to it already.
pub fn normalize_relative(root: &Path, path: &Path) -> ProjectResult<PathBuf> {
    let root = lexical_clean(root);
    let candidate = lexical_clean(path);

    let relative = match candidate.strip_prefix(&root) {
        Ok(rest) => rest.to_path_buf(),
        Err(_) if is_anchored(path) => {
            return Err(ProjectError::PathOutsideProject(path.to_path_buf()));
        }
        Err(_) => candidate,
    };

    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(ProjectError::PathOutsideProject(path.to_path_buf()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ProjectError::PathOutsideProject(path.to_path_buf()));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(ProjectError::PathOutsideProject(path.to_path_buf()));
    }
    Ok(out)
}

/// Directory part of a project-relative path, `None` for top-level files
pub fn parent_dir(relative: &Path) -> Option<PathBuf> {
    relative
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Basename used for glob matching
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Absolute, drive-prefixed or scheme-addressed (`remote://...`)
fn is_anchored(path: &Path) -> bool {
    path.has_root()
        || matches!(path.components().next(), Some(Component::Prefix(_)))
        || path.to_string_lossy().contains("://")
}

/// Drop `.` components and fold `..` where a parent is available
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

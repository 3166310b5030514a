//! Error types for the project store

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reported by [`ProjectStore`](super::ProjectStore) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("File category '{0}' is already registered")]
    DuplicateCategory(String),

    #[error("Unknown file category '{0}'")]
    UnknownCategory(String),

    #[error("File category '{0}' is built in and cannot be removed")]
    BuiltinCategory(String),

    #[error("Malformed project file: {0}")]
    MalformedProjectFile(String),

    #[error("I/O error on '{}': {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Path '{}' lies outside of the project root", .0.display())]
    PathOutsideProject(PathBuf),

    #[error("Invalid file type pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No project file has been set")]
    NoProjectFile,
}

impl ProjectError {
    /// Wrap an I/O error together with the path it happened on
    pub fn io(path: impl AsRef<Path>, err: io::Error) -> Self {
        ProjectError::Io {
            path: path.as_ref().to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Result alias for project store operations
pub type ProjectResult<T> = Result<T, ProjectError>;

//! Filesystem capability
//!
//! The store never touches the disk directly. It goes through a
//! [`FileSystem`], so the same project can live on the local disk or behind a
//! remote-addressed prefix.
//!
//! - [`LocalFileSystem`] - the host filesystem, writes are atomic
//! - [`MemoryFileSystem`] - an in-process tree with `/` separators
//! - [`RoutedFileSystem`] - picks one of the above by path prefix

mod local;
mod memory;
mod routed;

use std::io;
use std::path::{Path, PathBuf};

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;
pub use routed::RoutedFileSystem;

/// Operations the store needs from a filesystem
pub trait FileSystem: Send + Sync {
    /// Whether a file or directory exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace a file's content, creating parent directories as needed
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Entries directly below a directory
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Join a relative path onto a base
    fn join(&self, base: &Path, relative: &Path) -> PathBuf {
        base.join(relative)
    }

    /// Split a path into its directory and file name
    fn split(&self, path: &Path) -> (PathBuf, String) {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (dir, name)
    }
}

//! Prefix based dispatch between filesystems

use std::io;
use std::path::{Path, PathBuf};

use super::{FileSystem, LocalFileSystem};
use crate::project::StoreConfig;

/// Sends each path to the filesystem registered for its prefix
///
/// Paths that match no route go to the default (local) filesystem.
pub struct RoutedFileSystem {
    default: Box<dyn FileSystem>,
    routes: Vec<(String, Box<dyn FileSystem>)>,
}

impl Default for RoutedFileSystem {
    fn default() -> Self {
        Self::new(Box::new(LocalFileSystem))
    }
}

impl RoutedFileSystem {
    /// Router with a fallback filesystem and no routes
    pub fn new(default: Box<dyn FileSystem>) -> Self {
        Self {
            default,
            routes: Vec::new(),
        }
    }

    /// Local disk plus `remote` behind the configured remote prefix
    pub fn with_remote(config: &StoreConfig, remote: Box<dyn FileSystem>) -> Self {
        Self::default().with_route(config.remote_prefix.clone(), remote)
    }

    /// Route every path starting with `prefix` to `fs`
    ///
    /// The longest matching prefix wins.
    pub fn with_route(mut self, prefix: impl Into<String>, fs: Box<dyn FileSystem>) -> Self {
        self.routes.push((prefix.into(), fs));
        self.routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Whether `path` is served by a routed (non-default) filesystem
    pub fn is_routed(&self, path: &Path) -> bool {
        self.route_index(path).is_some()
    }

    fn route_index(&self, path: &Path) -> Option<usize> {
        let text = path.to_string_lossy();
        self.routes
            .iter()
            .position(|(prefix, _)| text.starts_with(prefix.as_str()))
    }

    fn select(&self, path: &Path) -> &dyn FileSystem {
        match self.route_index(path) {
            Some(i) => self.routes[i].1.as_ref(),
            None => self.default.as_ref(),
        }
    }
}

impl FileSystem for RoutedFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.select(path).exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.select(path).read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.select(path).write(path, data)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.select(path).list_dir(path)
    }

    fn join(&self, base: &Path, relative: &Path) -> PathBuf {
        self.select(base).join(base, relative)
    }

    fn split(&self, path: &Path) -> (PathBuf, String) {
        self.select(path).split(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_prefix_selects_remote() {
        let remote = MemoryFileSystem::new();
        remote.insert("remote://host/p/a.py", "print()");
        let fs = RoutedFileSystem::new(Box::new(MemoryFileSystem::new()))
            .with_route("remote://", Box::new(remote));

        assert!(fs.is_routed(Path::new("remote://host/p/a.py")));
        assert!(fs.exists(Path::new("remote://host/p/a.py")));
        assert!(!fs.exists(Path::new("/host/p/a.py")));
    }

    #[test]
    fn test_remote_prefix_from_config() {
        let fs = RoutedFileSystem::with_remote(&StoreConfig::default(), Box::new(MemoryFileSystem::new()));
        assert!(fs.is_routed(Path::new("remote://host/p")));
        assert!(!fs.is_routed(Path::new("/host/p")));
    }

    #[test]
    fn test_unrouted_goes_to_default() {
        let local = MemoryFileSystem::new();
        local.insert("/work/a.py", "");
        let fs = RoutedFileSystem::new(Box::new(local))
            .with_route("remote://", Box::new(MemoryFileSystem::new()));

        assert!(!fs.is_routed(Path::new("/work/a.py")));
        assert!(fs.exists(Path::new("/work/a.py")));
    }
}

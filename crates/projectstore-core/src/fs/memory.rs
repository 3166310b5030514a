//! In-process filesystem
//!
//! Keeps file contents in a map keyed by `/`-separated path. Used behind the
//! remote prefix when no real remote backend is attached, and in tests.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::FileSystem;
use crate::project::paths;

/// A filesystem that only exists in memory
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    read_only: bool,
}

impl MemoryFileSystem {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// A filesystem that rejects every write
    pub fn read_only() -> Self {
        Self {
            files: Mutex::default(),
            read_only: true,
        }
    }

    /// Create or replace a file, bypassing the read-only switch
    pub fn insert(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(key(path.as_ref()), data.into());
        }
    }

    /// Delete a file
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .lock()
            .map(|mut files| files.remove(&key(path.as_ref())).is_some())
            .unwrap_or(false)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|e| io::Error::other(format!("memory filesystem lock poisoned: {e}")))
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let key = key(path);
        let dir_prefix = format!("{key}/");
        self.lock()
            .map(|files| {
                files.contains_key(&key) || files.keys().any(|k| k.starts_with(&dir_prefix))
            })
            .unwrap_or(false)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lock()?.get(&key(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such file: {}", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Permission denied",
            ));
        }
        self.lock()?.insert(key(path), data.to_vec());
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let dir_prefix = format!("{}/", key(path));
        let files = self.lock()?;
        let mut names: Vec<&str> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&dir_prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest))
            .collect();
        names.dedup();
        if names.is_empty() && !files.contains_key(&key(path)) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No such directory: {}", path.display()),
            ));
        }
        Ok(names.into_iter().map(|n| path.join(n)).collect())
    }
}

fn key(path: &Path) -> String {
    paths::to_persisted(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("remote://host/p/demo.epj"), b"{}").unwrap();
        assert!(fs.exists(Path::new("remote://host/p/demo.epj")));
        assert!(fs.exists(Path::new("remote://host/p")));
        assert_eq!(fs.read(Path::new("remote://host/p/demo.epj")).unwrap(), b"{}");
    }

    #[test]
    fn test_list_dir_collapses_subdirs() {
        let fs = MemoryFileSystem::new();
        fs.insert("/p/a.py", "");
        fs.insert("/p/pkg/b.py", "");
        fs.insert("/p/pkg/c.py", "");

        let entries = fs.list_dir(Path::new("/p")).unwrap();
        assert_eq!(entries, vec![PathBuf::from("/p/a.py"), PathBuf::from("/p/pkg")]);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let fs = MemoryFileSystem::read_only();
        let err = fs.write(Path::new("/p/x"), b"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_missing_file() {
        let fs = MemoryFileSystem::new();
        assert_eq!(
            fs.read(Path::new("/nope")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}

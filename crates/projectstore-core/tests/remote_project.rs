//! Tests for projects living behind the remote prefix

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use projectstore_core::fs::{FileSystem, MemoryFileSystem, RoutedFileSystem};
    use projectstore_core::project::{ProjectStore, StoreConfig, SOURCES};
    use projectstore_core::vcs::{StatusCache, VcsStatus};
    use std::path::{Path, PathBuf};

    const PROJECT_FILE: &str = "remote://host/proj/demo.epj";

    fn remote_store(remote: MemoryFileSystem) -> ProjectStore {
        let config = StoreConfig::default();
        let fs = RoutedFileSystem::with_remote(&config, Box::new(remote));
        ProjectStore::new(config, Box::new(fs))
    }

    #[test]
    fn test_open_remote_project_prunes_through_router() {
        let remote = MemoryFileSystem::new();
        remote.insert(
            PROJECT_FILE,
            r#"{"project": {"SOURCES": ["pkg/a.py", "pkg/gone.py"], "OTHERS": []}}"#,
        );
        remote.insert("remote://host/proj/pkg/a.py", "print('hi')\n");

        let mut store = remote_store(remote);
        store.open(PROJECT_FILE).unwrap();

        assert_eq!(
            store.list_files(SOURCES).unwrap(),
            vec![Path::new("pkg").join("a.py")]
        );
        assert!(store.is_dirty());
        assert_eq!(store.name(), "demo");
    }

    #[test]
    fn test_remote_absolute_paths_are_made_relative() {
        let mut store = remote_store(MemoryFileSystem::new());
        store.create("remote://host/proj", PROJECT_FILE).unwrap();

        assert!(store.add_file("remote://host/proj/lib/util.py", None).unwrap());
        assert_eq!(store.category_of("lib/util.py"), Some(SOURCES));
        assert!(store.add_file("remote://other/lib/x.py", None).is_err());
    }

    #[test]
    fn test_save_remote_project() {
        let mut store = remote_store(MemoryFileSystem::new());
        store.create("remote://host/proj", PROJECT_FILE).unwrap();
        store.add_file("main.py", None).unwrap();
        store.save().unwrap();
        assert!(!store.is_dirty());

        let bytes = store.serialize().unwrap();
        let record = store.deserialize(&bytes).unwrap();
        assert_eq!(&record, store.record());
    }

    #[test]
    fn test_local_paths_bypass_remote() {
        let local = MemoryFileSystem::new();
        local.insert("/work/a.py", "");
        let fs = RoutedFileSystem::new(Box::new(local))
            .with_route("remote://", Box::new(MemoryFileSystem::new()));

        assert!(fs.exists(Path::new("/work/a.py")));
        assert!(!fs.exists(Path::new("remote://work/a.py")));
    }

    #[test]
    fn test_status_cache_for_project_files() {
        let mut cache = StatusCache::new();
        let output = "\
M       pkg/a.py
?       scratch.py
!       pkg/gone.py
";
        assert_eq!(cache.extend_from_status_output(output), 3);
        assert_eq!(cache.get(&PathBuf::from("pkg/a.py")), Some(VcsStatus::Modified));
        assert_eq!(cache.get(Path::new("pkg/gone.py")), Some(VcsStatus::Missing));
        assert_eq!(cache.remove(Path::new("scratch.py")), Some(VcsStatus::Unversioned));
        assert_eq!(cache.len(), 2);
    }
}

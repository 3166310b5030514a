//! Tests for project store behavior: membership, dirty flag and persistence

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use projectstore_core::fs::{LocalFileSystem, MemoryFileSystem};
    use projectstore_core::project::{
        CategoryMeta, Classification, FileTypeRules, ProjectError, ProjectEvent, ProjectStore,
        Reassignment, ScalarKey, StoreConfig, FORMS, OTHERS, SOURCES, TRANSLATIONS,
    };
    use serde_json::json;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    /// Route store logs to the test output; `RUST_LOG=debug` shows them
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn memory_store() -> ProjectStore {
        ProjectStore::new(StoreConfig::default(), Box::new(MemoryFileSystem::new()))
            .with_standard_categories()
    }

    fn local_store() -> ProjectStore {
        ProjectStore::new(StoreConfig::default(), Box::new(LocalFileSystem)).with_standard_categories()
    }

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_no_duplicate_membership() {
        let mut store = memory_store();
        store.add_file("a.py", None).unwrap();
        store.add_file("a.py", Some(OTHERS)).unwrap();
        store.add_file("b.ui", None).unwrap();
        store.rename_path("b.ui", "a.py").unwrap();
        store.add_file("a.py", Some(SOURCES)).unwrap();

        let all: Vec<(&str, &Path)> = store.all_files().collect();
        let unique: HashSet<&Path> = all.iter().map(|(_, p)| *p).collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(all, vec![(SOURCES, Path::new("a.py"))]);
    }

    #[test]
    fn test_add_is_idempotent_and_dirties_once() {
        let mut store = memory_store();
        let events = store.subscribe();

        assert!(store.add_file("pkg/a.py", None).unwrap());
        assert!(!store.add_file("pkg/a.py", None).unwrap());
        assert!(!store.add_file("pkg/./a.py", None).unwrap());

        let dirty_events = events
            .try_iter()
            .filter(|e| matches!(e, ProjectEvent::DirtyChanged(true)))
            .count();
        assert_eq!(dirty_events, 1);
        assert_eq!(store.list_files(SOURCES).unwrap(), paths(&["pkg/a.py"]));
    }

    #[test]
    fn test_rename_preserves_category() {
        let mut store = memory_store();
        store.add_file("view.ui", None).unwrap();
        assert_eq!(store.category_of("view.ui"), Some(FORMS));

        assert!(store.rename_path("view.ui", "view.py").unwrap());
        assert_eq!(store.category_of("view.py"), Some(FORMS));
        assert!(!store.is_tracked("view.ui"));
    }

    #[test]
    fn test_rename_untracked_is_noop() {
        let mut store = memory_store();
        assert!(!store.rename_path("nothing.py", "other.py").unwrap());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_rename_publishes_event() {
        let mut store = memory_store();
        store.add_file("a.py", None).unwrap();
        let events = store.subscribe();

        store.rename_path("a.py", "b.py").unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            ProjectEvent::FileRenamed {
                category: SOURCES.to_string(),
                from: PathBuf::from("a.py"),
                to: PathBuf::from("b.py"),
            }
        );
    }

    #[test]
    fn test_unregister_then_list_fails() {
        let mut store = memory_store();
        store.add_file("proto/api.proto", None).unwrap();
        assert!(store.unregister_category("PROTOCOLS"));

        assert_eq!(
            store.list_files("PROTOCOLS").unwrap_err(),
            ProjectError::UnknownCategory("PROTOCOLS".to_string())
        );
        assert!(!store.is_tracked("proto/api.proto"));
        // rules pointing at the category go with it
        assert_eq!(store.classify("api.proto"), Classification::Ignore);
    }

    #[test]
    fn test_register_duplicate_category() {
        let mut store = memory_store();
        let err = store
            .register_category(SOURCES, CategoryMeta::new("Sources", ["*.py"]))
            .unwrap_err();
        assert_eq!(err, ProjectError::DuplicateCategory(SOURCES.to_string()));
    }

    #[test]
    fn test_persist_clears_dirty_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = local_store();
        store.create(dir.path(), dir.path().join("demo.epj")).unwrap();
        store.set_scalar(ScalarKey::Description, "demo project");
        assert!(store.is_dirty());

        store.save().unwrap();
        assert!(!store.is_dirty());
        assert!(dir.path().join("demo.epj").exists());
    }

    #[test]
    fn test_persist_failure_keeps_dirty() {
        let mut store = ProjectStore::new(StoreConfig::default(), Box::new(MemoryFileSystem::read_only()));
        store.create("/p", "/p/demo.epj").unwrap();
        store.add_file("a.py", None).unwrap();

        let err = store.save().unwrap_err();
        assert_eq!(
            err,
            ProjectError::Io {
                path: PathBuf::from("/p/demo.epj"),
                reason: "Permission denied".to_string(),
            }
        );
        assert!(store.is_dirty());
    }

    #[test]
    fn test_end_to_end_roundtrip() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let project_file = dir.path().join("demo.epj");

        let mut store = ProjectStore::new(StoreConfig::default(), Box::new(LocalFileSystem));
        store.create(dir.path(), &project_file).unwrap();

        // SOURCES is always present; registering it again is reported only
        let err = store
            .register_category(SOURCES, CategoryMeta::new("Sources", ["*.py"]))
            .unwrap_err();
        assert!(matches!(err, ProjectError::DuplicateCategory(_)));

        store.add_file("src/a.py", None).unwrap();
        store.rename_path("src/a.py", "src/b.py").unwrap();
        assert_eq!(store.list_files(SOURCES).unwrap(), paths(&["src/b.py"]));
        assert!(store.is_dirty());

        store.persist(&project_file).unwrap();
        assert!(!store.is_dirty());

        let text = std::fs::read_to_string(&project_file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["project"][SOURCES], json!(["src/b.py"]));
        assert_eq!(json["header"]["comment"], "Project file for project demo");

        let mut fresh = ProjectStore::new(StoreConfig::default(), Box::new(LocalFileSystem));
        fresh.load(&project_file).unwrap();
        assert_eq!(fresh.list_files(SOURCES).unwrap(), paths(&["src/b.py"]));
        assert_eq!(fresh.record(), store.record());
        assert!(!fresh.is_dirty());
    }

    #[test]
    fn test_roundtrip_keeps_scalars_and_rules() {
        let dir = tempfile::tempdir().unwrap();
        let project_file = dir.path().join("rules.epj");

        let mut store = local_store();
        store.create(dir.path(), &project_file).unwrap();
        store.set_scalar(ScalarKey::MainScript, "app/main.py");
        store.set_scalar("CUSTOM_SETTING", json!({"nested": [1, 2, 3]}));
        store
            .set_file_type_rule("generated_*.py", Classification::Ignore)
            .unwrap();
        store.add_file("app/main.py", None).unwrap();
        store.add_file("ui/dialog.ui", None).unwrap();
        store.save().unwrap();

        let mut fresh = local_store();
        fresh.load(&project_file).unwrap();

        assert_eq!(fresh.scalar_str(ScalarKey::MainScript), store.scalar_str(ScalarKey::MainScript));
        assert_eq!(fresh.scalar("CUSTOM_SETTING", json!(null)), json!({"nested": [1, 2, 3]}));
        assert_eq!(fresh.file_type_rules(), store.file_type_rules());
        assert_eq!(fresh.list_files(FORMS).unwrap(), paths(&["ui/dialog.ui"]));
        assert_eq!(fresh.classify("generated_stub.py"), Classification::Ignore);
    }

    #[test]
    fn test_malformed_load_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.epj");
        let bad = dir.path().join("bad.epj");
        std::fs::write(&bad, "{ this is not json").unwrap();

        let mut store = local_store();
        store.create(dir.path(), &good).unwrap();
        store.add_file("a.py", None).unwrap();
        let before = store.record().clone();

        let err = store.load(&bad).unwrap_err();
        assert!(matches!(err, ProjectError::MalformedProjectFile(_)));
        assert_eq!(store.record(), &before);
        assert_eq!(store.project_file(), Some(good.as_path()));
    }

    #[test]
    fn test_load_missing_file() {
        let mut store = memory_store();
        let err = store.load("/nowhere/demo.epj").unwrap_err();
        assert!(matches!(err, ProjectError::Io { .. }));
    }

    #[test]
    fn test_open_prunes_missing_files() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let project_file = dir.path().join("demo.epj");
        std::fs::write(dir.path().join("a.py"), "").unwrap();

        let mut store = local_store();
        store.create(dir.path(), &project_file).unwrap();
        store.add_file("a.py", None).unwrap();
        store.add_file("gone.py", None).unwrap();
        store.add_file("i18n/app_de.ts", None).unwrap();
        store.save().unwrap();

        let mut reopened = local_store();
        reopened.open(&project_file).unwrap();

        assert_eq!(reopened.list_files(SOURCES).unwrap(), paths(&["a.py"]));
        assert_eq!(
            reopened.list_files(TRANSLATIONS).unwrap(),
            vec![Path::new("i18n").join("app_de.ts")]
        );
        assert!(reopened.is_dirty());
    }

    #[test]
    fn test_save_as_moves_root() {
        let dir = tempfile::tempdir().unwrap();
        let copy_dir = dir.path().join("copy");

        let mut store = local_store();
        store.create(dir.path(), dir.path().join("demo.epj")).unwrap();
        store.save_as(copy_dir.join("renamed.epj")).unwrap();

        assert_eq!(store.project_root(), Some(copy_dir.as_path()));
        assert_eq!(store.name(), "renamed");
        let text = std::fs::read_to_string(copy_dir.join("renamed.epj")).unwrap();
        assert!(text.contains("Project file for project renamed"));
    }

    #[test]
    fn test_reconcile_moves_only_reclassified_files() {
        let mut store = memory_store();
        store.add_file("pkg/core.py", None).unwrap();
        store.add_file("tests/test_core.py", None).unwrap();
        store.add_file("notes.py", Some(OTHERS)).unwrap();

        let old_rules = store.file_type_rules().clone();
        let mut new_rules = old_rules.clone();
        new_rules
            .set("tests/*.py", Classification::category(OTHERS))
            .unwrap();

        let moves = store.reconcile_categories(&old_rules, &new_rules);

        assert_eq!(
            moves,
            vec![Reassignment {
                path: Path::new("tests").join("test_core.py"),
                from: SOURCES.to_string(),
                to: OTHERS.to_string(),
            }]
        );
        assert_eq!(store.category_of("pkg/core.py"), Some(SOURCES));
        assert_eq!(store.category_of("notes.py"), Some(OTHERS));
        assert_eq!(store.file_type_rules(), &new_rules);
    }

    #[test]
    fn test_reconcile_to_ignore_keeps_file() {
        let mut store = memory_store();
        store.add_file("build.py", None).unwrap();

        let old_rules = store.file_type_rules().clone();
        let mut new_rules = old_rules.clone();
        new_rules.set("build.py", Classification::Ignore).unwrap();

        assert!(store.reconcile_categories(&old_rules, &new_rules).is_empty());
        assert_eq!(store.category_of("build.py"), Some(SOURCES));
    }

    #[test]
    fn test_replace_file_type_rules() {
        let mut store = memory_store();
        store.add_file("icons.qrc", None).unwrap();
        store.add_file("readme.txt", None).unwrap();

        let mut rules = FileTypeRules::new();
        rules.set("*.qrc", Classification::category(OTHERS)).unwrap();
        rules.set("*.txt", Classification::category(OTHERS)).unwrap();
        let moves = store.replace_file_type_rules(rules);

        assert_eq!(moves.len(), 1);
        assert_eq!(store.category_of("icons.qrc"), Some(OTHERS));
        assert_eq!(store.category_of("readme.txt"), Some(OTHERS));
    }

    #[test]
    fn test_later_rule_wins() {
        let mut store = memory_store();
        store
            .set_file_type_rule("setup.py", Classification::category(OTHERS))
            .unwrap();
        assert_eq!(store.classify("setup.py"), Classification::category(OTHERS));
        assert_eq!(store.classify("pkg/setup_helpers.py"), Classification::category(SOURCES));
        assert_eq!(store.classify("__pycache__"), Classification::Ignore);
    }

    #[test]
    fn test_apply_default_file_types() {
        let mut store = memory_store();
        store
            .set_file_type_rule("*.py", Classification::category(OTHERS))
            .unwrap();
        assert!(store.apply_default_file_types());
        assert_eq!(store.classify("a.py"), Classification::category(SOURCES));
        assert!(!store.apply_default_file_types());
    }

    #[test]
    fn test_prune_unknown_category() {
        let mut store = memory_store();
        assert!(matches!(
            store.prune_missing_files("NOPE"),
            Err(ProjectError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_save_and_close_events() {
        let mut store = memory_store();
        store.create("/p", "/p/demo.epj").unwrap();
        let events = store.subscribe();

        store.save().unwrap();
        store.close();

        let received: Vec<ProjectEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ProjectEvent::DirtyChanged(false),
                ProjectEvent::Saved(PathBuf::from("/p/demo.epj")),
                ProjectEvent::Closed,
            ]
        );
    }
}

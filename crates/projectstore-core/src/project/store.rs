//! The project store
//!
//! [`ProjectStore`] owns the record of one open project: which files belong
//! to it (by category), its scalar configuration and its file type rules. It
//! reads and writes the project file through a [`FileSystem`] and tells
//! subscribers about every change.
//!
//! The store is meant to be driven from a single thread. Only `persist`,
//! `load`, `open` and `prune_missing_files` touch the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use crossbeam_channel::Receiver;
use indexmap::IndexSet;
use serde_json::{Map, Value};

use super::category::{CategoryMeta, CategoryRegistry};
use super::config::StoreConfig;
use super::error::{ProjectError, ProjectResult};
use super::events::{EventBus, ProjectEvent};
use super::file_format::{self, ProjectHeader, FILETYPES_KEY};
use super::filetypes::{Classification, FileTypeRules};
use super::paths;
use super::record::{ProjectRecord, ScalarKey};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::vcs::{VcsBinding, NO_VCS};

/// A file that changed category during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// Project-relative path of the file
    pub path: PathBuf,
    /// Category the file was in
    pub from: String,
    /// Category the file is in now
    pub to: String,
}

/// Single source of truth for the files and settings of a project
pub struct ProjectStore {
    config: StoreConfig,
    fs: Box<dyn FileSystem>,
    categories: CategoryRegistry,
    record: ProjectRecord,
    dirty: bool,
    project_root: Option<PathBuf>,
    project_file: Option<PathBuf>,
    known_subdirs: IndexSet<PathBuf>,
    events: EventBus,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new(StoreConfig::default(), Box::new(LocalFileSystem))
    }
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("project_file", &self.project_file)
            .field("dirty", &self.dirty)
            .field("categories", &self.categories.names().collect::<Vec<_>>())
            .field("files", &self.record.file_count())
            .finish()
    }
}

impl ProjectStore {
    /// Create a closed store with the built-in categories
    pub fn new(config: StoreConfig, fs: Box<dyn FileSystem>) -> Self {
        let categories = CategoryRegistry::new();
        let record = ProjectRecord::new(&categories);
        Self {
            config,
            fs,
            categories,
            record,
            dirty: false,
            project_root: None,
            project_file: None,
            known_subdirs: IndexSet::new(),
            events: EventBus::new(),
        }
    }

    /// Replace the category registry, resetting the record to its defaults
    pub fn with_categories(mut self, categories: CategoryRegistry) -> Self {
        self.record = ProjectRecord::new(&categories);
        self.categories = categories;
        self
    }

    /// Convenience for [`CategoryRegistry::with_standard_categories`]
    pub fn with_standard_categories(self) -> Self {
        self.with_categories(CategoryRegistry::with_standard_categories())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a new, unsaved project
    pub fn create(
        &mut self,
        project_root: impl Into<PathBuf>,
        project_file: impl Into<PathBuf>,
    ) -> ProjectResult<()> {
        self.reset();
        let project_file = project_file.into();
        self.project_root = Some(project_root.into());
        self.project_file = Some(project_file.clone());
        tracing::info!("Created project {}", project_file.display());
        self.events.publish(ProjectEvent::Opened(project_file));
        self.mark_dirty(true);
        Ok(())
    }

    /// Load a project file and drop files that no longer exist
    ///
    /// Categories whose metadata opts out of pruning (translations, which
    /// are checked separately) are left alone.
    pub fn open(&mut self, project_file: impl AsRef<Path>) -> ProjectResult<()> {
        self.load(project_file)?;

        if self.config.prune_on_open {
            let prunable: Vec<String> = self
                .categories
                .iter()
                .filter(|(_, meta)| meta.prune_on_open)
                .map(|(name, _)| name.to_string())
                .collect();
            for name in prunable {
                let removed = self.prune_missing_files(&name)?;
                if removed > 0 {
                    tracing::info!("Removed {removed} missing file(s) from {name}");
                }
            }
        }
        Ok(())
    }

    /// Close the project and reset to defaults
    ///
    /// Unsaved changes are discarded; returns whether there were any so the
    /// caller can tell. Check [`ProjectStore::is_dirty`] and save first to
    /// keep them.
    pub fn close(&mut self) -> bool {
        let had_changes = self.dirty;
        if had_changes {
            tracing::warn!("Closing project with unsaved changes");
        }
        self.reset();
        self.events.publish(ProjectEvent::Closed);
        had_changes
    }

    /// Whether a project was created or opened
    pub fn is_open(&self) -> bool {
        self.project_file.is_some()
    }

    /// Root directory of the project
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Location of the project file
    pub fn project_file(&self) -> Option<&Path> {
        self.project_file.as_deref()
    }

    /// Project name, derived from the project file name
    pub fn name(&self) -> String {
        self.project_file
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Store settings
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current record
    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }

    /// Listen for change notifications
    pub fn subscribe(&mut self) -> Receiver<ProjectEvent> {
        self.events.subscribe()
    }

    fn reset(&mut self) {
        self.record = ProjectRecord::new(&self.categories);
        self.project_root = None;
        self.project_file = None;
        self.known_subdirs.clear();
        self.dirty = false;
    }

    // ------------------------------------------------------------------
    // Dirty flag
    // ------------------------------------------------------------------

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the unsaved-changes flag
    pub fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.events.publish(ProjectEvent::DirtyChanged(dirty));
        }
    }

    fn mark_dirty(&mut self, mark: bool) {
        if mark {
            self.set_dirty(true);
        }
    }

    // ------------------------------------------------------------------
    // Scalar configuration
    // ------------------------------------------------------------------

    /// Scalar value, or `default` if the key is unknown
    pub fn scalar(&self, key: impl AsRef<str>, default: Value) -> Value {
        self.record.scalar(key).cloned().unwrap_or(default)
    }

    /// Scalar value as a string slice
    pub fn scalar_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.record.scalar(key).and_then(Value::as_str)
    }

    /// Scalar value as a bool
    pub fn scalar_bool(&self, key: impl AsRef<str>) -> Option<bool> {
        self.record.scalar(key).and_then(Value::as_bool)
    }

    /// Overwrite a scalar, marking the project dirty if the value changed
    ///
    /// Returns whether the value changed. No validation happens here.
    pub fn set_scalar(&mut self, key: impl AsRef<str>, value: impl Into<Value>) -> bool {
        self.write_scalar(key.as_ref(), value.into(), true)
    }

    /// Overwrite a scalar without touching the dirty flag
    pub fn set_scalar_untracked(&mut self, key: impl AsRef<str>, value: impl Into<Value>) -> bool {
        self.write_scalar(key.as_ref(), value.into(), false)
    }

    fn write_scalar(&mut self, key: &str, value: Value, mark_dirty: bool) -> bool {
        if key == FILETYPES_KEY || self.categories.contains(key) {
            tracing::warn!("Refusing to overwrite {key} through the scalar interface");
            return false;
        }
        if self.record.scalars.get(key) == Some(&value) {
            return false;
        }
        self.record.scalars.insert(key.to_string(), value);
        self.events.publish(ProjectEvent::ScalarChanged(key.to_string()));
        self.mark_dirty(mark_dirty);
        true
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Add a file category
    ///
    /// A list stored under the same name in a loaded project file (kept as
    /// a scalar while nobody claimed it) becomes the category's file list.
    pub fn register_category(&mut self, name: &str, meta: CategoryMeta) -> ProjectResult<()> {
        if let Err(err) = self.categories.register(name, meta) {
            tracing::warn!("{err}");
            return Err(err);
        }

        let files = match self.record.scalars.remove(name) {
            Some(value) => match file_format::parse_file_list(name, value.clone(), &self.record) {
                Ok(files) => files,
                Err(err) => {
                    tracing::warn!("Keeping {name} as plain configuration: {err}");
                    self.record.scalars.insert(name.to_string(), value);
                    IndexSet::new()
                }
            },
            None => IndexSet::new(),
        };
        for path in &files {
            self.note_subdir(path);
        }
        self.record.files.insert(name.to_string(), files);

        tracing::debug!("Registered file category {name}");
        self.events
            .publish(ProjectEvent::CategoryRegistered(name.to_string()));
        Ok(())
    }

    /// Remove a file category together with its files
    ///
    /// Silently does nothing for unknown categories. The built-in categories
    /// cannot be removed. Returns whether a category was removed.
    pub fn unregister_category(&mut self, name: &str) -> bool {
        match self.categories.unregister(name) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                tracing::warn!("{err}");
                return false;
            }
        }

        let purged = self
            .record
            .files
            .shift_remove(name)
            .map_or(0, |files| files.len());
        let stale_rules = self.record.file_types.remove_category(name);
        tracing::debug!("Unregistered file category {name}, dropped {purged} file(s)");
        self.events
            .publish(ProjectEvent::CategoryUnregistered(name.to_string()));
        if stale_rules > 0 {
            self.events.publish(ProjectEvent::FileTypesChanged);
        }
        // the category's key leaves the saved file even when it held no files
        self.mark_dirty(true);
        true
    }

    /// Registered category names in registration order
    pub fn categories(&self) -> Vec<&str> {
        self.categories.names().collect()
    }

    /// Metadata of a registered category
    pub fn category_meta(&self, name: &str) -> Option<&CategoryMeta> {
        self.categories.get(name)
    }

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    /// Category a file would be filed under
    pub fn classify(&self, path: impl AsRef<Path>) -> Classification {
        let path = path.as_ref();
        let relative = self
            .relative(path)
            .unwrap_or_else(|_| PathBuf::from(paths::file_name(path)));
        self.classify_with(&self.record.file_types, &relative)
    }

    fn classify_with(&self, rules: &FileTypeRules, relative: &Path) -> Classification {
        if let Some(found) = rules.classify(relative) {
            return found.clone();
        }
        match &self.config.fallback_category {
            Some(name) if self.categories.contains(name) => Classification::category(name.clone()),
            _ => Classification::Ignore,
        }
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Add a file, classifying it when no category is given
    ///
    /// Files classified as ignored are skipped. Returns whether the file was
    /// inserted (adding a tracked file again is a no-op).
    pub fn add_file(&mut self, path: impl AsRef<Path>, category: Option<&str>) -> ProjectResult<bool> {
        self.insert_file(path.as_ref(), category, true)
    }

    /// Like [`ProjectStore::add_file`] but leaves the dirty flag alone
    pub fn add_file_untracked(
        &mut self,
        path: impl AsRef<Path>,
        category: Option<&str>,
    ) -> ProjectResult<bool> {
        self.insert_file(path.as_ref(), category, false)
    }

    fn insert_file(&mut self, path: &Path, category: Option<&str>, mark_dirty: bool) -> ProjectResult<bool> {
        let relative = self.relative(path)?;

        let target = match category {
            Some(name) if self.categories.contains(name) => name.to_string(),
            Some(name) => return Err(ProjectError::UnknownCategory(name.to_string())),
            None => match self.classify_with(&self.record.file_types, &relative) {
                Classification::Ignore => {
                    tracing::debug!("Ignoring {}", relative.display());
                    return Ok(false);
                }
                Classification::Category(name) if self.categories.contains(&name) => name,
                Classification::Category(name) => {
                    tracing::warn!(
                        "File type rule for {} names unregistered category {name}",
                        relative.display()
                    );
                    return Ok(false);
                }
            },
        };

        match self.record.category_of(&relative) {
            Some(current) if current == target => return Ok(false),
            Some(current) => {
                let current = current.to_string();
                self.detach(&current, &relative);
            }
            None => {}
        }

        self.attach(&target, relative);
        self.mark_dirty(mark_dirty);
        Ok(true)
    }

    /// Remove a file from whichever category holds it
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> bool {
        let Ok(relative) = self.relative(path.as_ref()) else {
            return false;
        };
        let Some(category) = self.record.category_of(&relative).map(str::to_string) else {
            return false;
        };
        self.detach(&category, &relative);
        self.mark_dirty(true);
        true
    }

    /// Rename a tracked file, keeping its category
    ///
    /// The new name is not re-classified: a file the user put in FORMS stays
    /// there even if its new extension says otherwise. Returns `Ok(false)` if
    /// `old_path` is not tracked.
    pub fn rename_path(
        &mut self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
    ) -> ProjectResult<bool> {
        let Ok(old_rel) = self.relative(old_path.as_ref()) else {
            return Ok(false);
        };
        let Some(category) = self.record.category_of(&old_rel).map(str::to_string) else {
            return Ok(false);
        };
        let new_rel = self.relative(new_path.as_ref())?;
        if new_rel == old_rel {
            return Ok(false);
        }

        self.move_tracked(&category, &old_rel, new_rel);
        self.mark_dirty(true);
        Ok(true)
    }

    /// Rename a directory, moving every tracked file below it
    ///
    /// Returns the number of files renamed.
    pub fn rename_directory(
        &mut self,
        old_dir: impl AsRef<Path>,
        new_dir: impl AsRef<Path>,
    ) -> ProjectResult<usize> {
        let old_rel = self.relative(old_dir.as_ref())?;
        let new_rel = self.relative(new_dir.as_ref())?;
        if old_rel == new_rel {
            return Ok(0);
        }

        let moves: Vec<(String, PathBuf, PathBuf)> = self
            .files_below(&old_rel)
            .into_iter()
            .filter_map(|(category, path)| {
                let rest = path.strip_prefix(&old_rel).ok()?.to_path_buf();
                Some((category, path, new_rel.join(rest)))
            })
            .collect();
        // taken before the moves, which note directories under the new name
        let renamed_dirs: Vec<PathBuf> = self
            .known_subdirs
            .iter()
            .filter(|d| d.starts_with(&old_rel))
            .cloned()
            .collect();

        for (category, from, to) in &moves {
            self.move_tracked(category, from, to.clone());
        }

        for dir in renamed_dirs {
            self.known_subdirs.shift_remove(&dir);
            if let Ok(rest) = dir.strip_prefix(&old_rel) {
                self.known_subdirs.insert(new_rel.join(rest));
            }
        }

        self.mark_dirty(!moves.is_empty());
        Ok(moves.len())
    }

    /// Untrack every file below a directory, returns how many were removed
    pub fn remove_directory(&mut self, dir: impl AsRef<Path>) -> usize {
        let Ok(dir_rel) = self.relative(dir.as_ref()) else {
            return 0;
        };
        let doomed = self.files_below(&dir_rel);
        for (category, path) in &doomed {
            self.detach(category, path);
        }
        self.known_subdirs.retain(|d| !d.starts_with(&dir_rel));
        self.mark_dirty(!doomed.is_empty());
        doomed.len()
    }

    /// Files of one category, project-relative
    pub fn list_files(&self, category: &str) -> ProjectResult<Vec<PathBuf>> {
        self.record
            .files(category)
            .map(|files| files.iter().cloned().collect())
            .ok_or_else(|| ProjectError::UnknownCategory(category.to_string()))
    }

    /// Every tracked file with its category
    pub fn all_files(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.record.files.iter().flat_map(|(category, files)| {
            files.iter().map(move |path| (category.as_str(), path.as_path()))
        })
    }

    /// Category that currently holds `path`
    pub fn category_of(&self, path: impl AsRef<Path>) -> Option<&str> {
        let relative = self.relative(path.as_ref()).ok()?;
        self.record.category_of(&relative)
    }

    /// Whether `path` belongs to the project
    pub fn is_tracked(&self, path: impl AsRef<Path>) -> bool {
        self.category_of(path).is_some()
    }

    /// Directories that contain tracked files, in discovery order
    pub fn known_subdirs(&self) -> impl Iterator<Item = &Path> {
        self.known_subdirs.iter().map(PathBuf::as_path)
    }

    /// Drop files of a category that no longer exist on disk
    ///
    /// Returns how many were removed.
    pub fn prune_missing_files(&mut self, category: &str) -> ProjectResult<usize> {
        let files = self.list_files(category)?;
        let root = self.project_root.clone().unwrap_or_default();

        let missing: Vec<PathBuf> = files
            .into_iter()
            .filter(|rel| !self.fs.exists(&self.fs.join(&root, rel)))
            .collect();
        for rel in &missing {
            tracing::debug!("Pruning missing file {}", rel.display());
            self.detach(category, rel);
        }
        self.mark_dirty(!missing.is_empty());
        Ok(missing.len())
    }

    /// Normalize a path against the project root
    fn relative(&self, path: &Path) -> ProjectResult<PathBuf> {
        let root = self.project_root.as_deref().unwrap_or(Path::new(""));
        paths::normalize_relative(root, path)
    }

    fn files_below(&self, dir: &Path) -> Vec<(String, PathBuf)> {
        self.all_files()
            .filter(|(_, path)| path.starts_with(dir) && *path != dir)
            .map(|(category, path)| (category.to_string(), path.to_path_buf()))
            .collect()
    }

    fn attach(&mut self, category: &str, relative: PathBuf) {
        self.note_subdir(&relative);
        if let Some(files) = self.record.files.get_mut(category) {
            files.insert(relative.clone());
        }
        self.events.publish(ProjectEvent::FileAdded {
            category: category.to_string(),
            path: relative,
        });
    }

    fn detach(&mut self, category: &str, relative: &Path) {
        let removed = self
            .record
            .files
            .get_mut(category)
            .is_some_and(|files| files.shift_remove(relative));
        if removed {
            self.events.publish(ProjectEvent::FileRemoved {
                category: category.to_string(),
                path: relative.to_path_buf(),
            });
        }
    }

    /// Move a tracked file to a new name within `category`
    fn move_tracked(&mut self, category: &str, from: &Path, to: PathBuf) {
        if let Some(files) = self.record.files.get_mut(category) {
            files.shift_remove(from);
        }
        if let Some(owner) = self.record.category_of(&to).map(str::to_string) {
            self.detach(&owner, &to);
        }
        self.note_subdir(&to);
        if let Some(files) = self.record.files.get_mut(category) {
            files.insert(to.clone());
        }
        self.events.publish(ProjectEvent::FileRenamed {
            category: category.to_string(),
            from: from.to_path_buf(),
            to,
        });
    }

    fn note_subdir(&mut self, relative: &Path) {
        if let Some(dir) = paths::parent_dir(relative) {
            self.known_subdirs.insert(dir);
        }
    }

    // ------------------------------------------------------------------
    // File type rules
    // ------------------------------------------------------------------

    /// Current file type rules
    pub fn file_type_rules(&self) -> &FileTypeRules {
        &self.record.file_types
    }

    /// Add or update one rule; existing files are not re-filed
    pub fn set_file_type_rule(
        &mut self,
        pattern: &str,
        classification: Classification,
    ) -> ProjectResult<bool> {
        let changed = self.record.file_types.set(pattern, classification)?;
        if changed {
            self.events.publish(ProjectEvent::FileTypesChanged);
            self.mark_dirty(true);
        }
        Ok(changed)
    }

    /// Remove one rule by pattern
    pub fn remove_file_type_rule(&mut self, pattern: &str) -> bool {
        let changed = self.record.file_types.remove(pattern);
        if changed {
            self.events.publish(ProjectEvent::FileTypesChanged);
            self.mark_dirty(true);
        }
        changed
    }

    /// Reset the rules to those derived from the registered categories
    pub fn apply_default_file_types(&mut self) -> bool {
        let defaults = FileTypeRules::from_categories(self.categories.iter());
        self.install_rules(defaults)
    }

    /// Install `new_rules` and re-file tracked files whose classification changed
    ///
    /// A file moves when the category `old_rules` gives it differs from the
    /// one `new_rules` gives it and the new one is a registered category.
    /// Files whose classification did not change stay where they are, even
    /// if the user filed them somewhere else by hand.
    pub fn reconcile_categories(
        &mut self,
        old_rules: &FileTypeRules,
        new_rules: &FileTypeRules,
    ) -> Vec<Reassignment> {
        self.install_rules(new_rules.clone());

        let tracked: Vec<(String, PathBuf)> = self
            .all_files()
            .map(|(category, path)| (category.to_string(), path.to_path_buf()))
            .collect();

        let mut moves = Vec::new();
        for (current, path) in tracked {
            let before = self.classify_with(old_rules, &path);
            let after = self.classify_with(new_rules, &path);
            if before == after {
                continue;
            }
            let Classification::Category(target) = after else {
                continue;
            };
            if target == current || !self.categories.contains(&target) {
                continue;
            }
            self.detach(&current, &path);
            self.attach(&target, path.clone());
            moves.push(Reassignment {
                path,
                from: current,
                to: target,
            });
        }

        if !moves.is_empty() {
            tracing::info!("Re-filed {} file(s) after file type change", moves.len());
        }
        self.mark_dirty(!moves.is_empty());
        moves
    }

    /// Replace the rule set wholesale and reconcile against the previous one
    pub fn replace_file_type_rules(&mut self, new_rules: FileTypeRules) -> Vec<Reassignment> {
        let old_rules = self.record.file_types.clone();
        self.reconcile_categories(&old_rules, &new_rules)
    }

    fn install_rules(&mut self, rules: FileTypeRules) -> bool {
        if self.record.file_types == rules {
            return false;
        }
        self.record.file_types = rules;
        self.events.publish(ProjectEvent::FileTypesChanged);
        self.mark_dirty(true);
        true
    }

    // ------------------------------------------------------------------
    // Lexer associations
    // ------------------------------------------------------------------

    /// Glob pattern -> language name, as stored
    pub fn lexer_associations(&self) -> BTreeMap<String, String> {
        self.record
            .scalar(ScalarKey::LexerAssocs)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Associate a glob pattern with a language
    pub fn set_lexer_association(&mut self, pattern: &str, language: &str) -> bool {
        let mut assocs = self.lexer_associations();
        assocs.insert(pattern.to_string(), language.to_string());
        self.write_lexer_associations(assocs)
    }

    /// Drop an association
    pub fn remove_lexer_association(&mut self, pattern: &str) -> bool {
        let mut assocs = self.lexer_associations();
        if assocs.remove(pattern).is_none() {
            return false;
        }
        self.write_lexer_associations(assocs)
    }

    fn write_lexer_associations(&mut self, assocs: BTreeMap<String, String>) -> bool {
        let map: Map<String, Value> = assocs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        self.set_scalar(ScalarKey::LexerAssocs, Value::Object(map))
    }

    // ------------------------------------------------------------------
    // VCS binding
    // ------------------------------------------------------------------

    /// The project's VCS binding, `None` if it is not under version control
    pub fn vcs_binding(&self) -> Option<VcsBinding> {
        let system = self.scalar_str(ScalarKey::Vcs)?;
        if system.is_empty() || system == NO_VCS {
            return None;
        }
        let options = self
            .record
            .scalar(ScalarKey::VcsOptions)
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let other_data = self
            .record
            .scalar(ScalarKey::VcsOtherData)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(VcsBinding {
            system: system.to_string(),
            options,
            other_data,
        })
    }

    /// Bind the project to a VCS, or unbind it with `None`
    pub fn set_vcs_binding(&mut self, binding: Option<VcsBinding>) -> bool {
        let binding = binding.unwrap_or_else(|| VcsBinding::new(NO_VCS));
        let options: Map<String, Value> = binding.options.into_iter().collect();
        let mut changed = self.set_scalar(ScalarKey::Vcs, binding.system);
        changed |= self.set_scalar(ScalarKey::VcsOptions, Value::Object(options));
        changed |= self.set_scalar(ScalarKey::VcsOtherData, Value::Object(binding.other_data));
        changed
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Render the current record as a project file
    pub fn serialize(&self) -> ProjectResult<Vec<u8>> {
        let header = ProjectHeader {
            comment: self.config.header_comment_for(&self.name()),
            saved: self
                .config
                .timestamp_file
                .then(|| Utc::now().to_rfc3339()),
        };
        file_format::serialize(&self.record, &header)
    }

    /// Parse a project file against the registered categories
    ///
    /// The store itself is not modified.
    pub fn deserialize(&self, bytes: &[u8]) -> ProjectResult<ProjectRecord> {
        file_format::deserialize(bytes, &self.categories).map(|(_, record)| record)
    }

    /// Write the project to `destination`
    ///
    /// Clears the dirty flag on success; on failure the flag stays set and
    /// the OS error message is returned.
    pub fn persist(&mut self, destination: impl AsRef<Path>) -> ProjectResult<()> {
        let destination = destination.as_ref();
        let bytes = self.serialize()?;
        if let Err(err) = self.fs.write(destination, &bytes) {
            tracing::warn!("Could not write {}: {err}", destination.display());
            return Err(ProjectError::io(destination, err));
        }
        tracing::info!("Saved project to {}", destination.display());
        self.set_dirty(false);
        self.events
            .publish(ProjectEvent::Saved(destination.to_path_buf()));
        Ok(())
    }

    /// Write the project back to its project file
    pub fn save(&mut self) -> ProjectResult<()> {
        let target = self.project_file.clone().ok_or(ProjectError::NoProjectFile)?;
        self.persist(target)
    }

    /// Write the project to a new file and make that the project file
    ///
    /// The project root follows the file to its new directory.
    pub fn save_as(&mut self, project_file: impl Into<PathBuf>) -> ProjectResult<()> {
        let project_file = project_file.into();
        let previous = self.project_file.replace(project_file.clone());
        if let Err(err) = self.persist(&project_file) {
            self.project_file = previous;
            return Err(err);
        }
        let (dir, _) = self.fs.split(&project_file);
        self.project_root = Some(dir);
        Ok(())
    }

    /// Replace the in-memory record with the content of `source`
    ///
    /// On any failure the current record is left untouched.
    pub fn load(&mut self, source: impl AsRef<Path>) -> ProjectResult<()> {
        let source = source.as_ref();
        let bytes = self
            .fs
            .read(source)
            .map_err(|err| ProjectError::io(source, err))?;
        let record = match self.deserialize(&bytes) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("Could not load {}: {err}", source.display());
                return Err(err);
            }
        };

        let (root, _) = self.fs.split(source);
        self.record = record;
        self.project_root = Some(root);
        self.project_file = Some(source.to_path_buf());
        self.known_subdirs = self
            .record
            .files
            .values()
            .flatten()
            .filter_map(|p| paths::parent_dir(p))
            .collect();
        self.set_dirty(false);

        tracing::info!(
            "Loaded project {} ({} files)",
            source.display(),
            self.record.file_count()
        );
        self.events
            .publish(ProjectEvent::Opened(source.to_path_buf()));
        Ok(())
    }
}

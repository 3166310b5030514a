//! File categories and their registry
//!
//! A category is a named bucket of project files sharing a role (sources,
//! forms, translations, ...). SOURCES and OTHERS always exist; everything else
//! is registered at runtime, typically by a collaborator that knows how to
//! handle that kind of file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{ProjectError, ProjectResult};

/// Category holding program sources
pub const SOURCES: &str = "SOURCES";
/// Catch-all category
pub const OTHERS: &str = "OTHERS";
/// Designer forms
pub const FORMS: &str = "FORMS";
/// Resource collections
pub const RESOURCES: &str = "RESOURCES";
/// Translation sources and compiled catalogs
pub const TRANSLATIONS: &str = "TRANSLATIONS";
/// Interface definition files
pub const INTERFACES: &str = "INTERFACES";
/// Protocol buffer definitions
pub const PROTOCOLS: &str = "PROTOCOLS";

const BUILTIN: [&str; 2] = [SOURCES, OTHERS];

/// Descriptive data attached to a category
///
/// The store keeps this verbatim; only `extensions` and `prune_on_open` are
/// consulted (for default file type rules and for pruning on open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMeta {
    /// User-facing label, e.g. "Sources"
    pub label: String,

    /// File dialog filter template, `{0}` is replaced by the extension list
    pub filter_template: String,

    /// Default glob patterns for files of this category
    pub extensions: Vec<String>,

    /// Whether missing files are dropped from this category on open
    #[serde(default = "default_prune_on_open")]
    pub prune_on_open: bool,
}

fn default_prune_on_open() -> bool {
    true
}

impl CategoryMeta {
    /// Create metadata with a label and default extensions
    pub fn new<I, S>(label: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label = label.into();
        Self {
            filter_template: format!("{label} Files ({{0}})"),
            label,
            extensions: extensions.into_iter().map(Into::into).collect(),
            prune_on_open: default_prune_on_open(),
        }
    }

    /// Builder-style switch for `prune_on_open`
    pub fn without_pruning(mut self) -> Self {
        self.prune_on_open = false;
        self
    }

    /// Expand the filter template with this category's extensions
    pub fn filter(&self) -> String {
        self.filter_template
            .replace("{0}", &self.extensions.join(" "))
    }
}

/// Registered categories in registration order
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    entries: IndexMap<String, CategoryMeta>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        let mut entries = IndexMap::new();
        entries.insert(
            SOURCES.to_string(),
            CategoryMeta::new("Sources", ["*.py", "*.pyw", "*.pyi"]),
        );
        entries.insert(OTHERS.to_string(), CategoryMeta::new("Others", ["*.txt", "*.md", "*.rst"]));
        Self { entries }
    }
}

impl CategoryRegistry {
    /// Registry holding only the built-in categories
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the categories a standard IDE project uses
    pub fn with_standard_categories() -> Self {
        let mut registry = Self::new();
        let standard = [
            (FORMS, CategoryMeta::new("Forms", ["*.ui"])),
            (RESOURCES, CategoryMeta::new("Resources", ["*.qrc"])),
            (
                TRANSLATIONS,
                CategoryMeta::new("Translations", ["*.ts", "*.qm"]).without_pruning(),
            ),
            (INTERFACES, CategoryMeta::new("Interfaces", ["*.idl"])),
            (PROTOCOLS, CategoryMeta::new("Protocols", ["*.proto"])),
        ];
        for (name, meta) in standard {
            registry.entries.insert(name.to_string(), meta);
        }
        registry
    }

    /// Add a category; fails if the name is taken
    pub fn register(&mut self, name: &str, meta: CategoryMeta) -> ProjectResult<()> {
        if self.entries.contains_key(name) {
            return Err(ProjectError::DuplicateCategory(name.to_string()));
        }
        self.entries.insert(name.to_string(), meta);
        Ok(())
    }

    /// Remove a category; built-ins are refused
    ///
    /// Returns `Ok(false)` when the category was not registered.
    pub fn unregister(&mut self, name: &str) -> ProjectResult<bool> {
        if is_builtin(name) {
            return Err(ProjectError::BuiltinCategory(name.to_string()));
        }
        Ok(self.entries.shift_remove(name).is_some())
    }

    /// Check whether a category is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Metadata of a registered category
    pub fn get(&self, name: &str) -> Option<&CategoryMeta> {
        self.entries.get(name)
    }

    /// Category names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryMeta)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered categories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true, the built-ins are always present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `name` is one of the categories every project has
pub fn is_builtin(name: &str) -> bool {
    BUILTIN.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_always_present() {
        let registry = CategoryRegistry::new();
        assert!(registry.contains(SOURCES));
        assert!(registry.contains(OTHERS));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = CategoryRegistry::new();
        registry
            .register("DOCS", CategoryMeta::new("Docs", ["*.adoc"]))
            .unwrap();
        let err = registry
            .register("DOCS", CategoryMeta::new("Docs", ["*.adoc"]))
            .unwrap_err();
        assert_eq!(err, ProjectError::DuplicateCategory("DOCS".to_string()));
    }

    #[test]
    fn test_unregister_builtin_refused() {
        let mut registry = CategoryRegistry::new();
        assert!(matches!(
            registry.unregister(SOURCES),
            Err(ProjectError::BuiltinCategory(_))
        ));
        assert!(!registry.unregister("NOPE").unwrap());
    }

    #[test]
    fn test_filter_expansion() {
        let meta = CategoryMeta::new("Forms", ["*.ui"]);
        assert_eq!(meta.filter(), "Forms Files (*.ui)");
    }

    #[test]
    fn test_translations_not_pruned() {
        let registry = CategoryRegistry::with_standard_categories();
        assert!(!registry.get(TRANSLATIONS).unwrap().prune_on_open);
        assert!(registry.get(FORMS).unwrap().prune_on_open);
    }
}

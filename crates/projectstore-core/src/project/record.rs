//! In-memory project record

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Value};

use super::category::CategoryRegistry;
use super::filetypes::FileTypeRules;

/// Well-known scalar configuration keys
///
/// The store accepts any key; these are the ones the IDE itself reads.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Description,
    Version,
    Author,
    Email,
    Hash,
    MainScript,
    ProgLanguage,
    MixedLanguage,
    ProjectType,
    SpellLanguage,
    SpellWords,
    SpellExcludes,
    Eol,
    Docstring,
    TestingFramework,
    License,
    EmbeddedVenv,
    SourcesDir,
    TranslationPattern,
    TranslationsBinPath,
    Vcs,
    VcsOptions,
    VcsOtherData,
    LexerAssocs,
    MakeParams,
    UicParams,
    RccParams,
    IdlParams,
    DocumentationParms,
    PackagersParms,
    CheckersParms,
    OtherToolsParms,
    DebuggerParms,
}

impl ScalarKey {
    /// Every well-known key
    pub const ALL: [ScalarKey; 33] = [
        ScalarKey::Description,
        ScalarKey::Version,
        ScalarKey::Author,
        ScalarKey::Email,
        ScalarKey::Hash,
        ScalarKey::MainScript,
        ScalarKey::ProgLanguage,
        ScalarKey::MixedLanguage,
        ScalarKey::ProjectType,
        ScalarKey::SpellLanguage,
        ScalarKey::SpellWords,
        ScalarKey::SpellExcludes,
        ScalarKey::Eol,
        ScalarKey::Docstring,
        ScalarKey::TestingFramework,
        ScalarKey::License,
        ScalarKey::EmbeddedVenv,
        ScalarKey::SourcesDir,
        ScalarKey::TranslationPattern,
        ScalarKey::TranslationsBinPath,
        ScalarKey::Vcs,
        ScalarKey::VcsOptions,
        ScalarKey::VcsOtherData,
        ScalarKey::LexerAssocs,
        ScalarKey::MakeParams,
        ScalarKey::UicParams,
        ScalarKey::RccParams,
        ScalarKey::IdlParams,
        ScalarKey::DocumentationParms,
        ScalarKey::PackagersParms,
        ScalarKey::CheckersParms,
        ScalarKey::OtherToolsParms,
        ScalarKey::DebuggerParms,
    ];

    /// Key as written in the project file
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKey::Description => "DESCRIPTION",
            ScalarKey::Version => "VERSION",
            ScalarKey::Author => "AUTHOR",
            ScalarKey::Email => "EMAIL",
            ScalarKey::Hash => "HASH",
            ScalarKey::MainScript => "MAINSCRIPT",
            ScalarKey::ProgLanguage => "PROGLANGUAGE",
            ScalarKey::MixedLanguage => "MIXEDLANGUAGE",
            ScalarKey::ProjectType => "PROJECTTYPE",
            ScalarKey::SpellLanguage => "SPELLLANGUAGE",
            ScalarKey::SpellWords => "SPELLWORDS",
            ScalarKey::SpellExcludes => "SPELLEXCLUDES",
            ScalarKey::Eol => "EOL",
            ScalarKey::Docstring => "DOCSTRING",
            ScalarKey::TestingFramework => "TESTING_FRAMEWORK",
            ScalarKey::License => "LICENSE",
            ScalarKey::EmbeddedVenv => "EMBEDDED_VENV",
            ScalarKey::SourcesDir => "SOURCESDIR",
            ScalarKey::TranslationPattern => "TRANSLATIONPATTERN",
            ScalarKey::TranslationsBinPath => "TRANSLATIONSBINPATH",
            ScalarKey::Vcs => "VCS",
            ScalarKey::VcsOptions => "VCSOPTIONS",
            ScalarKey::VcsOtherData => "VCSOTHERDATA",
            ScalarKey::LexerAssocs => "LEXERASSOCS",
            ScalarKey::MakeParams => "MAKEPARAMS",
            ScalarKey::UicParams => "UICPARAMS",
            ScalarKey::RccParams => "RCCPARAMS",
            ScalarKey::IdlParams => "IDLPARAMS",
            ScalarKey::DocumentationParms => "DOCUMENTATIONPARMS",
            ScalarKey::PackagersParms => "PACKAGERSPARMS",
            ScalarKey::CheckersParms => "CHECKERSPARMS",
            ScalarKey::OtherToolsParms => "OTHERTOOLSPARMS",
            ScalarKey::DebuggerParms => "DEBUGGERPARMS",
        }
    }

    /// Whether the value holds path(s) that are persisted with `/` separators
    pub fn is_path(self) -> bool {
        matches!(
            self,
            ScalarKey::MainScript
                | ScalarKey::SpellWords
                | ScalarKey::SpellExcludes
                | ScalarKey::SourcesDir
                | ScalarKey::TranslationPattern
                | ScalarKey::TranslationsBinPath
        )
    }
}

impl AsRef<str> for ScalarKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ScalarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown scalar key '{s}'"))
    }
}

/// Scalar values of a freshly created project
pub fn default_scalars() -> BTreeMap<String, Value> {
    let defaults = [
        (ScalarKey::Description, json!("")),
        (ScalarKey::Version, json!("")),
        (ScalarKey::Author, json!("")),
        (ScalarKey::Email, json!("")),
        (ScalarKey::Hash, json!("")),
        (ScalarKey::MainScript, json!("")),
        (ScalarKey::ProgLanguage, json!("Python3")),
        (ScalarKey::MixedLanguage, json!(false)),
        (ScalarKey::ProjectType, json!("Console")),
        (ScalarKey::SpellLanguage, json!("")),
        (ScalarKey::SpellWords, json!("")),
        (ScalarKey::SpellExcludes, json!("")),
        (ScalarKey::Eol, json!(-1)),
        (ScalarKey::Docstring, json!("")),
        (ScalarKey::TestingFramework, json!("")),
        (ScalarKey::License, json!("")),
        (ScalarKey::EmbeddedVenv, json!(false)),
        (ScalarKey::Vcs, json!(crate::vcs::NO_VCS)),
        (ScalarKey::VcsOptions, json!({})),
        (ScalarKey::VcsOtherData, json!({})),
        (ScalarKey::LexerAssocs, json!({})),
    ];
    defaults
        .into_iter()
        .map(|(k, v)| (k.as_str().to_string(), v))
        .collect()
}

/// Everything persisted about one project
///
/// Categories map to ordered sets of project-relative paths in native form;
/// a path is in at most one category.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub(crate) scalars: BTreeMap<String, Value>,
    pub(crate) files: IndexMap<String, IndexSet<PathBuf>>,
    pub(crate) file_types: FileTypeRules,
}

impl ProjectRecord {
    /// Empty record for the given categories, defaults applied
    pub fn new(categories: &CategoryRegistry) -> Self {
        Self {
            scalars: default_scalars(),
            files: categories
                .names()
                .map(|name| (name.to_string(), IndexSet::new()))
                .collect(),
            file_types: FileTypeRules::from_categories(categories.iter()),
        }
    }

    /// Scalar value, if present
    pub fn scalar(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.scalars.get(key.as_ref())
    }

    /// All scalar entries, sorted by key
    pub fn scalars(&self) -> &BTreeMap<String, Value> {
        &self.scalars
    }

    /// Files of a category
    pub fn files(&self, category: &str) -> Option<&IndexSet<PathBuf>> {
        self.files.get(category)
    }

    /// Category names present in this record
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// File type rules
    pub fn file_types(&self) -> &FileTypeRules {
        &self.file_types
    }

    /// Category currently holding `path`
    pub fn category_of(&self, path: &Path) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, set)| set.contains(path))
            .map(|(name, _)| name.as_str())
    }

    /// Total number of tracked files
    pub fn file_count(&self) -> usize {
        self.files.values().map(IndexSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_key_parse() {
        assert_eq!("MAINSCRIPT".parse::<ScalarKey>(), Ok(ScalarKey::MainScript));
        assert!("NOPE".parse::<ScalarKey>().is_err());
        for key in ScalarKey::ALL {
            assert_eq!(key.as_str().parse::<ScalarKey>(), Ok(key));
        }
    }

    #[test]
    fn test_new_record_has_all_categories() {
        let registry = CategoryRegistry::with_standard_categories();
        let record = ProjectRecord::new(&registry);
        assert_eq!(record.categories().count(), registry.len());
        assert_eq!(record.file_count(), 0);
        assert_eq!(record.scalar(ScalarKey::ProgLanguage), Some(&json!("Python3")));
    }
}

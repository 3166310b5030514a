//! Project file format
//!
//! A project file is a JSON document with two members:
//!
//! ```text
//! {
//!   "header":  { "comment": "...", "saved": "2026-01-01T00:00:00+00:00" },
//!   "project": {
//!     "DESCRIPTION": "...",           scalar configuration
//!     "SOURCES": ["pkg/mod.py", ...], one list per category
//!     "FILETYPES": { "*.py": "SOURCES", "*.pyc": "__IGNORE__" },
//!     ...
//!   }
//! }
//! ```
//!
//! Members of `project` are sorted by key so files diff cleanly. FILETYPES is
//! the exception: its members keep rule order, which decides precedence.
//! Paths are always written with `/` separators.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{PathBuf, MAIN_SEPARATOR_STR};

use indexmap::IndexSet;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::category::CategoryRegistry;
use super::error::{ProjectError, ProjectResult};
use super::filetypes::FileTypeRules;
use super::paths;
use super::record::{default_scalars, ProjectRecord, ScalarKey};

/// Key of the file type rules inside the project section
pub const FILETYPES_KEY: &str = "FILETYPES";

/// Informational block at the top of a project file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHeader {
    /// Free-form comment
    #[serde(default)]
    pub comment: String,

    /// When the file was written (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<String>,
}

#[derive(Serialize)]
struct ProjectFileOut<'a> {
    header: &'a ProjectHeader,
    project: BTreeMap<&'a str, EntryOut<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryOut<'a> {
    Value(Value),
    Files(Vec<String>),
    Rules(&'a FileTypeRules),
}

#[derive(Deserialize)]
struct ProjectFileIn {
    #[serde(default)]
    header: ProjectHeader,
    project: ProjectSectionIn,
}

/// Project section with FILETYPES pulled out so its member order survives
struct ProjectSectionIn {
    file_types: Option<FileTypeRules>,
    entries: BTreeMap<String, Value>,
}

impl<'de> Deserialize<'de> for ProjectSectionIn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = ProjectSectionIn;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a project section object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut section = ProjectSectionIn {
                    file_types: None,
                    entries: BTreeMap::new(),
                };
                while let Some(key) = access.next_key::<String>()? {
                    if key == FILETYPES_KEY {
                        section.file_types = Some(access.next_value()?);
                    } else {
                        let value: Value = access.next_value()?;
                        section.entries.insert(key, value);
                    }
                }
                Ok(section)
            }
        }

        deserializer.deserialize_map(SectionVisitor)
    }
}

/// Render a record as pretty-printed JSON
pub fn serialize(record: &ProjectRecord, header: &ProjectHeader) -> ProjectResult<Vec<u8>> {
    let mut project: BTreeMap<&str, EntryOut<'_>> = BTreeMap::new();

    for (key, value) in &record.scalars {
        project.insert(key.as_str(), EntryOut::Value(scalar_to_persisted(key, value)));
    }
    for (category, files) in &record.files {
        let files = files.iter().map(|p| paths::to_persisted(p)).collect();
        project.insert(category.as_str(), EntryOut::Files(files));
    }
    project.insert(FILETYPES_KEY, EntryOut::Rules(&record.file_types));

    let file = ProjectFileOut { header, project };
    let mut bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| ProjectError::MalformedProjectFile(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a project file into a record
///
/// Lists stored under a registered category become that category's files;
/// everything else is kept as scalar configuration. Categories absent from
/// the file start out empty.
pub fn deserialize(
    bytes: &[u8],
    categories: &CategoryRegistry,
) -> ProjectResult<(ProjectHeader, ProjectRecord)> {
    let parsed: ProjectFileIn = serde_json::from_slice(bytes)
        .map_err(|e| ProjectError::MalformedProjectFile(e.to_string()))?;
    let ProjectSectionIn {
        file_types,
        mut entries,
    } = parsed.project;

    let mut record = ProjectRecord {
        scalars: default_scalars(),
        files: Default::default(),
        file_types: file_types.unwrap_or_else(|| FileTypeRules::from_categories(categories.iter())),
    };

    for name in categories.names() {
        let files = match entries.remove(name) {
            Some(value) => parse_file_list(name, value, &record)?,
            None => IndexSet::new(),
        };
        record.files.insert(name.to_string(), files);
    }

    for (key, value) in entries {
        let value = scalar_from_persisted(&key, value);
        record.scalars.insert(key, value);
    }

    Ok((parsed.header, record))
}

/// Convert a persisted file list, dropping entries another category owns
pub(crate) fn parse_file_list(
    category: &str,
    value: Value,
    record: &ProjectRecord,
) -> ProjectResult<IndexSet<PathBuf>> {
    let Value::Array(items) = value else {
        return Err(ProjectError::MalformedProjectFile(format!(
            "file list for category '{category}' is not an array"
        )));
    };

    let mut files = IndexSet::with_capacity(items.len());
    for item in items {
        let Value::String(text) = item else {
            return Err(ProjectError::MalformedProjectFile(format!(
                "non-string entry in file list for category '{category}'"
            )));
        };
        let path = paths::from_persisted(&text);
        if path.as_os_str().is_empty() {
            continue;
        }
        if let Some(owner) = record.category_of(&path) {
            tracing::warn!(
                "Dropping {} from {category}, it is already listed under {owner}",
                text
            );
            continue;
        }
        files.insert(path);
    }
    Ok(files)
}

fn is_path_key(key: &str) -> bool {
    key.parse::<ScalarKey>().is_ok_and(ScalarKey::is_path)
}

fn scalar_to_persisted(key: &str, value: &Value) -> Value {
    match value {
        Value::String(s) if is_path_key(key) => Value::String(s.replace(MAIN_SEPARATOR_STR, "/")),
        other => other.clone(),
    }
}

fn scalar_from_persisted(key: &str, value: Value) -> Value {
    match value {
        Value::String(s) if is_path_key(key) => Value::String(s.replace('/', MAIN_SEPARATOR_STR)),
        other => other,
    }
}

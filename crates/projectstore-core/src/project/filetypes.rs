//! File type rules: glob pattern -> category
//!
//! Rules are kept as an explicit ordered sequence. When several patterns
//! match a file, the one added last wins, so specific rules registered after
//! broad ones override them. In the project file the rules are written as a
//! JSON object whose member order is the rule order.

use std::fmt;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::category::{CategoryMeta, OTHERS};
use super::error::{ProjectError, ProjectResult};
use super::paths;

/// Persisted name of the ignore sentinel
pub const IGNORE: &str = "__IGNORE__";

/// Patterns that never belong to a project
const IGNORED_PATTERNS: [&str; 7] = [
    "__pycache__",
    "*.pyc",
    "*.pyo",
    "*.orig",
    "*.bak",
    "*.rej",
    "*~",
];

/// Build files without an extension that are tracked as OTHERS
const MAKEFILE_NAMES: [&str; 3] = ["makefile", "Makefile", "GNUmakefile"];

/// Result of classifying a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// File belongs to the named category
    Category(String),
    /// File is not part of the project
    Ignore,
}

impl Classification {
    /// Classification into a category
    pub fn category(name: impl Into<String>) -> Self {
        Classification::Category(name.into())
    }

    /// Category name, `None` for [`Classification::Ignore`]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Classification::Category(name) => Some(name),
            Classification::Ignore => None,
        }
    }

    /// Check for the ignore sentinel
    pub fn is_ignore(&self) -> bool {
        matches!(self, Classification::Ignore)
    }

    fn from_persisted(text: &str) -> Self {
        if text == IGNORE {
            Classification::Ignore
        } else {
            Classification::Category(text.to_string())
        }
    }

    fn as_persisted(&self) -> &str {
        match self {
            Classification::Category(name) => name,
            Classification::Ignore => IGNORE,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_persisted())
    }
}

/// A single compiled rule
#[derive(Debug, Clone)]
pub struct FileTypeRule {
    pattern: String,
    compiled: Pattern,
    classification: Classification,
}

impl FileTypeRule {
    /// Compile a rule, rejecting malformed globs
    pub fn new(pattern: &str, classification: Classification) -> ProjectResult<Self> {
        let compiled = Pattern::new(pattern).map_err(|e| ProjectError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            compiled,
            classification,
        })
    }

    /// The glob text
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Where matching files go
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Patterns with a `/` match the whole relative path, others the basename
    fn matches(&self, relative: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: !cfg!(windows),
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        if self.pattern.contains('/') {
            self.compiled
                .matches_with(&paths::to_persisted(relative), options)
        } else {
            self.compiled
                .matches_with(&paths::file_name(relative), options)
        }
    }
}

impl PartialEq for FileTypeRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.classification == other.classification
    }
}

impl Eq for FileTypeRule {}

/// Ordered rule set, later rules take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeRules {
    rules: Vec<FileTypeRule>,
}

impl FileTypeRules {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Default rules derived from category extensions
    ///
    /// Ignore rules and makefile names are appended last so they win over
    /// broad category globs.
    pub fn from_categories<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a CategoryMeta)>,
    {
        let mut rules = Self::new();
        for (name, meta) in categories {
            for ext in &meta.extensions {
                if let Err(err) = rules.set(ext, Classification::category(name)) {
                    tracing::warn!("Skipping default file type for {name}: {err}");
                }
            }
        }
        for name in MAKEFILE_NAMES {
            if let Err(err) = rules.set(name, Classification::category(OTHERS)) {
                tracing::warn!("Skipping default file type {name}: {err}");
            }
        }
        for pattern in IGNORED_PATTERNS {
            if let Err(err) = rules.set(pattern, Classification::Ignore) {
                tracing::warn!("Skipping default ignore pattern {pattern}: {err}");
            }
        }
        rules
    }

    /// Add or update a rule
    ///
    /// An existing pattern keeps its position and only changes its
    /// classification. Returns whether anything changed.
    pub fn set(&mut self, pattern: &str, classification: Classification) -> ProjectResult<bool> {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.pattern == pattern) {
            if rule.classification == classification {
                return Ok(false);
            }
            rule.classification = classification;
            return Ok(true);
        }
        self.rules.push(FileTypeRule::new(pattern, classification)?);
        Ok(true)
    }

    /// Remove a rule by its pattern
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.pattern != pattern);
        before != self.rules.len()
    }

    /// Classification for a project-relative path, `None` if no rule matches
    pub fn classify(&self, relative: &Path) -> Option<&Classification> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(relative))
            .map(|rule| &rule.classification)
    }

    /// Look up the classification stored for a pattern
    pub fn get(&self, pattern: &str) -> Option<&Classification> {
        self.rules
            .iter()
            .find(|r| r.pattern == pattern)
            .map(|r| &r.classification)
    }

    /// Rules in precedence-ascending order
    pub fn iter(&self) -> impl Iterator<Item = &FileTypeRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop every rule pointing at `category`
    pub fn remove_category(&mut self, category: &str) -> usize {
        let before = self.rules.len();
        self.rules
            .retain(|r| r.classification.as_category() != Some(category));
        before - self.rules.len()
    }
}

impl Serialize for FileTypeRules {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.pattern, rule.classification.as_persisted())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FileTypeRules {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = FileTypeRules;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of glob patterns to category names")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut rules = FileTypeRules::new();
                while let Some((pattern, target)) = access.next_entry::<String, String>()? {
                    if let Err(err) = rules.set(&pattern, Classification::from_persisted(&target)) {
                        tracing::warn!("Dropping file type rule from project file: {err}");
                    }
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}

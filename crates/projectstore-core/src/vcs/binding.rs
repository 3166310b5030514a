//! VCS binding of a project
//!
//! The store does not interpret any of this; it keeps the system name and
//! the per-command option blobs so the VCS collaborator finds them again
//! after a reload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Persisted value meaning "no VCS"
pub const NO_VCS: &str = "None";

/// Which VCS a project uses and how it is invoked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcsBinding {
    /// System identifier, e.g. "Subversion" or "Mercurial"
    pub system: String,

    /// Command line options per sub-command ("add", "commit", "global", ...)
    #[serde(default)]
    pub options: BTreeMap<String, Value>,

    /// Free-form data owned by the VCS collaborator
    #[serde(default)]
    pub other_data: Map<String, Value>,
}

impl VcsBinding {
    /// Binding to a system without options
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Self::default()
        }
    }

    /// Set the options for one sub-command
    pub fn with_options<I, S>(mut self, command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<Value> = args.into_iter().map(|a| Value::String(a.into())).collect();
        self.options.insert(command.to_string(), Value::Array(args));
        self
    }

    /// Options for a sub-command as an argument list
    ///
    /// Options may be stored as a single whitespace separated string or as a
    /// list of strings; both forms are accepted.
    pub fn option_args(&self, command: &str) -> Vec<String> {
        match self.options.get(command) {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .flat_map(str::split_whitespace)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_args_from_string_and_list() {
        let mut binding = VcsBinding::new("Subversion").with_options("commit", ["--depth", "infinity"]);
        binding
            .options
            .insert("global".to_string(), Value::String(" --non-interactive  -q ".to_string()));

        assert_eq!(binding.option_args("commit"), vec!["--depth", "infinity"]);
        assert_eq!(binding.option_args("global"), vec!["--non-interactive", "-q"]);
        assert!(binding.option_args("update").is_empty());
    }
}

//! Store behavior settings

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings that shape how the store classifies, prunes and writes projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Write a "saved" timestamp into the project file header
    #[serde(default = "default_true")]
    pub timestamp_file: bool,

    /// Drop files that no longer exist when a project is opened
    #[serde(default = "default_true")]
    pub prune_on_open: bool,

    /// Category for files no rule matches (ignored when unset)
    #[serde(default)]
    pub fallback_category: Option<String>,

    /// Path prefix that addresses the remote filesystem
    #[serde(default = "default_remote_prefix")]
    pub remote_prefix: String,

    /// Header comment, `{name}` is replaced by the project name
    #[serde(default = "default_header_comment")]
    pub header_comment: String,

    /// Grace period before a terminated process is killed
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_remote_prefix() -> String {
    "remote://".to_string()
}

fn default_header_comment() -> String {
    "Project file for project {name}".to_string()
}

fn default_terminate_grace_ms() -> u64 {
    2000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timestamp_file: true,
            prune_on_open: true,
            fallback_category: None,
            remote_prefix: default_remote_prefix(),
            header_comment: default_header_comment(),
            terminate_grace_ms: default_terminate_grace_ms(),
        }
    }
}

impl StoreConfig {
    /// Default location of the settings file
    pub fn default_path() -> io::Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
            })?;
        Ok(base.join("projectstore").join("store.json"))
    }

    /// Load settings from a JSON file, missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Load from [`StoreConfig::default_path`], falling back to defaults
    pub fn load_or_default() -> Self {
        let Ok(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring malformed store config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Header comment for a project with the given name
    pub fn header_comment_for(&self, name: &str) -> String {
        self.header_comment.replace("{name}", name)
    }
}

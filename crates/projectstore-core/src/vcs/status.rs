//! VCS status cache
//!
//! Caches the last known VCS state of project files, keyed by normalized
//! path. The cache is an ordinary value owned by whoever queries the VCS;
//! it lives exactly as long as its owner and is emptied with [`StatusCache::clear`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::project::paths;

/// State of a file as reported by the VCS
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsStatus {
    Normal,
    Added,
    Modified,
    Deleted,
    Replaced,
    Conflicted,
    Unversioned,
    Missing,
    Ignored,
    External,
    Obstructed,
}

impl VcsStatus {
    /// Map the first status column of `svn status` output
    pub fn from_status_code(code: char) -> Option<Self> {
        Some(match code {
            ' ' => VcsStatus::Normal,
            'A' => VcsStatus::Added,
            'M' => VcsStatus::Modified,
            'D' => VcsStatus::Deleted,
            'R' => VcsStatus::Replaced,
            'C' => VcsStatus::Conflicted,
            '?' => VcsStatus::Unversioned,
            '!' => VcsStatus::Missing,
            'I' => VcsStatus::Ignored,
            'X' => VcsStatus::External,
            '~' => VcsStatus::Obstructed,
            _ => return None,
        })
    }

    /// Whether the file is under version control
    pub fn is_versioned(self) -> bool {
        !matches!(
            self,
            VcsStatus::Unversioned | VcsStatus::Ignored | VcsStatus::External
        )
    }
}

fn status_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<item>[ ACDIMRX?!~])[ CM?][ L?][ +?][ SX?][ KOTB?]?[ C?]?\s+(?:(?P<rev>\d+|-)\s+(?P<changed>\d+|\?|-)\s+(?P<author>\S+)\s+)?(?P<path>\S.*)$",
        )
        .expect("status line pattern is valid")
    })
}

/// One parsed line of status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path as printed by the VCS
    pub path: PathBuf,
    /// Item status column
    pub status: VcsStatus,
    /// Working revision, verbose output only
    pub revision: Option<u64>,
    /// Last committer, verbose output only
    pub author: Option<String>,
}

/// Parse a single `svn status [-v]` line; headers and summaries yield `None`
pub fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let caps = status_line_re().captures(line.trim_end())?;
    let code = caps.name("item")?.as_str().chars().next()?;
    let status = VcsStatus::from_status_code(code)?;
    Some(StatusEntry {
        path: paths::from_persisted(caps.name("path")?.as_str().trim()),
        status,
        revision: caps.name("rev").and_then(|m| m.as_str().parse().ok()),
        author: caps
            .name("author")
            .map(|m| m.as_str().to_string())
            .filter(|a| a != "?"),
    })
}

/// Status per normalized path
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: HashMap<PathBuf, VcsStatus>,
}

impl StatusCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached status for a path
    pub fn get(&self, path: &Path) -> Option<VcsStatus> {
        self.entries.get(&normalize(path)).copied()
    }

    /// Record the status of a path, returning the previous one
    pub fn insert(&mut self, path: &Path, status: VcsStatus) -> Option<VcsStatus> {
        self.entries.insert(normalize(path), status)
    }

    /// Forget one path
    pub fn remove(&mut self, path: &Path) -> Option<VcsStatus> {
        self.entries.remove(&normalize(path))
    }

    /// Feed raw status output, returns how many lines were understood
    pub fn extend_from_status_output(&mut self, output: &str) -> usize {
        let mut count = 0;
        for entry in output.lines().filter_map(parse_status_line) {
            self.entries.insert(normalize(&entry.path), entry.status);
            count += 1;
        }
        count
    }

    /// Drop every cached entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(path: &Path) -> PathBuf {
    paths::from_persisted(&paths::to_persisted(path))
}

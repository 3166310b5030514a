//! # ProjectStore Core Library
//!
//! Project metadata for an IDE: which files make up a project, how new files
//! are classified, and how all of it is saved to a project file.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - File categories (sources, forms, translations, ...) with a registry
//! - Ordered glob rules that classify files into categories
//! - A dirty flag and change notifications over channels
//! - JSON project file persistence through a pluggable filesystem
//! - Process launching and VCS status parsing for tooling collaborators
//!
//! ## Example
//!
//! ```rust,no_run
//! use projectstore_core::prelude::*;
//!
//! let mut store = ProjectStore::default();
//! store.open("/work/demo/demo.epj")?;
//! store.add_file("/work/demo/pkg/new_module.py", None)?;
//! if store.is_dirty() {
//!     store.save()?;
//! }
//! # Ok::<(), projectstore_core::project::ProjectError>(())
//! ```

pub mod fs;
pub mod process;
pub mod project;
pub mod vcs;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::fs::{FileSystem, LocalFileSystem, MemoryFileSystem, RoutedFileSystem};
    pub use crate::process::{CommandSpec, ProcessHandle, ProcessLauncher, StopToken};
    pub use crate::project::{
        CategoryMeta, CategoryRegistry, Classification, FileTypeRules, ProjectError,
        ProjectEvent, ProjectStore, ScalarKey, StoreConfig,
    };
    pub use crate::vcs::{StatusCache, VcsBinding, VcsStatus};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Project metadata
//!
//! A project is a directory tree plus a project file that records which files
//! belong to it and how they are grouped:
//!
//! ```text
//! [project root]/
//! ├── demo.epj              # project file (JSON)
//! ├── pkg/mod.py            # tracked under SOURCES
//! ├── ui/main.ui            # tracked under FORMS
//! └── __pycache__/          # ignored by the file type rules
//! ```
//!
//! [`ProjectStore`] is the entry point. It keeps a [`ProjectRecord`] in
//! memory, classifies new files with [`FileTypeRules`] and persists the
//! record through a [`crate::fs::FileSystem`].

mod category;
mod config;
mod error;
mod events;
mod file_format;
mod filetypes;
pub mod paths;
mod record;
mod store;

pub use category::{
    is_builtin, CategoryMeta, CategoryRegistry, FORMS, INTERFACES, OTHERS, PROTOCOLS, RESOURCES,
    SOURCES, TRANSLATIONS,
};
pub use config::StoreConfig;
pub use error::{ProjectError, ProjectResult};
pub use events::{EventBus, ProjectEvent};
pub use file_format::{ProjectHeader, FILETYPES_KEY};
pub use filetypes::{Classification, FileTypeRule, FileTypeRules, IGNORE};
pub use record::{default_scalars, ProjectRecord, ScalarKey};
pub use store::{ProjectStore, Reassignment};

//! Version control collaborator support
//!
//! The store only persists the VCS binding. Querying the VCS is left to a
//! collaborator, which keeps what it learns in a [`StatusCache`].

mod binding;
mod status;

pub use binding::{VcsBinding, NO_VCS};
pub use status::{parse_status_line, StatusCache, StatusEntry, VcsStatus};

//! Process launching for tooling collaborators
//!
//! Collaborators such as the VCS layer or form compilers run external
//! programs through [`ProcessLauncher`]. Output is read line by line on
//! background threads and handed over through a bounded channel, so a long
//! running tool never has its output buffered to completion.

mod error;
mod launcher;

pub use error::{ProcessError, ProcessResult};
pub use launcher::{
    CommandSpec, OutputLine, OutputStream, ProcessHandle, ProcessLauncher, StopToken,
};

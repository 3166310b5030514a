//! Process launch errors

use std::io;

use thiserror::Error;

/// Errors from starting or controlling a child process
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Waiting on or signalling the child failed
    #[error("Process I/O error: {0}")]
    Io(#[from] io::Error),

    /// The child exited before the request
    #[error("Process has already finished")]
    AlreadyFinished,
}

/// Result type for process operations
pub type ProcessResult<T> = Result<T, ProcessError>;

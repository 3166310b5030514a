//! Change notifications
//!
//! The store publishes a [`ProjectEvent`] for every change to observable
//! state. Subscribers get their own channel; a subscriber that dropped its
//! receiver is forgotten on the next publish.

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

/// Something observable about the project changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    /// A file was added to a category
    #[allow(missing_docs)]
    FileAdded { category: String, path: PathBuf },
    /// A file was removed from a category
    #[allow(missing_docs)]
    FileRemoved { category: String, path: PathBuf },
    /// A tracked file was renamed, keeping its category
    #[allow(missing_docs)]
    FileRenamed {
        category: String,
        from: PathBuf,
        to: PathBuf,
    },
    /// A new file category is available
    CategoryRegistered(String),
    /// A file category and its file list were dropped
    CategoryUnregistered(String),
    /// A scalar configuration entry changed
    ScalarChanged(String),
    /// The file type rules changed
    FileTypesChanged,
    /// The unsaved-changes flag flipped
    DirtyChanged(bool),
    /// A project was created or loaded
    Opened(PathBuf),
    /// The project was written to the given file
    Saved(PathBuf),
    /// The project was closed and the store reset
    Closed,
}

/// Fan-out of events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ProjectEvent>>,
}

impl EventBus {
    /// Create a bus without subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Receiver<ProjectEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn publish(&mut self, event: ProjectEvent) {
        tracing::trace!(?event, "project event");
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers seen at the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

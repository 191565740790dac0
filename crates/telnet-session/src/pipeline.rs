//! Line routing: filters that may veto a line, listeners that receive it.
//!
//! Remote lines pass through the [`FilterPipeline`] first; survivors and all
//! local and internal lines are fanned out by the [`ListenerPipeline`].

pub mod filter;
pub mod listener;

use std::collections::BTreeMap;

pub use filter::{FilterId, FilterPipeline, LineFilter};
pub use listener::{LineListener, ListenerAction, ListenerId, ListenerPipeline};

/// Where a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Received from the remote host.
    Remote,
    /// Typed by the local operator and forwarded to the remote host.
    Local,
    /// Produced by the engine itself.
    Internal,
}

impl Origin {
    /// Short name for log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Internal => "internal",
        }
    }
}

/// Importance of a line, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Normal traffic and progress messages.
    #[default]
    Info,
    /// Something unexpected that the engine recovers from.
    Warning,
    /// A failure of the current connection.
    Error,
}

impl Severity {
    /// Short name for log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Insertion-ordered storage keyed by monotonically increasing handles.
///
/// Handles are never reused, so iterating the map in key order is iterating
/// in registration order.
struct Registry<T> {
    entries: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Registry<T> {
    const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, value: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

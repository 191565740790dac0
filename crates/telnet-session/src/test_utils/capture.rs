//! A listener that remembers what it saw.

use std::sync::{Arc, Mutex, PoisonError};

use crate::pipeline::{LineListener, ListenerAction, Origin, Severity};

/// One dispatched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    /// The line text.
    pub line: String,
    /// Where it came from.
    pub origin: Origin,
    /// Its severity.
    pub severity: Severity,
}

/// Records dispatched lines. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct CaptureListener {
    events: Arc<Mutex<Vec<CapturedLine>>>,
}

impl CaptureListener {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedLine> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured line texts, in dispatch order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.line).collect()
    }

    /// Line texts with the given origin.
    #[must_use]
    pub fn lines_from(&self, origin: Origin) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.origin == origin)
            .map(|e| e.line)
            .collect()
    }

    /// Whether any captured line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }

    /// Number of captured lines containing `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.line.contains(needle))
            .count()
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LineListener for CaptureListener {
    fn on_line(&mut self, line: &str, origin: Origin, severity: Severity) -> ListenerAction {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedLine {
                line: line.to_string(),
                origin,
                severity,
            });
        ListenerAction::Continue
    }
}

//! Line listeners.

use super::{Origin, Registry, Severity};

/// What a listener asks of the engine after seeing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerAction {
    /// Nothing to do.
    #[default]
    Continue,
    /// Queue the initial command again.
    RearmInitialCommand,
}

impl ListenerAction {
    /// Combine two actions; any request wins over `Continue`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Continue, Self::Continue) => Self::Continue,
            _ => Self::RearmInitialCommand,
        }
    }
}

/// A sink for lines.
///
/// Listeners must not assume any delivery order relative to each other.
pub trait LineListener: Send {
    /// Receive one line.
    fn on_line(&mut self, line: &str, origin: Origin, severity: Severity) -> ListenerAction;
}

/// Handle returned by [`ListenerPipeline::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Fan-out to every registered listener.
#[derive(Default)]
pub struct ListenerPipeline {
    listeners: Registry<Box<dyn LineListener>>,
}

impl ListenerPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&mut self, listener: impl LineListener + 'static) -> ListenerId {
        self.add_boxed(Box::new(listener))
    }

    /// Register an already boxed listener.
    pub fn add_boxed(&mut self, listener: Box<dyn LineListener>) -> ListenerId {
        ListenerId(self.listeners.insert(listener))
    }

    /// Unregister a listener.
    pub fn remove(&mut self, id: ListenerId) -> Option<Box<dyn LineListener>> {
        self.listeners.remove(id.0)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `line` to every listener and merge their requests.
    pub fn dispatch(&mut self, line: &str, origin: Origin, severity: Severity) -> ListenerAction {
        self.listeners
            .values_mut()
            .fold(ListenerAction::Continue, |action, listener| {
                action.merge(listener.on_line(line, origin, severity))
            })
    }
}

impl std::fmt::Debug for ListenerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerPipeline")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Counter(Arc<Mutex<usize>>);

    impl LineListener for Counter {
        fn on_line(&mut self, _line: &str, _origin: Origin, _severity: Severity) -> ListenerAction {
            *self.0.lock().unwrap() += 1;
            ListenerAction::Continue
        }
    }

    struct Rearm;

    impl LineListener for Rearm {
        fn on_line(&mut self, line: &str, _origin: Origin, _severity: Severity) -> ListenerAction {
            if line.contains("error") {
                ListenerAction::RearmInitialCommand
            } else {
                ListenerAction::Continue
            }
        }
    }

    #[test]
    fn every_listener_sees_every_line() {
        let count = Arc::new(Mutex::new(0));
        let mut pipeline = ListenerPipeline::new();
        pipeline.add(Counter(Arc::clone(&count)));
        pipeline.add(Counter(Arc::clone(&count)));

        pipeline.dispatch("one", Origin::Remote, Severity::Info);
        pipeline.dispatch("two", Origin::Internal, Severity::Debug);

        assert_eq!(*count.lock().unwrap(), 4);
    }

    #[test]
    fn request_does_not_short_circuit() {
        let count = Arc::new(Mutex::new(0));
        let mut pipeline = ListenerPipeline::new();
        pipeline.add(Rearm);
        pipeline.add(Counter(Arc::clone(&count)));

        let action = pipeline.dispatch("error: bad", Origin::Remote, Severity::Info);
        assert_eq!(action, ListenerAction::RearmInitialCommand);
        assert_eq!(*count.lock().unwrap(), 1);

        let action = pipeline.dispatch("fine", Origin::Remote, Severity::Info);
        assert_eq!(action, ListenerAction::Continue);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let count = Arc::new(Mutex::new(0));
        let mut pipeline = ListenerPipeline::new();
        let id = pipeline.add(Counter(Arc::clone(&count)));

        assert!(pipeline.remove(id).is_some());
        assert!(pipeline.is_empty());
        pipeline.dispatch("line", Origin::Remote, Severity::Info);
        assert_eq!(*count.lock().unwrap(), 0);
    }
}

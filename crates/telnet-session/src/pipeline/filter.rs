//! Ordered line filters.

use super::{Origin, Registry};

/// A filter over remote lines.
pub trait LineFilter: Send {
    /// Called for a remote line before [`accept`](Self::accept) is asked.
    fn observe(&mut self);

    /// Whether the line should reach the listeners.
    fn accept(&mut self, line: &str, origin: Origin) -> bool;
}

/// Handle returned by [`FilterPipeline::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterId(u64);

/// Filters run in registration order.
///
/// Each filter is observed and then asked to accept; the first rejection
/// stops the walk. Filters registered after a rejecting one are therefore
/// neither observed nor asked for that line. A watchdog that must see every
/// line has to be registered ahead of any filter that can reject.
#[derive(Default)]
pub struct FilterPipeline {
    filters: Registry<Box<dyn LineFilter>>,
}

impl FilterPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter at the end of the pipeline.
    pub fn add(&mut self, filter: impl LineFilter + 'static) -> FilterId {
        self.add_boxed(Box::new(filter))
    }

    /// Register an already boxed filter at the end of the pipeline.
    pub fn add_boxed(&mut self, filter: Box<dyn LineFilter>) -> FilterId {
        FilterId(self.filters.insert(filter))
    }

    /// Unregister a filter.
    pub fn remove(&mut self, id: FilterId) -> Option<Box<dyn LineFilter>> {
        self.filters.remove(id.0)
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no filter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `line` through the filters; `false` means it was vetoed.
    pub fn admit(&mut self, line: &str, origin: Origin) -> bool {
        for filter in self.filters.values_mut() {
            filter.observe();
            if !filter.accept(line, origin) {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("filters", &self.filters.len())
            .finish()
    }
}

//! Remote liveness tracking.
//!
//! The [`Watchdog`] is a [`LineFilter`]: every remote line it observes re-arms
//! it, and remote lines matching the response pattern are hidden from the
//! listeners. The engine holds a second handle to the same state to poll
//! [`Watchdog::is_expired`] once per tick.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::error::Result;
use crate::pipeline::{LineFilter, Origin};

#[derive(Debug)]
struct WatchdogState {
    /// `None` while idle.
    last_observed: Option<Instant>,
    max_wait: Duration,
    response: Option<Regex>,
}

/// Shared handle to one watchdog. Clones observe and report the same state.
#[derive(Debug, Clone)]
pub struct Watchdog {
    state: Arc<Mutex<WatchdogState>>,
}

impl Watchdog {
    /// Create an idle watchdog.
    ///
    /// `response`, when set, must match at the start of a line for the line to
    /// be hidden.
    ///
    /// # Errors
    ///
    /// Returns an error if `response` is not a valid regex.
    pub fn new(max_wait: Duration, response: Option<&str>) -> Result<Self> {
        let response = response.map(anchored).transpose()?;
        Ok(Self {
            state: Arc::new(Mutex::new(WatchdogState {
                last_observed: None,
                max_wait,
                response,
            })),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WatchdogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the watchdog from now.
    pub fn reset(&self) {
        self.reset_at(Instant::now());
    }

    /// Arm the watchdog from `now`.
    pub fn reset_at(&self, now: Instant) {
        self.lock().last_observed = Some(now);
    }

    /// Whether the watchdog has been armed at least once.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.lock().last_observed.is_some()
    }

    /// The longest tolerated silence.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.lock().max_wait
    }

    /// Whether `max_wait` has passed since the last observed line.
    ///
    /// An idle watchdog never expires.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        let state = self.lock();
        state
            .last_observed
            .is_some_and(|last| now.saturating_duration_since(last) >= state.max_wait)
    }
}

impl LineFilter for Watchdog {
    fn observe(&mut self) {
        self.reset();
    }

    fn accept(&mut self, line: &str, origin: Origin) -> bool {
        if origin != Origin::Remote {
            return true;
        }
        !self
            .lock()
            .response
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(line))
    }
}

/// Compile `pattern` so it only matches at the start of the input.
pub(crate) fn anchored(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_watchdog_never_expires() {
        let watchdog = Watchdog::new(Duration::from_secs(10), None).unwrap();
        assert!(!watchdog.is_armed());
        assert!(!watchdog.is_expired(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn expires_at_max_wait() {
        let watchdog = Watchdog::new(Duration::from_secs(10), None).unwrap();
        let start = Instant::now();
        watchdog.reset_at(start);

        assert!(!watchdog.is_expired(start + Duration::from_secs(9)));
        assert!(watchdog.is_expired(start + Duration::from_secs(10)));
        assert!(watchdog.is_expired(start + Duration::from_secs(11)));
    }

    #[test]
    fn observed_line_rearms() {
        let mut watchdog = Watchdog::new(Duration::from_secs(10), None).unwrap();
        let handle = watchdog.clone();
        let start = Instant::now();
        handle.reset_at(start);
        assert!(handle.is_expired(start + Duration::from_secs(20)));

        watchdog.observe();
        let observed = Instant::now();
        assert!(!handle.is_expired(observed + Duration::from_secs(9)));
        assert!(handle.is_expired(observed + Duration::from_secs(10)));
    }

    #[test]
    fn response_lines_are_hidden() {
        let mut watchdog = Watchdog::new(Duration::from_secs(10), Some("uptime")).unwrap();

        assert!(!watchdog.accept("uptime is 3 days", Origin::Remote));
        assert!(watchdog.accept("router uptime is 3 days", Origin::Remote));
        assert!(watchdog.accept("uptime", Origin::Local));
        assert!(watchdog.accept("interface up", Origin::Remote));
    }

    #[test]
    fn no_pattern_accepts_everything() {
        let mut watchdog = Watchdog::new(Duration::from_secs(10), None).unwrap();
        assert!(watchdog.accept("anything", Origin::Remote));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let pattern = anchored("foo|bar").unwrap();
        assert!(pattern.is_match("bar baz"));
        assert!(!pattern.is_match("baz bar"));
    }

    #[test]
    fn invalid_pattern() {
        assert!(Watchdog::new(Duration::from_secs(1), Some("(")).is_err());
    }
}

//! The reconnect loop around an [`Engine`].
//!
//! Watchdog expiry reconnects at once, since the engine has already waited
//! the watchdog's max wait. Every fault, whatever its class, is reported and
//! followed by `reconnect_delay` before the next attempt. Only the session
//! deadline or an operator stop ends the loop.

use crate::engine::{Engine, SessionEnd};
use crate::pipeline::Severity;
use crate::transport::Connector;

/// Why the supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The session lifetime is over.
    DeadlineReached,
    /// An operator asked to stop.
    Stopped,
}

/// Supervisor progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not started, or between attempts.
    Idle,
    /// A connection attempt or session is running.
    Running,
    /// Waiting out the reconnect delay after a fault.
    Backoff,
    /// Finished.
    Done(SupervisorExit),
}

/// Keeps an engine connected until the deadline or an operator stop.
#[derive(Debug)]
pub struct Supervisor<C> {
    engine: Engine<C>,
    state: SupervisorState,
    attempts: u64,
    faults: u64,
    watchdog_expiries: u64,
}

impl<C: Connector> Supervisor<C> {
    /// Supervise `engine`.
    #[must_use]
    pub const fn new(engine: Engine<C>) -> Self {
        Self {
            engine,
            state: SupervisorState::Idle,
            attempts: 0,
            faults: 0,
            watchdog_expiries: 0,
        }
    }

    /// The supervised engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    /// Give the engine back.
    pub fn into_engine(self) -> Engine<C> {
        self.engine
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SupervisorState {
        self.state
    }

    /// Connection attempts made so far.
    #[must_use]
    pub const fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Attempts that ended in a fault.
    #[must_use]
    pub const fn faults(&self) -> u64 {
        self.faults
    }

    /// Sessions ended by watchdog expiry.
    #[must_use]
    pub const fn watchdog_expiries(&self) -> u64 {
        self.watchdog_expiries
    }

    /// Run until the session deadline passes or a stop is requested.
    ///
    /// Never fails: faults are reported to the listeners and retried.
    pub async fn run(&mut self) -> SupervisorExit {
        let exit = self.run_loop().await;
        self.state = SupervisorState::Done(exit);
        tracing::info!(
            host = %self.engine.config().host,
            attempts = self.attempts,
            faults = self.faults,
            ?exit,
            "supervisor finished"
        );
        exit
    }

    async fn run_loop(&mut self) -> SupervisorExit {
        loop {
            if self.engine.deadline_passed() {
                self.engine
                    .emit(Severity::Info, "telnet session timeout, quit!!");
                return SupervisorExit::DeadlineReached;
            }
            if self.engine.stop_requested() {
                return SupervisorExit::Stopped;
            }

            self.state = SupervisorState::Running;
            self.attempts += 1;

            match self.engine.run_once().await {
                Ok(SessionEnd::WatchdogExpired) => {
                    self.watchdog_expiries += 1;
                    self.state = SupervisorState::Idle;
                }
                Ok(SessionEnd::DeadlineReached) => return SupervisorExit::DeadlineReached,
                Ok(SessionEnd::Stopped) => return SupervisorExit::Stopped,
                Err(e) => {
                    self.faults += 1;
                    let delay = self.engine.config().reconnect_delay;
                    tracing::warn!(
                        host = %self.engine.config().host,
                        attempt = self.attempts,
                        fault = e.fault_class(),
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "session fault"
                    );
                    self.engine.emit(
                        Severity::Error,
                        &format!(
                            "{} error during connection: {e}. Retrying after {} seconds...",
                            e.fault_class(),
                            delay.as_secs()
                        ),
                    );

                    self.state = SupervisorState::Backoff;
                    self.engine.pause(delay).await;
                    self.state = SupervisorState::Idle;
                }
            }
        }
    }
}

//! The session engine: connect, authenticate, relay.
//!
//! One [`Engine`] drives one remote session at a time. [`Engine::connect`]
//! opens and authenticates a [`Connection`]; [`Engine::run_session`] then runs
//! the tick loop on it until the watchdog expires, the session deadline
//! passes, an operator stop arrives, or a fault occurs. Reconnecting is the
//! [`Supervisor`](crate::supervisor::Supervisor)'s job.
//!
//! Each tick:
//!
//! 1. sends at most one segment of the pending command,
//! 2. waits up to the poll interval for remote data, a local input line or a
//!    trigger, and handles whichever arrives first,
//! 3. sends the watchdog command if its interval has elapsed,
//! 4. drops the connection if the watchdog has expired.
//!
//! The session deadline is checked at the top of every tick.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::Instant;

use crate::auth::Authenticator;
use crate::config::{DEFAULT_POLL_INTERVAL, SessionConfig};
use crate::command::PendingCommand;
use crate::error::{Result, SessionError};
use crate::line_buffer::LineBuffer;
use crate::listeners::InitialCommandErrorListener;
use crate::pipeline::{
    FilterPipeline, LineFilter, LineListener, ListenerAction, ListenerPipeline, Origin, Severity,
};
use crate::transport::{Connector, Transport, send_line};
use crate::trigger::{Trigger, TriggerReceiver};
use crate::watchdog::Watchdog;

/// Read chunk size for remote data.
const READ_CHUNK: usize = 4096;

type LocalLines = tokio::io::Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Why a session loop ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// No remote line for the watchdog's max wait; reconnect at once.
    WatchdogExpired,
    /// The absolute session lifetime is over.
    DeadlineReached,
    /// An operator asked to stop.
    Stopped,
}

/// An open, authenticated connection.
#[derive(Debug)]
pub struct Connection<S> {
    transport: S,
    lines: LineBuffer,
    last_watchdog_send: Instant,
}

impl<S> Connection<S> {
    /// Bytes received but not yet terminated by a newline.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.lines.pending()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder<C> {
    config: SessionConfig,
    connector: C,
    listeners: ListenerPipeline,
    filters: Vec<Box<dyn LineFilter>>,
    local_input: Option<LocalLines>,
    triggers: Option<TriggerReceiver>,
    poll_interval: Duration,
}

impl<C: Connector> EngineBuilder<C> {
    /// Start building an engine for `config` that connects with `connector`.
    #[must_use]
    pub fn new(config: SessionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            listeners: ListenerPipeline::new(),
            filters: Vec::new(),
            local_input: None,
            triggers: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Add a listener.
    #[must_use]
    pub fn listener(mut self, listener: impl LineListener + 'static) -> Self {
        self.listeners.add(listener);
        self
    }

    /// Add a filter. Filters run after the watchdog, in the order added.
    #[must_use]
    pub fn filter(mut self, filter: impl LineFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Forward lines read from `input` to the remote host.
    #[must_use]
    pub fn local_input(mut self, input: impl AsyncRead + Unpin + Send + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(BufReader::new(input));
        self.local_input = Some(reader.lines());
        self
    }

    /// Receive operator triggers from `triggers`.
    #[must_use]
    pub fn triggers(mut self, triggers: TriggerReceiver) -> Self {
        self.triggers = Some(triggers);
        self
    }

    /// Set the upper bound of one tick's wait.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the engine. The session deadline starts now.
    ///
    /// The watchdog filter is installed when `wd_max_wait` is set, ahead of
    /// every other filter. The initial-command retry listener is installed
    /// when both `initial_cmd` and `initial_cmd_error_phrase` are set.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured pattern is not a valid regex.
    pub fn build(self) -> Result<Engine<C>> {
        let Self {
            config,
            connector,
            mut listeners,
            filters: extra_filters,
            local_input,
            triggers,
            poll_interval,
        } = self;

        let mut filters = FilterPipeline::new();
        let watchdog = match config.wd_max_wait {
            Some(max_wait) => {
                let watchdog = Watchdog::new(max_wait, config.wd_response.as_deref())?;
                filters.add(watchdog.clone());
                Some(watchdog)
            }
            None => None,
        };
        for filter in extra_filters {
            filters.add_boxed(filter);
        }

        if config.initial_cmd.is_some()
            && let Some(phrase) = &config.initial_cmd_error_phrase
        {
            listeners.add(InitialCommandErrorListener::new(phrase)?);
        }

        // A lifetime past the clock's range never expires.
        let deadline = config
            .session_timer
            .and_then(|lifetime| Instant::now().checked_add(lifetime));

        Ok(Engine {
            config,
            connector,
            listeners,
            filters,
            watchdog,
            pending: PendingCommand::new(),
            local_input,
            triggers,
            poll_interval,
            deadline,
            stop_requested: false,
        })
    }
}

impl<C> std::fmt::Debug for EngineBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("host", &self.config.host)
            .field("listeners", &self.listeners)
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Drives one remote session at a time.
pub struct Engine<C> {
    config: SessionConfig,
    connector: C,
    listeners: ListenerPipeline,
    filters: FilterPipeline,
    watchdog: Option<Watchdog>,
    pending: PendingCommand,
    local_input: Option<LocalLines>,
    triggers: Option<TriggerReceiver>,
    poll_interval: Duration,
    deadline: Option<Instant>,
    stop_requested: bool,
}

impl<C: Connector> Engine<C> {
    /// Start building an engine.
    #[must_use]
    pub fn builder(config: SessionConfig, connector: C) -> EngineBuilder<C> {
        EngineBuilder::new(config, connector)
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The connector, for inspection.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// The liveness watchdog, if one is configured.
    #[must_use]
    pub const fn watchdog(&self) -> Option<&Watchdog> {
        self.watchdog.as_ref()
    }

    /// The listener pipeline.
    pub const fn listeners_mut(&mut self) -> &mut ListenerPipeline {
        &mut self.listeners
    }

    /// The filter pipeline.
    pub const fn filters_mut(&mut self) -> &mut FilterPipeline {
        &mut self.filters
    }

    /// The pending command slot.
    #[must_use]
    pub const fn pending(&self) -> &PendingCommand {
        &self.pending
    }

    /// When the session lifetime ends, if it is bounded.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the session lifetime is over.
    #[must_use]
    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Whether an operator stop has been received.
    #[must_use]
    pub const fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Send an internal message to the listeners.
    pub fn emit(&mut self, severity: Severity, message: &str) {
        self.listeners.dispatch(message, Origin::Internal, severity);
    }

    fn info(&mut self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Severity::Error, message);
    }

    /// Queue a command for sending, one `|`-separated segment per tick.
    pub fn arm_command(&mut self, command: &str) {
        self.pending.arm(command);
    }

    fn arm_initial_command(&mut self) {
        if let Some(cmd) = self.config.initial_cmd.clone() {
            self.info("sending initial_cmd");
            self.pending.arm(cmd);
        }
    }

    /// Open a connection, log in and arm the initial command.
    ///
    /// # Errors
    ///
    /// Returns connect, handshake and transport faults.
    pub async fn connect(&mut self) -> Result<Connection<C::Stream>> {
        let host = self.config.host.clone();
        let port = self.config.port;

        self.info("******************************");
        self.info(&format!("connecting to {host}..."));
        self.info("******************************");
        tracing::info!(host = %host, port, "connecting");

        let mut transport = self
            .connector
            .connect(&host, port, self.config.timeout)
            .await?;

        let leftover = Authenticator::new(&self.config)
            .authenticate(&mut transport, &mut self.listeners)
            .await?;

        self.arm_initial_command();
        if let Some(watchdog) = &self.watchdog {
            watchdog.reset();
        }

        let mut connection = Connection {
            transport,
            lines: LineBuffer::new(),
            last_watchdog_send: Instant::now(),
        };
        if !leftover.is_empty() {
            self.handle_remote_data(&mut connection, &leftover);
        }
        tracing::info!(host = %host, port, "session established");
        Ok(connection)
    }

    /// Connect and run one session.
    ///
    /// A stop requested while connecting or logging in abandons the attempt.
    /// Other triggers received meanwhile are applied once logged in.
    ///
    /// # Errors
    ///
    /// Returns any fault from [`connect`](Self::connect) or
    /// [`run_session`](Self::run_session).
    pub async fn run_once(&mut self) -> Result<SessionEnd> {
        let mut triggers = self.triggers.take();
        let mut deferred = Vec::new();

        let connected = {
            let connect = self.connect();
            tokio::pin!(connect);
            loop {
                tokio::select! {
                    result = &mut connect => break Some(result),
                    trigger = next_trigger(&mut triggers) => match trigger {
                        Some(Trigger::Stop) => break None,
                        Some(trigger) => deferred.push(trigger),
                        None => {
                            tracing::debug!("trigger channel closed");
                            triggers = None;
                        }
                    },
                }
            }
        };

        self.triggers = triggers;
        let Some(connection) = connected else {
            self.stop_requested = true;
            self.info("stop requested, abandoning connection attempt");
            return Ok(SessionEnd::Stopped);
        };
        let connection = connection?;
        for trigger in deferred {
            self.handle_trigger(Some(trigger));
        }
        self.run_session(connection).await
    }

    /// Run the tick loop on an open connection.
    ///
    /// # Errors
    ///
    /// Returns transport faults, including the remote host closing the
    /// connection.
    pub async fn run_session(&mut self, mut connection: Connection<C::Stream>) -> Result<SessionEnd> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if self.deadline_passed() {
                self.info("telnet session timeout, quit!!");
                close(&mut connection.transport).await;
                return Ok(SessionEnd::DeadlineReached);
            }
            if self.stop_requested {
                self.info("stop requested, closing session");
                close(&mut connection.transport).await;
                return Ok(SessionEnd::Stopped);
            }

            if let Some(segment) = self.pending.next_segment() {
                self.info(&format!("send command to telnet:{segment}"));
                send_line(&mut connection.transport, &segment).await?;
            }

            tokio::select! {
                result = connection.transport.read(&mut chunk) => {
                    match result {
                        Ok(0) => return Err(SessionError::eof(connection.lines.residual())),
                        Ok(n) => {
                            SessionError::with_io_context(
                                connection.transport.flush().await,
                                "answering telnet negotiation",
                            )?;
                            self.handle_remote_data(&mut connection, &chunk[..n]);
                        }
                        Err(e) => return Err(SessionError::io_context("reading from remote host", e)),
                    }
                }

                line = next_local_line(&mut self.local_input) => {
                    self.handle_local_line(&mut connection, line).await?;
                }

                trigger = next_trigger(&mut self.triggers) => {
                    self.handle_trigger(trigger);
                }

                () = tokio::time::sleep(self.poll_interval) => {}
            }

            let now = Instant::now();
            if let (Some(cmd), Some(interval)) = (&self.config.wd_cmd, self.config.wd_delay)
                && now.saturating_duration_since(connection.last_watchdog_send) > interval
            {
                let cmd = cmd.clone();
                self.info("watchdog triggered");
                self.emit(Severity::Debug, "sending watchdog command");
                send_line(&mut connection.transport, &cmd).await?;
                connection.last_watchdog_send = Instant::now();
            }

            if self.watchdog.as_ref().is_some_and(|wd| wd.is_expired(now)) {
                self.error("==========================================================");
                self.error("remote host is not responding. Reconnecting in progress...");
                self.error("==========================================================");
                tracing::warn!(host = %self.config.host, "watchdog expired");
                close(&mut connection.transport).await;
                return Ok(SessionEnd::WatchdogExpired);
            }
        }
    }

    fn handle_remote_data(&mut self, connection: &mut Connection<C::Stream>, data: &[u8]) {
        for line in connection.lines.feed(data) {
            if !self.filters.admit(&line, Origin::Remote) {
                continue;
            }
            let action = self.listeners.dispatch(&line, Origin::Remote, Severity::Info);
            self.apply(action);
        }
    }

    fn apply(&mut self, action: ListenerAction) {
        match action {
            ListenerAction::Continue => {}
            ListenerAction::RearmInitialCommand => {
                self.error("initial command failed. Will be resent");
                self.arm_initial_command();
            }
        }
    }

    async fn handle_local_line(
        &mut self,
        connection: &mut Connection<C::Stream>,
        line: io::Result<Option<String>>,
    ) -> Result<()> {
        match line {
            Ok(Some(line)) => {
                send_line(&mut connection.transport, &line).await?;
                let action = self.listeners.dispatch(&line, Origin::Local, Severity::Info);
                self.apply(action);
            }
            Ok(None) => {
                tracing::debug!("local input closed");
                self.local_input = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "local input failed, ignoring it from now on");
                self.local_input = None;
            }
        }
        Ok(())
    }

    /// Apply an operator trigger. Never tears down the connection.
    pub fn handle_trigger(&mut self, trigger: Option<Trigger>) {
        let Some(trigger) = trigger else {
            tracing::debug!("trigger channel closed");
            self.triggers = None;
            return;
        };
        tracing::debug!(%trigger, "trigger received");

        if trigger == Trigger::Stop {
            self.stop_requested = true;
            return;
        }
        if let Some(cmd) = self.config.trigger_cmd(trigger).map(str::to_string) {
            self.info(&format!("sending {} command: {cmd}", trigger.name().to_lowercase()));
            self.pending.arm(cmd);
        }
    }

    /// Sleep for `delay` while still honouring triggers.
    ///
    /// Returns early only when a stop is requested.
    pub async fn pause(&mut self, delay: Duration) {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        while !self.stop_requested {
            tokio::select! {
                () = &mut sleep => return,
                trigger = next_trigger(&mut self.triggers) => self.handle_trigger(trigger),
            }
        }
    }
}

impl<C> std::fmt::Debug for Engine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("listeners", &self.listeners)
            .field("filters", &self.filters)
            .field("pending", &self.pending)
            .field("deadline", &self.deadline)
            .finish()
    }
}

async fn next_local_line(input: &mut Option<LocalLines>) -> io::Result<Option<String>> {
    match input {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

async fn next_trigger(triggers: &mut Option<TriggerReceiver>) -> Option<Trigger> {
    match triggers {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn close<T: Transport>(transport: &mut T) {
    if let Err(e) = transport.shutdown().await {
        tracing::debug!(error = %e, "error closing connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CaptureListener, DuplexConnector};

    fn config() -> SessionConfig {
        SessionConfig::new("router", 23)
            .no_login()
            .session_timer(None)
    }

    #[tokio::test]
    async fn watchdog_installed_only_with_max_wait() {
        let engine = Engine::builder(config(), DuplexConnector::new()).build().unwrap();
        assert!(engine.watchdog().is_none());

        let config = config().watchdog(Duration::from_secs(60), None);
        let engine = Engine::builder(config, DuplexConnector::new()).build().unwrap();
        assert!(engine.watchdog().is_some());
    }

    #[tokio::test]
    async fn error_listener_needs_initial_command() {
        let capture = CaptureListener::new();
        let config = config().initial_cmd("show log", Some("% Invalid"));
        let mut engine = Engine::builder(config, DuplexConnector::new())
            .listener(capture)
            .build()
            .unwrap();
        assert_eq!(engine.listeners_mut().len(), 2);

        let mut config = self::config();
        config.initial_cmd_error_phrase = Some("% Invalid".into());
        let mut engine = Engine::builder(config, DuplexConnector::new()).build().unwrap();
        assert!(engine.listeners_mut().is_empty());
    }

    #[tokio::test]
    async fn bad_pattern_fails_build() {
        let config = config().watchdog(Duration::from_secs(60), Some("("));
        assert!(Engine::builder(config, DuplexConnector::new()).build().is_err());
    }

    #[tokio::test]
    async fn triggers_arm_configured_commands() {
        let config = config().trigger_cmds(Some("show clock|show users"), None);
        let mut engine = Engine::builder(config, DuplexConnector::new()).build().unwrap();

        engine.handle_trigger(Some(Trigger::Usr2));
        assert!(!engine.pending().is_armed());

        engine.handle_trigger(Some(Trigger::Usr1));
        assert_eq!(engine.pending().peek(), Some("show clock|show users"));
        assert!(!engine.stop_requested());

        engine.handle_trigger(Some(Trigger::Stop));
        assert!(engine.stop_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_starts_at_build() {
        let config = config().session_timer(Some(Duration::from_secs(30)));
        let engine = Engine::builder(config, DuplexConnector::new()).build().unwrap();
        assert!(!engine.deadline_passed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(engine.deadline_passed());
    }

    #[tokio::test]
    async fn huge_session_timer_never_expires() {
        let config = config().session_timer(Some(Duration::MAX));
        let engine = Engine::builder(config, DuplexConnector::new()).build().unwrap();
        assert!(engine.deadline().is_none());
        assert!(!engine.deadline_passed());
    }
}

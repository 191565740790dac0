//! Session configuration.
//!
//! [`SessionConfig`] is the resolved, read-only configuration one engine runs
//! with. It is normally produced by merging [`ConfigLayer`]s (built-in
//! defaults, a config file, the command line) and calling
//! [`ConfigLayer::resolve`], but it can also be assembled directly with the
//! builder methods below.

pub mod env;
pub mod file;
pub mod layer;

use std::path::PathBuf;
use std::time::Duration;

pub use file::{ConfigFormat, load_config_file};
pub use layer::ConfigLayer;

/// Default telnet port.
pub const DEFAULT_PORT: u16 = 23;

/// Default login prompt pattern.
pub const DEFAULT_LOGIN_PROMPT: &str = "login:";

/// Default password prompt pattern.
pub const DEFAULT_PASSWORD_PROMPT: &str = "Password:";

/// Default per-read timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default delay between a fault and the next connection attempt (seconds).
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Default absolute session lifetime (seconds).
pub const DEFAULT_SESSION_TIMER_SECS: u64 = 10_000;

/// Default interval between watchdog commands (seconds).
pub const DEFAULT_WD_DELAY_SECS: u64 = 30;

/// Default number of rotated log backups kept.
pub const DEFAULT_MAX_LOGS: usize = 1;

/// Default log size that triggers rotation (bytes).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 100_000;

/// Multiplier applied to the per-read timeout when waiting for the logged-in phrase.
pub const LOGGED_PHRASE_TIMEOUT_FACTOR: u32 = 5;

/// Largest duration accepted from a config file or the command line (seconds).
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Upper bound on one multiplex wait of the session loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Resolved configuration for one session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Login name sent after the login prompt.
    pub user: String,
    /// Password sent after the password prompt.
    pub password: Option<String>,
    /// Login prompt pattern; `None` skips the handshake.
    pub login_prompt: Option<String>,
    /// Password prompt pattern; `None` skips the password step.
    pub password_prompt: Option<String>,
    /// Phrase confirming a successful login.
    pub logged_phrase: Option<String>,
    /// Per-read timeout for connecting and for each prompt.
    pub timeout: Duration,
    /// Delay after a fault before reconnecting.
    pub reconnect_delay: Duration,
    /// Absolute lifetime of the whole process session.
    pub session_timer: Option<Duration>,
    /// Command sent after every successful login.
    pub initial_cmd: Option<String>,
    /// Remote phrase that causes the initial command to be resent.
    pub initial_cmd_error_phrase: Option<String>,
    /// Command armed by the first operator trigger (SIGUSR1).
    pub sig_usr1_cmd: Option<String>,
    /// Command armed by the second operator trigger (SIGUSR2).
    pub sig_usr2_cmd: Option<String>,
    /// Command sent periodically to provoke remote output.
    pub wd_cmd: Option<String>,
    /// Interval between watchdog commands.
    pub wd_delay: Option<Duration>,
    /// Pattern of watchdog responses, hidden from listeners.
    pub wd_response: Option<String>,
    /// Longest tolerated silence before the connection is recycled.
    pub wd_max_wait: Option<Duration>,
    /// Log file name suffix; `None` disables the file listener.
    pub filename: Option<String>,
    /// Directory of the log file.
    pub file_dir: Option<PathBuf>,
    /// Rotated log backups to keep.
    pub max_logs: usize,
    /// Log size in bytes that triggers rotation.
    pub max_log_size: u64,
}

impl SessionConfig {
    /// Create a configuration with built-in defaults for the given endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: env::current_user().unwrap_or_default(),
            password: None,
            login_prompt: Some(DEFAULT_LOGIN_PROMPT.to_string()),
            password_prompt: Some(DEFAULT_PASSWORD_PROMPT.to_string()),
            logged_phrase: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            session_timer: Some(Duration::from_secs(DEFAULT_SESSION_TIMER_SECS)),
            initial_cmd: None,
            initial_cmd_error_phrase: None,
            sig_usr1_cmd: None,
            sig_usr2_cmd: None,
            wd_cmd: None,
            wd_delay: Some(Duration::from_secs(DEFAULT_WD_DELAY_SECS)),
            wd_response: None,
            wd_max_wait: None,
            filename: None,
            file_dir: None,
            max_logs: DEFAULT_MAX_LOGS,
            max_log_size: DEFAULT_MAX_LOG_SIZE,
        }
    }

    /// Set the login name and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = Some(password.into());
        self
    }

    /// Set the login and password prompt patterns.
    #[must_use]
    pub fn prompts(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login_prompt = Some(login.into());
        self.password_prompt = Some(password.into());
        self
    }

    /// Skip the login handshake entirely.
    #[must_use]
    pub fn no_login(mut self) -> Self {
        self.login_prompt = None;
        self.password_prompt = None;
        self
    }

    /// Set the logged-in confirmation phrase.
    #[must_use]
    pub fn logged_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.logged_phrase = Some(phrase.into());
        self
    }

    /// Set the per-read timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the delay applied after a fault.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the absolute session lifetime; `None` runs until stopped.
    #[must_use]
    pub const fn session_timer(mut self, lifetime: Option<Duration>) -> Self {
        self.session_timer = lifetime;
        self
    }

    /// Set the initial command and, optionally, its error phrase.
    #[must_use]
    pub fn initial_cmd(mut self, cmd: impl Into<String>, error_phrase: Option<&str>) -> Self {
        self.initial_cmd = Some(cmd.into());
        self.initial_cmd_error_phrase = error_phrase.map(str::to_string);
        self
    }

    /// Set the commands bound to the two operator triggers.
    #[must_use]
    pub fn trigger_cmds(mut self, usr1: Option<&str>, usr2: Option<&str>) -> Self {
        self.sig_usr1_cmd = usr1.map(str::to_string);
        self.sig_usr2_cmd = usr2.map(str::to_string);
        self
    }

    /// Set the periodic watchdog command and its interval.
    #[must_use]
    pub fn watchdog_cmd(mut self, cmd: impl Into<String>, interval: Duration) -> Self {
        self.wd_cmd = Some(cmd.into());
        self.wd_delay = Some(interval);
        self
    }

    /// Enable the liveness watchdog.
    #[must_use]
    pub fn watchdog(mut self, max_wait: Duration, response: Option<&str>) -> Self {
        self.wd_max_wait = Some(max_wait);
        self.wd_response = response.map(str::to_string);
        self
    }

    /// Enable the rotating log file.
    #[must_use]
    pub fn log_file(mut self, dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        self.file_dir = Some(dir.into());
        self.filename = Some(filename.into());
        self
    }

    /// Set the rotation limits of the log file.
    #[must_use]
    pub const fn log_rotation(mut self, max_logs: usize, max_log_size: u64) -> Self {
        self.max_logs = max_logs;
        self.max_log_size = max_log_size;
        self
    }

    /// Time allowed for the logged-in phrase to appear.
    #[must_use]
    pub fn logged_phrase_timeout(&self) -> Duration {
        self.timeout.saturating_mul(LOGGED_PHRASE_TIMEOUT_FACTOR)
    }

    /// Command bound to a given operator trigger, if any.
    #[must_use]
    pub fn trigger_cmd(&self, trigger: crate::trigger::Trigger) -> Option<&str> {
        use crate::trigger::Trigger;
        match trigger {
            Trigger::Usr1 => self.sig_usr1_cmd.as_deref(),
            Trigger::Usr2 => self.sig_usr2_cmd.as_deref(),
            Trigger::Stop => None,
        }
    }
}

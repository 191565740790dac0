//! Layered configuration.
//!
//! Each source (built-in defaults, config file, command line) produces a
//! [`ConfigLayer`] whose fields are all optional. Layers are combined with
//! [`ConfigLayer::merge`], which applies precedence field by field, and the
//! result is checked and converted by [`ConfigLayer::resolve`].

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use super::{
    DEFAULT_LOGIN_PROMPT, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOGS, DEFAULT_PASSWORD_PROMPT,
    DEFAULT_PORT, DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_SESSION_TIMER_SECS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_WD_DELAY_SECS, MAX_DURATION_SECS, SessionConfig, env,
};
use crate::error::{Result, SessionError};

/// One configuration source. `None` means "not set by this layer".
///
/// Durations are whole seconds, as in the config file and on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    /// Remote host.
    pub host: Option<String>,
    /// Remote port.
    pub port: Option<u16>,
    /// Login name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Login prompt pattern.
    pub login_prompt: Option<String>,
    /// Password prompt pattern.
    pub password_prompt: Option<String>,
    /// Logged-in confirmation phrase.
    pub logged_phrase: Option<String>,
    /// Per-read timeout.
    pub timeout: Option<u64>,
    /// Delay after a fault.
    pub reconnect_delay: Option<u64>,
    /// Absolute session lifetime.
    pub session_timer: Option<u64>,
    /// Command sent after login.
    pub initial_cmd: Option<String>,
    /// Phrase that re-arms the initial command.
    pub initial_cmd_error_phrase: Option<String>,
    /// Command for SIGUSR1.
    pub sig_usr1_cmd: Option<String>,
    /// Command for SIGUSR2.
    pub sig_usr2_cmd: Option<String>,
    /// Watchdog command.
    pub wd_cmd: Option<String>,
    /// Interval between watchdog commands.
    pub wd_delay: Option<u64>,
    /// Watchdog response pattern.
    pub wd_response: Option<String>,
    /// Longest tolerated silence.
    pub wd_max_wait: Option<u64>,
    /// Log file name suffix.
    pub filename: Option<String>,
    /// Log file directory.
    pub file_dir: Option<PathBuf>,
    /// Rotated backups kept.
    pub max_logs: Option<usize>,
    /// Rotation size in bytes.
    pub max_log_size: Option<u64>,
    /// Credential table path.
    pub password_db: Option<PathBuf>,
}

/// Overlay `upper` onto `lower`: every field set in `upper` wins.
macro_rules! overlay_fields {
    ($lower:expr, $upper:expr, [$($field:ident),* $(,)?]) => {
        ConfigLayer {
            $($field: $upper.$field.or($lower.$field),)*
        }
    };
}

impl ConfigLayer {
    /// The built-in defaults layer.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            user: env::current_user(),
            login_prompt: Some(DEFAULT_LOGIN_PROMPT.to_string()),
            password_prompt: Some(DEFAULT_PASSWORD_PROMPT.to_string()),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            reconnect_delay: Some(DEFAULT_RECONNECT_DELAY_SECS),
            session_timer: Some(DEFAULT_SESSION_TIMER_SECS),
            wd_delay: Some(DEFAULT_WD_DELAY_SECS),
            max_logs: Some(DEFAULT_MAX_LOGS),
            max_log_size: Some(DEFAULT_MAX_LOG_SIZE),
            ..Self::default()
        }
    }

    /// Merge the three layers: command line over file over defaults.
    #[must_use]
    pub fn merge(defaults: Self, file: Self, command_line: Self) -> Self {
        defaults.overlay(file).overlay(command_line)
    }

    /// Return `self` with every field that `upper` sets replaced.
    #[must_use]
    pub fn overlay(self, upper: Self) -> Self {
        overlay_fields!(self, upper, [
            host,
            port,
            user,
            password,
            login_prompt,
            password_prompt,
            logged_phrase,
            timeout,
            reconnect_delay,
            session_timer,
            initial_cmd,
            initial_cmd_error_phrase,
            sig_usr1_cmd,
            sig_usr2_cmd,
            wd_cmd,
            wd_delay,
            wd_response,
            wd_max_wait,
            filename,
            file_dir,
            max_logs,
            max_log_size,
            password_db,
        ])
    }

    /// Whether the resolved session will wait for a password prompt.
    #[must_use]
    pub fn needs_password(&self) -> bool {
        non_empty(self.login_prompt.as_ref()).is_some()
            && non_empty(self.password_prompt.as_ref()).is_some()
    }

    /// Validate the merged layer and produce the session configuration.
    ///
    /// Empty strings and zero durations for optional behaviors disable them.
    /// Durations above [`MAX_DURATION_SECS`] are rejected.
    pub fn resolve(self) -> Result<SessionConfig> {
        for (name, secs) in [
            ("timeout", self.timeout),
            ("reconnect_delay", self.reconnect_delay),
            ("session_timer", self.session_timer),
            ("wd_delay", self.wd_delay),
            ("wd_max_wait", self.wd_max_wait),
        ] {
            if let Some(secs) = secs
                && secs > MAX_DURATION_SECS
            {
                return Err(SessionError::config(format!(
                    "{name} of {secs}s is out of range (at most {MAX_DURATION_SECS}s)"
                )));
            }
        }

        let needs_password = self.needs_password();
        let host = non_empty(self.host.as_ref())
            .ok_or_else(|| SessionError::config("no host given"))?;

        let config = SessionConfig {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: self.user.unwrap_or_default(),
            password: self.password,
            login_prompt: non_empty(self.login_prompt.as_ref()),
            password_prompt: non_empty(self.password_prompt.as_ref()),
            logged_phrase: non_empty(self.logged_phrase.as_ref()),
            timeout: Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            reconnect_delay: Duration::from_secs(
                self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY_SECS),
            ),
            session_timer: non_zero_secs(self.session_timer),
            initial_cmd: non_empty(self.initial_cmd.as_ref()),
            initial_cmd_error_phrase: non_empty(self.initial_cmd_error_phrase.as_ref()),
            sig_usr1_cmd: non_empty(self.sig_usr1_cmd.as_ref()),
            sig_usr2_cmd: non_empty(self.sig_usr2_cmd.as_ref()),
            wd_cmd: non_empty(self.wd_cmd.as_ref()),
            wd_delay: non_zero_secs(self.wd_delay),
            wd_response: non_empty(self.wd_response.as_ref()),
            wd_max_wait: non_zero_secs(self.wd_max_wait),
            filename: non_empty(self.filename.as_ref()),
            file_dir: self.file_dir,
            max_logs: self.max_logs.unwrap_or(DEFAULT_MAX_LOGS),
            max_log_size: self.max_log_size.unwrap_or(DEFAULT_MAX_LOG_SIZE),
        };

        if needs_password && config.password.is_none() {
            return Err(SessionError::config(format!(
                "no password available for {}",
                config.host
            )));
        }

        for pattern in [
            &config.login_prompt,
            &config.password_prompt,
            &config.logged_phrase,
            &config.wd_response,
            &config.initial_cmd_error_phrase,
        ]
        .into_iter()
        .flatten()
        {
            Regex::new(pattern)?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn non_zero_secs(value: Option<u64>) -> Option<Duration> {
    value.filter(|&s| s > 0).map(Duration::from_secs)
}

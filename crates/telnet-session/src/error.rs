//! Error types for telnet-session.
//!
//! Expected-phrase waits do not fail through this type: they report a
//! found/not-found [`ExpectOutcome`](crate::expect::ExpectOutcome). Only the
//! authenticator turns a miss into [`SessionError::Timeout`]. Everything else
//! here is a fault the reconnect supervisor logs and retries after a delay.

use std::time::Duration;

use thiserror::Error;

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Trailing lines shown when a buffer is too large to display whole.
const TAIL_LINES: usize = 6;

/// Format buffered remote text for display, truncating if necessary.
fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let lines: Vec<&str> = buffer.lines().collect();
    if buffer.len() <= MAX_BUFFER_DISPLAY || lines.len() <= TAIL_LINES {
        return format!(
            "┌─ received ({} bytes) ─────────────────────\n│ {}\n└────────────────────────────────────────",
            buffer.len(),
            lines.join("\n│ ")
        );
    }

    let tail = &lines[lines.len() - TAIL_LINES..];
    format!(
        "┌─ received ({} bytes, {} lines) ───────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer.len(),
        lines.len(),
        lines.len() - tail.len(),
        tail.join("\n│ ")
    )
}

fn format_timeout_error(duration: Duration, pattern: &str, buffer: &str) -> String {
    format!(
        "expected string not arriving after {duration:?}\n\
         \n\
         Pattern: '{pattern}'\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

fn format_eof_error(buffer: &str) -> String {
    format!(
        "connection closed by remote host\n\
         \n\
         {}",
        format_buffer_snippet(buffer)
    )
}

/// The main error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Opening the connection failed (refused, unreachable, name resolution).
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Opening the connection did not complete in time.
    #[error("connecting to {host}:{port} timed out after {duration:?}")]
    ConnectTimeout {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// A prompt or phrase did not arrive within its window.
    #[error("{}", format_timeout_error(*duration, pattern, buffer))]
    Timeout {
        /// The window that elapsed.
        duration: Duration,
        /// The pattern that was being waited for.
        pattern: String,
        /// Text received while waiting.
        buffer: String,
    },

    /// The remote host closed the connection.
    #[error("{}", format_eof_error(buffer))]
    Eof {
        /// Text received but not yet framed when the connection closed.
        buffer: String,
    },

    /// Invalid regex pattern in the configuration.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Signal registration error (Unix only).
    #[cfg(unix)]
    #[error("signal error: {message}")]
    Signal {
        /// Description of the signal error.
        message: String,
    },
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create an expected-phrase timeout error.
    pub fn timeout(
        duration: Duration,
        pattern: impl Into<String>,
        buffer: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            duration,
            pattern: pattern.into(),
            buffer: buffer.into(),
        }
    }

    /// Create a remote EOF error.
    pub fn eof(buffer: impl Into<String>) -> Self {
        Self::Eof {
            buffer: buffer.into(),
        }
    }

    /// Create a connect error.
    pub fn connect(host: impl Into<String>, port: u16, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            port,
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this is an expected-phrase timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is a transport-level fault.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::IoWithContext { .. }
                | Self::Connect { .. }
                | Self::ConnectTimeout { .. }
                | Self::Eof { .. }
        )
    }

    /// Short, stable name of the fault class, for log lines.
    #[must_use]
    pub const fn fault_class(&self) -> &'static str {
        match self {
            Self::Io(_) | Self::IoWithContext { .. } => "io",
            Self::Connect { .. } | Self::ConnectTimeout { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Eof { .. } => "eof",
            Self::Regex(_) | Self::Config { .. } => "config",
            #[cfg(unix)]
            Self::Signal { .. } => "signal",
        }
    }

    /// Get the buffered text if this error carries it.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Timeout { buffer, .. } | Self::Eof { buffer } => Some(buffer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = SessionError::timeout(Duration::from_secs(5), "login:", "Welcome to router\n");
        let msg = err.to_string();
        assert!(msg.contains("expected string not arriving"));
        assert!(msg.contains("login:"));
        assert!(msg.contains("Welcome to router"));
    }

    #[test]
    fn empty_buffer_display() {
        let msg = SessionError::eof("").to_string();
        assert!(msg.contains("closed by remote host"));
        assert!(msg.contains("empty buffer"));
    }

    #[test]
    fn large_buffer_is_truncated() {
        let large: String = (0..50).fold(String::new(), |mut acc, i| {
            use std::fmt::Write;
            let _ = writeln!(acc, "Line {i}: some console output here");
            acc
        });

        let msg = SessionError::timeout(Duration::from_secs(1), "x", &large).to_string();
        assert!(msg.contains("lines hidden"));
        assert!(msg.contains("Line 49"));
        assert!(!msg.contains("Line 3:"));
    }

    #[test]
    fn fault_classes() {
        let refused = SessionError::connect(
            "10.0.0.1",
            23,
            std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(refused.fault_class(), "transport");
        assert!(refused.is_transport());

        let timeout = SessionError::timeout(Duration::from_secs(1), "login:", "");
        assert_eq!(timeout.fault_class(), "timeout");
        assert!(timeout.is_timeout());
        assert!(!timeout.is_transport());

        assert_eq!(SessionError::eof("").fault_class(), "eof");
        assert_eq!(SessionError::config("bad").fault_class(), "config");
    }

    #[test]
    fn io_context_helper() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        let msg = SessionError::with_io_context(result, "opening log file")
            .unwrap_err()
            .to_string();
        assert!(msg.contains("opening log file"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn buffer_accessor() {
        assert_eq!(SessionError::eof("tail").buffer(), Some("tail"));
        assert!(SessionError::config("x").buffer().is_none());
    }
}

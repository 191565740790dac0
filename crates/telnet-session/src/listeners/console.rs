use std::io::{self, Write};

use chrono::Local;

use crate::pipeline::{LineListener, ListenerAction, Origin, Severity};

/// Prints `<local time>: <line>` for every line at or above a severity.
pub struct ConsoleListener<W = io::Stdout> {
    writer: W,
    min_severity: Severity,
}

impl ConsoleListener {
    /// Echo to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl<W: Write + Send> ConsoleListener<W> {
    /// Echo to `writer`.
    #[must_use]
    pub const fn with_writer(writer: W) -> Self {
        Self {
            writer,
            min_severity: Severity::Info,
        }
    }

    /// Set the lowest severity that is printed.
    #[must_use]
    pub const fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Consume the listener and return its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> LineListener for ConsoleListener<W> {
    fn on_line(&mut self, line: &str, _origin: Origin, severity: Severity) -> ListenerAction {
        if severity >= self.min_severity {
            let stamp = Local::now().format("%c");
            if let Err(e) = writeln!(self.writer, "{stamp}: {line}").and_then(|()| self.writer.flush())
            {
                tracing::warn!(error = %e, "console write failed");
            }
        }
        ListenerAction::Continue
    }
}

impl<W> std::fmt::Debug for ConsoleListener<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleListener")
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

//! Waiting for a pattern in the incoming byte stream.
//!
//! Unlike line framing, expectation works on unterminated text, since
//! prompts such as `login: ` are not followed by a newline.

use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::error::{Result, SessionError};
use crate::line_buffer::decode_latin1;
use crate::transport::Transport;

/// Read chunk size.
const READ_CHUNK: usize = 4096;

/// Result of waiting for a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// The pattern matched.
    Found {
        /// Text consumed, up to and including the match.
        received: String,
        /// The matched text.
        matched: String,
    },
    /// The window elapsed first.
    NotFound {
        /// Everything received while waiting.
        received: String,
    },
}

impl ExpectOutcome {
    /// Whether the pattern matched.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// The text received while waiting.
    #[must_use]
    pub fn received(&self) -> &str {
        match self {
            Self::Found { received, .. } | Self::NotFound { received } => received,
        }
    }
}

/// Reads a transport until a pattern appears, keeping unconsumed bytes.
///
/// Bytes after a match stay buffered for the next wait, and can be handed to
/// line framing with [`Expecter::into_leftover`] once the handshake is over.
#[derive(Debug, Default)]
pub struct Expecter {
    pending: Vec<u8>,
}

impl Expecter {
    /// Create an expecter with nothing buffered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for `pattern` to appear.
    ///
    /// On a match, text through the end of the match is consumed. On a miss,
    /// everything buffered is consumed and returned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Eof`] if the peer closes the connection and an
    /// I/O error if reading fails. A miss is not an error.
    pub async fn expect<T: Transport>(
        &mut self,
        transport: &mut T,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<ExpectOutcome> {
        let deadline = Instant::now().checked_add(timeout);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(outcome) = self.try_match(pattern) {
                return Ok(outcome);
            }

            let remaining = deadline.map_or(timeout, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                return Ok(self.miss());
            }

            match tokio::time::timeout(remaining, transport.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    let received = decode_latin1(&std::mem::take(&mut self.pending));
                    return Err(SessionError::eof(received));
                }
                Ok(Ok(n)) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    SessionError::with_io_context(
                        transport.flush().await,
                        "answering telnet negotiation",
                    )?;
                }
                Ok(Err(e)) => return Err(SessionError::io_context("reading from remote host", e)),
                Err(_) => return Ok(self.miss()),
            }
        }
    }

    fn try_match(&mut self, pattern: &Regex) -> Option<ExpectOutcome> {
        let text = decode_latin1(&self.pending);
        let found = pattern.find(&text)?;
        // One char per byte, so the char count is the raw offset.
        let consumed = text[..found.end()].chars().count();
        self.pending.drain(..consumed);
        Some(ExpectOutcome::Found {
            received: text[..found.end()].to_string(),
            matched: found.as_str().to_string(),
        })
    }

    fn miss(&mut self) -> ExpectOutcome {
        ExpectOutcome::NotFound {
            received: decode_latin1(&std::mem::take(&mut self.pending)),
        }
    }

    /// Bytes received but not consumed by any wait.
    #[must_use]
    pub fn into_leftover(self) -> Vec<u8> {
        self.pending
    }
}

use regex::Regex;

use crate::error::Result;
use crate::pipeline::{LineListener, ListenerAction, Origin, Severity};
use crate::watchdog::anchored;

/// Requests the initial command again when a remote line starts with the
/// error phrase.
#[derive(Debug, Clone)]
pub struct InitialCommandErrorListener {
    phrase: Regex,
}

impl InitialCommandErrorListener {
    /// Watch for `phrase` at the start of remote lines.
    ///
    /// # Errors
    ///
    /// Returns an error if `phrase` is not a valid regex.
    pub fn new(phrase: &str) -> Result<Self> {
        Ok(Self {
            phrase: anchored(phrase)?,
        })
    }
}

impl LineListener for InitialCommandErrorListener {
    fn on_line(&mut self, line: &str, origin: Origin, _severity: Severity) -> ListenerAction {
        if origin == Origin::Remote && self.phrase.is_match(line) {
            ListenerAction::RearmInitialCommand
        } else {
            ListenerAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_phrase_requests_rearm() {
        let mut listener = InitialCommandErrorListener::new("% Invalid").unwrap();
        assert_eq!(
            listener.on_line("% Invalid input detected", Origin::Remote, Severity::Info),
            ListenerAction::RearmInitialCommand
        );
    }

    #[test]
    fn phrase_must_lead_the_line() {
        let mut listener = InitialCommandErrorListener::new("% Invalid").unwrap();
        assert_eq!(
            listener.on_line("echo % Invalid", Origin::Remote, Severity::Info),
            ListenerAction::Continue
        );
    }

    #[test]
    fn local_and_internal_lines_are_ignored() {
        let mut listener = InitialCommandErrorListener::new("% Invalid").unwrap();
        for origin in [Origin::Local, Origin::Internal] {
            assert_eq!(
                listener.on_line("% Invalid input", origin, Severity::Error),
                ListenerAction::Continue
            );
        }
    }
}

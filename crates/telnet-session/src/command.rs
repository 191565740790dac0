//! The single-slot outbound command queue.

/// Separator between segments of one armed command.
pub const SEGMENT_SEPARATOR: char = '|';

/// At most one armed command, drained one `|`-separated segment per tick.
///
/// Arming replaces whatever is still queued.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    slot: Option<String>,
}

impl PendingCommand {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Arm `command`, replacing anything still queued.
    pub fn arm(&mut self, command: impl Into<String>) {
        let command = command.into();
        self.slot = (!command.is_empty()).then_some(command);
    }

    /// Whether a segment is waiting to be sent.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// What is still queued, separators included.
    #[must_use]
    pub fn peek(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Drop whatever is queued.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Take the next segment, keeping the remainder queued.
    ///
    /// An empty remainder empties the slot, so `"A|"` yields only `"A"`, while
    /// `"A||B"` yields `"A"`, `""` and `"B"` on successive calls.
    pub fn next_segment(&mut self) -> Option<String> {
        let command = self.slot.take()?;
        match command.split_once(SEGMENT_SEPARATOR) {
            Some((head, rest)) => {
                if !rest.is_empty() {
                    self.slot = Some(rest.to_string());
                }
                Some(head.to_string())
            }
            None => Some(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(pending: &mut PendingCommand) -> Vec<String> {
        std::iter::from_fn(|| pending.next_segment()).collect()
    }

    #[test]
    fn one_segment_per_call_in_order() {
        let mut pending = PendingCommand::new();
        pending.arm("A|B|C");

        assert_eq!(pending.next_segment().as_deref(), Some("A"));
        assert_eq!(pending.peek(), Some("B|C"));
        assert_eq!(pending.next_segment().as_deref(), Some("B"));
        assert_eq!(pending.next_segment().as_deref(), Some("C"));
        assert!(!pending.is_armed());
        assert_eq!(pending.next_segment(), None);
    }

    #[test]
    fn single_segment() {
        let mut pending = PendingCommand::new();
        pending.arm("show log");
        assert_eq!(drain(&mut pending), vec!["show log"]);
    }

    #[test]
    fn trailing_separator_is_dropped() {
        let mut pending = PendingCommand::new();
        pending.arm("A|");
        assert_eq!(drain(&mut pending), vec!["A"]);
    }

    #[test]
    fn inner_empty_segment_is_sent() {
        let mut pending = PendingCommand::new();
        pending.arm("A||B");
        assert_eq!(drain(&mut pending), vec!["A", "", "B"]);
    }

    #[test]
    fn last_writer_wins() {
        let mut pending = PendingCommand::new();
        pending.arm("A|B");
        assert_eq!(pending.next_segment().as_deref(), Some("A"));
        pending.arm("X");
        assert_eq!(drain(&mut pending), vec!["X"]);
    }

    #[test]
    fn arming_empty_clears() {
        let mut pending = PendingCommand::new();
        pending.arm("A");
        pending.arm("");
        assert!(!pending.is_armed());
    }
}

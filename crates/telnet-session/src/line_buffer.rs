//! Line framing of the remote byte stream.
//!
//! Bytes are decoded as ISO-8859-1, so every byte maps to exactly one `char`
//! and no input is ever rejected. A line ends at `\n`; trailing `\r`s are
//! stripped and empty lines are dropped.
//!
//! No line-length limit is enforced: a peer that never sends `\n` makes the
//! residual grow without bound.

use bytes::{Buf, BytesMut};

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    residual: BytesMut,
}

impl LineBuffer {
    /// Create an empty line buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` and iterate over the lines it completes.
    ///
    /// Lines not pulled from the iterator stay buffered and are yielded by
    /// the next call.
    pub fn feed(&mut self, data: &[u8]) -> Lines<'_> {
        self.residual.extend_from_slice(data);
        Lines { buffer: self }
    }

    /// Number of buffered bytes not yet terminated by a newline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.residual.len()
    }

    /// The unterminated tail, decoded.
    #[must_use]
    pub fn residual(&self) -> String {
        decode_latin1(&self.residual)
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.residual.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let end = self.residual.iter().position(|&b| b == b'\n')?;
            let mut raw = self.residual.split_to(end + 1);
            raw.truncate(end);
            while raw.last() == Some(&b'\r') {
                raw.truncate(raw.len() - 1);
            }
            if !raw.is_empty() {
                return Some(decode_latin1(raw.chunk()));
            }
        }
    }
}

/// Lines completed by one [`LineBuffer::feed`] call.
#[derive(Debug)]
pub struct Lines<'a> {
    buffer: &'a mut LineBuffer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.buffer.next_line()
    }
}

/// Decode ISO-8859-1 bytes.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn partial_line_waits_for_newline() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.feed(b"hello\r\nworld").collect();
        assert_eq!(lines, vec!["hello"]);
        assert_eq!(buffer.residual(), "world");

        let lines: Vec<String> = buffer.feed(b"\n").collect();
        assert_eq!(lines, vec!["world"]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn empty_lines_are_dropped() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.feed(b"\n\r\n\r\r\nx\n\n").collect();
        assert_eq!(lines, vec!["x"]);
    }

    #[test]
    fn only_trailing_carriage_returns_are_stripped() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.feed(b"a\rb\r\r\n").collect();
        assert_eq!(lines, vec!["a\rb"]);
    }

    #[test]
    fn unconsumed_lines_survive_to_next_feed() {
        let mut buffer = LineBuffer::new();
        let first = buffer.feed(b"one\ntwo\n").next();
        assert_eq!(first.as_deref(), Some("one"));

        let rest: Vec<String> = buffer.feed(b"three\n").collect();
        assert_eq!(rest, vec!["two", "three"]);
    }

    #[test]
    fn high_bytes_decode_as_latin1() {
        let mut buffer = LineBuffer::new();
        let lines: Vec<String> = buffer.feed(b"caf\xe9 \xff\n").collect();
        assert_eq!(lines, vec!["caf\u{e9} \u{ff}"]);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_lines(
            text in "[a-z\r\n]{0,200}",
            cut in 0usize..200,
        ) {
            let bytes = text.as_bytes();
            let cut = cut.min(bytes.len());

            let mut whole = LineBuffer::new();
            let expected: Vec<String> = whole.feed(bytes).collect();

            let mut split = LineBuffer::new();
            let mut actual: Vec<String> = split.feed(&bytes[..cut]).collect();
            actual.extend(split.feed(&bytes[cut..]));

            prop_assert_eq!(actual, expected);
            prop_assert_eq!(split.pending(), whole.pending());
        }

        #[test]
        fn lines_never_contain_newlines_or_end_in_cr(text in "[a-z\r\n]{0,200}") {
            let mut buffer = LineBuffer::new();
            for line in buffer.feed(text.as_bytes()) {
                prop_assert!(!line.is_empty());
                prop_assert!(!line.contains('\n'));
                prop_assert!(!line.ends_with('\r'));
            }
        }
    }
}

//! Minimal telnet framing over any async byte stream.
//!
//! Every option the peer proposes is refused. Command sequences never reach
//! the caller; everything else is passed through unchanged apart from NUL and
//! DC1 padding bytes, which are dropped.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::Transport;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const NUL: u8 = 0;
const DC1: u8 = 0x11;

/// Read chunk size.
const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Data,
    /// After IAC.
    Command,
    /// After IAC DO/DONT/WILL/WONT, waiting for the option byte.
    Option(u8),
    /// Inside IAC SB ... IAC SE.
    Subnegotiation,
    /// After IAC inside a subnegotiation.
    SubnegotiationIac,
}

/// Telnet protocol layer over `S`.
#[derive(Debug)]
pub struct TelnetStream<S> {
    inner: S,
    state: DecodeState,
    /// Negotiation replies waiting for the next write or flush.
    replies: Vec<u8>,
}

impl<S> TelnetStream<S> {
    /// Wrap a connected stream.
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            state: DecodeState::Data,
            replies: Vec::new(),
        }
    }

    /// The wrapped stream.
    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the stream, discarding queued replies.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Whether negotiation replies are waiting to be written.
    #[must_use]
    pub fn has_pending_replies(&self) -> bool {
        !self.replies.is_empty()
    }

    /// Strip protocol bytes from `raw`, appending data to `out`.
    fn decode(&mut self, raw: &[u8], out: &mut Vec<u8>) {
        for &byte in raw {
            self.state = match (self.state, byte) {
                (DecodeState::Data, IAC) => DecodeState::Command,
                (DecodeState::Data, NUL | DC1) => DecodeState::Data,
                (DecodeState::Data, b) => {
                    out.push(b);
                    DecodeState::Data
                }
                (DecodeState::Command, IAC) => {
                    out.push(IAC);
                    DecodeState::Data
                }
                (DecodeState::Command, cmd @ (DO | DONT | WILL | WONT)) => DecodeState::Option(cmd),
                (DecodeState::Command, SB) => DecodeState::Subnegotiation,
                (DecodeState::Command, _) => DecodeState::Data,
                (DecodeState::Option(cmd), option) => {
                    self.refuse(cmd, option);
                    DecodeState::Data
                }
                (DecodeState::Subnegotiation, IAC) => DecodeState::SubnegotiationIac,
                (DecodeState::Subnegotiation, _) => DecodeState::Subnegotiation,
                (DecodeState::SubnegotiationIac, SE) => DecodeState::Data,
                (DecodeState::SubnegotiationIac, _) => DecodeState::Subnegotiation,
            };
        }
    }

    fn refuse(&mut self, cmd: u8, option: u8) {
        let reply = match cmd {
            DO => WONT,
            WILL => DONT,
            _ => return,
        };
        tracing::trace!(cmd, option, reply, "refusing telnet option");
        self.replies.extend_from_slice(&[IAC, reply, option]);
    }
}

/// Double every IAC byte.
fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == IAC {
            out.push(IAC);
        }
    }
    out
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> TelnetStream<S> {
    async fn write_replies(&mut self) -> io::Result<()> {
        if !self.replies.is_empty() {
            let replies = std::mem::take(&mut self.replies);
            self.inner.write_all(&replies).await?;
        }
        Ok(())
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for TelnetStream<S> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut raw = [0u8; READ_CHUNK];
        let want = buf.len().min(READ_CHUNK);
        let mut data = Vec::with_capacity(want);

        // Loop until some data survives decoding; a chunk made only of
        // protocol bytes is not end of stream.
        loop {
            let n = self.inner.read(&mut raw[..want]).await?;
            if n == 0 {
                return Ok(0);
            }
            self.decode(&raw[..n], &mut data);
            if !data.is_empty() {
                buf[..data.len()].copy_from_slice(&data);
                return Ok(data.len());
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_replies().await?;
        self.inner.write_all(&escape(data)).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.write_replies().await?;
        self.inner.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    fn decode_all(input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut stream = TelnetStream::new(());
        let mut out = Vec::new();
        stream.decode(input, &mut out);
        (out, stream.replies)
    }

    #[test]
    fn plain_data_passes_through() {
        let (out, replies) = decode_all(b"login: ");
        assert_eq!(out, b"login: ");
        assert!(replies.is_empty());
    }

    #[test]
    fn options_are_refused() {
        let (out, replies) = decode_all(&[IAC, DO, 24, b'a', IAC, WILL, 1, b'b']);
        assert_eq!(out, b"ab");
        assert_eq!(replies, vec![IAC, WONT, 24, IAC, DONT, 1]);
    }

    #[test]
    fn refusals_are_not_acknowledged() {
        let (out, replies) = decode_all(&[IAC, DONT, 24, IAC, WONT, 1, b'x']);
        assert_eq!(out, b"x");
        assert!(replies.is_empty());
    }

    #[test]
    fn escaped_iac_is_data() {
        let (out, _) = decode_all(&[b'a', IAC, IAC, b'b']);
        assert_eq!(out, vec![b'a', 0xFF, b'b']);
    }

    #[test]
    fn subnegotiation_is_skipped() {
        let (out, _) = decode_all(&[b'a', IAC, SB, 24, 1, IAC, IAC, 7, IAC, SE, b'b']);
        assert_eq!(out, b"ab");
    }

    #[test]
    fn padding_bytes_are_dropped() {
        let (out, _) = decode_all(b"a\r\0b\x11c");
        assert_eq!(out, b"a\rbc");
    }

    #[test]
    fn sequence_split_across_chunks() {
        let mut stream = TelnetStream::new(());
        let mut out = Vec::new();
        stream.decode(&[b'a', IAC], &mut out);
        stream.decode(&[DO], &mut out);
        stream.decode(&[3, b'b'], &mut out);
        assert_eq!(out, b"ab");
        assert_eq!(stream.replies, vec![IAC, WONT, 3]);
    }

    #[test]
    fn writes_escape_iac() {
        assert_eq!(escape(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }

    #[tokio::test]
    async fn replies_are_sent_on_flush() {
        let (local, mut remote) = duplex(256);
        let mut stream = TelnetStream::new(local);

        remote.write_all(&[IAC, DO, 31, IAC, WILL, 3]).await.unwrap();
        remote.write_all(b"hi\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hi\n");
        assert!(stream.has_pending_replies());

        stream.flush().await.unwrap();
        assert!(!stream.has_pending_replies());

        let mut got = [0u8; 6];
        remote.read_exact(&mut got).await.unwrap();
        assert_eq!(got, [IAC, WONT, 31, IAC, DONT, 3]);
    }

    #[tokio::test]
    async fn protocol_only_chunk_is_not_eof() {
        let (local, mut remote) = duplex(256);
        let mut stream = TelnetStream::new(local);

        remote.write_all(&[IAC, DO, 1]).await.unwrap();
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });
        tokio::task::yield_now().await;
        remote.write_all(b"data").await.unwrap();

        assert_eq!(reader.await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn closed_peer_reads_zero() {
        let (local, remote) = duplex(16);
        let mut stream = TelnetStream::new(local);
        drop(remote);
        let mut buf = [0u8; 16];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }
}

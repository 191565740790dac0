//! Byte transports and the connectors that open them.
//!
//! The engine is generic over [`Connector`], so tests can hand it in-memory
//! streams while production code uses [`TcpConnector`].

mod tcp;
mod telnet;

use std::future::Future;
use std::io;
use std::time::Duration;

pub use tcp::TcpConnector;
pub use telnet::TelnetStream;

use crate::error::{Result, SessionError};

/// A connected, bidirectional byte stream.
pub trait Transport: Send {
    /// Read available data into `buf`. `Ok(0)` means the peer closed.
    ///
    /// Must be cancel-safe: dropping the future before it completes loses no
    /// data.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Flush buffered writes, including protocol replies queued by reads.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Close the write half.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Opens transports to a host.
pub trait Connector: Send {
    /// The transport produced.
    type Stream: Transport;

    /// Open a connection to `host:port`, giving up after `timeout`.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Write `text` followed by `\n` and flush.
pub(crate) async fn send_line<T: Transport>(transport: &mut T, text: &str) -> Result<()> {
    let line = format!("{text}\n");
    SessionError::with_io_context(
        transport.write_all(line.as_bytes()).await,
        "writing to remote host",
    )?;
    SessionError::with_io_context(transport.flush().await, "flushing to remote host")
}

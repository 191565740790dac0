use std::time::Duration;

use tokio::net::TcpStream;

use super::{Connector, TelnetStream};
use crate::error::{Result, SessionError};

/// Opens telnet connections over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Create a TCP connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for TcpConnector {
    type Stream = TelnetStream<TcpStream>;

    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<Self::Stream> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(SessionError::connect(host, port, e)),
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    host: host.to_string(),
                    port,
                    duration: timeout,
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }
        tracing::debug!(host, port, "tcp connection established");
        Ok(TelnetStream::new(stream))
    }
}

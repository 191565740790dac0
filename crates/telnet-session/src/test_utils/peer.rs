//! The remote end of an in-memory connection.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

/// Plays the remote host.
#[derive(Debug)]
pub struct RemotePeer {
    stream: BufReader<DuplexStream>,
}

impl RemotePeer {
    pub(crate) fn new(stream: DuplexStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Send raw text.
    pub async fn send(&mut self, text: &str) -> io::Result<()> {
        self.send_bytes(text.as_bytes()).await
    }

    /// Send raw bytes.
    pub async fn send_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Send `text` terminated by `\r\n`.
    pub async fn send_line(&mut self, text: &str) -> io::Result<()> {
        self.send(&format!("{text}\r\n")).await
    }

    /// Read one line sent by the engine, without its terminator.
    ///
    /// Returns `None` once the engine has closed the connection.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.stream.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Wait until the engine closes the connection, returning what it sent
    /// in the meantime.
    pub async fn closed(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }
}

//! An in-memory connector.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{DuplexStream, duplex};
use tokio::time::Instant;

use super::RemotePeer;
use crate::error::{Result, SessionError};
use crate::transport::{Connector, TelnetStream};

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Default)]
struct Shared {
    outcomes: VecDeque<std::result::Result<DuplexStream, io::ErrorKind>>,
    attempts: Vec<Instant>,
}

/// Serves queued connection outcomes in order.
///
/// Each [`push_peer`](Self::push_peer) queues one successful connection and
/// returns its far end; each [`push_failure`](Self::push_failure) queues one
/// refused attempt. Once the queue is empty, every attempt is refused.
/// Clones share the queue and the attempt log.
#[derive(Debug, Clone, Default)]
pub struct DuplexConnector {
    shared: Arc<Mutex<Shared>>,
}

impl DuplexConnector {
    /// Create a connector with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a successful connection and return the remote side of it.
    #[must_use]
    pub fn push_peer(&self) -> RemotePeer {
        let (local, remote) = duplex(PIPE_CAPACITY);
        self.shared().outcomes.push_back(Ok(local));
        RemotePeer::new(remote)
    }

    /// Queue a failed connection attempt.
    pub fn push_failure(&self, kind: io::ErrorKind) {
        self.shared().outcomes.push_back(Err(kind));
    }

    /// When each connection attempt was made.
    #[must_use]
    pub fn attempts(&self) -> Vec<Instant> {
        self.shared().attempts.clone()
    }

    /// Number of connection attempts made.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.shared().attempts.len()
    }
}

impl Connector for DuplexConnector {
    type Stream = TelnetStream<DuplexStream>;

    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<Self::Stream> {
        let outcome = {
            let mut shared = self.shared();
            shared.attempts.push(Instant::now());
            shared.outcomes.pop_front()
        };
        match outcome {
            Some(Ok(stream)) => Ok(TelnetStream::new(stream)),
            Some(Err(kind)) => Err(SessionError::connect(host, port, io::Error::from(kind))),
            None => Err(SessionError::connect(
                host,
                port,
                io::Error::from(io::ErrorKind::ConnectionRefused),
            )),
        }
    }
}

//! telnet-session: unattended, self-healing telnet console sessions
//!
//! This crate keeps a line-oriented remote console (a router, a serial
//! console server, an embedded board) connected for a bounded lifetime,
//! logging everything it prints and reconnecting whenever it goes quiet or
//! the connection breaks.
//!
//! # Architecture
//!
//! - [`Engine`] connects through a [`Connector`], logs in with the
//!   [`Authenticator`](auth::Authenticator), then runs the session loop:
//!   pending command segments out, remote lines through the
//!   [`FilterPipeline`] and on to the [`ListenerPipeline`].
//! - [`Watchdog`] is a filter that tracks remote silence and hides its own
//!   probe responses.
//! - [`Supervisor`] wraps the engine and decides between immediate
//!   reconnects (watchdog expiry), delayed retries (faults) and shutdown
//!   (session deadline, operator stop).
//!
//! # Example
//!
//! ```ignore
//! use telnet_session::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::new("console-server", 2003)
//!         .credentials("admin", "secret")
//!         .watchdog_cmd("show clock", std::time::Duration::from_secs(30))
//!         .watchdog(std::time::Duration::from_secs(120), Some(r"\d+:\d+:\d+"));
//!
//!     let engine = Engine::builder(config, TcpConnector::new())
//!         .listener(ConsoleListener::stdout())
//!         .build()?;
//!     Supervisor::new(engine).run().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod command;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod expect;
pub mod line_buffer;
pub mod listeners;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod supervisor;
pub mod transport;
pub mod trigger;
pub mod watchdog;

pub use command::PendingCommand;
pub use config::{ConfigLayer, SessionConfig};
pub use credentials::{CredentialError, CredentialTable, resolve_password};
pub use engine::{Connection, Engine, EngineBuilder, SessionEnd};
pub use error::{Result, SessionError};
pub use expect::{ExpectOutcome, Expecter};
pub use line_buffer::LineBuffer;
pub use listeners::{ConsoleListener, FileListener, InitialCommandErrorListener, RotatingFile};
pub use pipeline::{
    FilterPipeline, LineFilter, LineListener, ListenerAction, ListenerPipeline, Origin, Severity,
};
pub use supervisor::{Supervisor, SupervisorExit, SupervisorState};
pub use transport::{Connector, TcpConnector, TelnetStream, Transport};
pub use trigger::Trigger;
pub use watchdog::Watchdog;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

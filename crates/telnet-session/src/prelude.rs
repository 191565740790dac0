//! Common imports for building and running a session.
//!
//! ```ignore
//! use telnet_session::prelude::*;
//! ```

pub use crate::config::{ConfigLayer, SessionConfig};
pub use crate::engine::{Engine, SessionEnd};
pub use crate::error::{Result, SessionError};
pub use crate::listeners::{ConsoleListener, FileListener};
pub use crate::pipeline::{LineFilter, LineListener, ListenerAction, Origin, Severity};
pub use crate::supervisor::{Supervisor, SupervisorExit};
pub use crate::transport::{Connector, TcpConnector, Transport};
pub use crate::trigger::Trigger;

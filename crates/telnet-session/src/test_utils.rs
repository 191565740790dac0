//! Test doubles for driving an engine without a network.
//!
//! [`DuplexConnector`] hands out in-memory streams whose far ends are
//! wrapped in a [`RemotePeer`]; [`CaptureListener`] records every line the
//! engine dispatches.

mod capture;
mod connector;
mod peer;

pub use capture::{CaptureListener, CapturedLine};
pub use connector::DuplexConnector;
pub use peer::RemotePeer;

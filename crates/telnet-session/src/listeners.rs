//! Built-in listeners.
//!
//! - [`ConsoleListener`] echoes lines with a local timestamp.
//! - [`FileListener`] appends timestamped records to a [`RotatingFile`].
//! - [`InitialCommandErrorListener`] asks for the initial command to be resent
//!   when the remote host reports it failed.

mod console;
mod file;
mod retry;

pub use console::ConsoleListener;
pub use file::{FileListener, RotatingFile, log_file_path};
pub use retry::InitialCommandErrorListener;

//! Interactive password prompt.

use std::io::{self, BufRead, IsTerminal, Write};

const PROMPT: &str = "password for telnet session:";

/// Ask the operator for the password of `host`.
///
/// Returns `None` when stdin is not a terminal or the prompt fails.
pub fn ask_password(host: &str) -> Option<String> {
    if !io::stdin().is_terminal() {
        return None;
    }
    match read_password() {
        Ok(password) => Some(password),
        Err(e) => {
            tracing::warn!(host, error = %e, "password prompt failed");
            None
        }
    }
}

fn read_password() -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{PROMPT}")?;
    stderr.flush()?;

    let line = {
        let _echo = echo::disable()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line
    };
    writeln!(stderr)?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(unix)]
mod echo {
    use std::io;
    use std::os::fd::AsFd;

    use rustix::termios::{LocalModes, OptionalActions, Termios, tcgetattr, tcsetattr};

    /// Restores the saved terminal modes when dropped.
    pub struct EchoGuard {
        saved: Termios,
    }

    pub fn disable() -> io::Result<EchoGuard> {
        let stdin = io::stdin();
        let saved = tcgetattr(stdin.as_fd())?;
        let mut quiet = saved.clone();
        quiet.local_modes.remove(LocalModes::ECHO);
        tcsetattr(stdin.as_fd(), OptionalActions::Now, &quiet)?;
        Ok(EchoGuard { saved })
    }

    impl Drop for EchoGuard {
        fn drop(&mut self) {
            let stdin = io::stdin();
            if let Err(e) = tcsetattr(stdin.as_fd(), OptionalActions::Now, &self.saved) {
                tracing::warn!(error = %e, "could not restore terminal echo");
            }
        }
    }
}

#[cfg(not(unix))]
mod echo {
    use std::io;

    pub struct EchoGuard;

    // Echo stays on where termios is unavailable.
    #[allow(clippy::unnecessary_wraps)]
    pub const fn disable() -> io::Result<EchoGuard> {
        Ok(EchoGuard)
    }
}

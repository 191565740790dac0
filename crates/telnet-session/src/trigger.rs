//! Out-of-band operator triggers.
//!
//! Triggers reach the engine through an unbounded channel and are handled
//! inside its tick loop, never from signal context. On Unix,
//! [`spawn_signal_bridge`] forwards SIGUSR1/SIGUSR2 as [`Trigger::Usr1`] /
//! [`Trigger::Usr2`] and SIGINT/SIGTERM as [`Trigger::Stop`].

use tokio::sync::mpsc;

/// An operator-raised event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// First operator event; arms `sig_usr1_cmd`.
    Usr1,
    /// Second operator event; arms `sig_usr2_cmd`.
    Usr2,
    /// Stop the engine and the supervisor.
    Stop,
}

impl Trigger {
    /// Short name for log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Usr1 => "USR1",
            Self::Usr2 => "USR2",
            Self::Stop => "STOP",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sending half of a trigger channel.
pub type TriggerSender = mpsc::UnboundedSender<Trigger>;

/// Receiving half of a trigger channel, owned by the engine.
pub type TriggerReceiver = mpsc::UnboundedReceiver<Trigger>;

/// Create a trigger channel.
#[must_use]
pub fn channel() -> (TriggerSender, TriggerReceiver) {
    mpsc::unbounded_channel()
}

/// Send `trigger` to the engine. Returns `false` once the engine is gone.
#[must_use]
pub fn deliver(triggers: &TriggerSender, trigger: Trigger) -> bool {
    if triggers.send(trigger).is_err() {
        tracing::debug!(%trigger, "trigger channel closed, dropping trigger");
        return false;
    }
    true
}

#[cfg(unix)]
pub use self::unix::{SignalBridge, spawn_signal_bridge, trigger_for_signal};

#[cfg(unix)]
mod unix {
    use futures::StreamExt;
    use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
    use signal_hook_tokio::{Handle, Signals};
    use tokio::task::JoinHandle;

    use super::{Trigger, TriggerSender, deliver};
    use crate::error::{Result, SessionError};

    /// Map a signal number to its trigger.
    #[must_use]
    pub const fn trigger_for_signal(signal: i32) -> Option<Trigger> {
        match signal {
            SIGUSR1 => Some(Trigger::Usr1),
            SIGUSR2 => Some(Trigger::Usr2),
            SIGINT | SIGTERM => Some(Trigger::Stop),
            _ => None,
        }
    }

    /// A running signal-to-trigger bridge. Dropping it unregisters the
    /// signal stream and stops the forwarding task.
    #[derive(Debug)]
    pub struct SignalBridge {
        handle: Handle,
        task: JoinHandle<()>,
    }

    impl SignalBridge {
        /// Stop forwarding signals.
        pub fn close(&self) {
            self.handle.close();
            self.task.abort();
        }
    }

    impl Drop for SignalBridge {
        fn drop(&mut self) {
            self.close();
        }
    }

    /// Forward process signals into `triggers` from a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signal`] if the handlers cannot be registered.
    pub fn spawn_signal_bridge(triggers: TriggerSender) -> Result<SignalBridge> {
        let signals = Signals::new([SIGUSR1, SIGUSR2, SIGINT, SIGTERM]).map_err(|e| {
            SessionError::Signal {
                message: e.to_string(),
            }
        })?;
        let handle = signals.handle();

        let task = tokio::spawn(async move {
            let mut signals = signals;
            while let Some(signal) = signals.next().await {
                let Some(trigger) = trigger_for_signal(signal) else {
                    continue;
                };
                tracing::debug!(signal, %trigger, "signal received");
                if !deliver(&triggers, trigger) {
                    break;
                }
            }
        });

        Ok(SignalBridge { handle, task })
    }
}

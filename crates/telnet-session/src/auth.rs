//! Login handshake.

use std::time::Duration;

use regex::Regex;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::expect::{ExpectOutcome, Expecter};
use crate::pipeline::{ListenerPipeline, Origin, Severity};
use crate::transport::{Transport, send_line};

/// Drives the login / password / logged-in exchange for one connection.
///
/// Every step is reported to the listeners as an internal message. Nothing
/// received during the handshake is delivered as a remote line.
#[derive(Debug)]
pub struct Authenticator<'a> {
    config: &'a SessionConfig,
}

impl<'a> Authenticator<'a> {
    /// Authenticate with the credentials and prompts in `config`.
    #[must_use]
    pub const fn new(config: &'a SessionConfig) -> Self {
        Self { config }
    }

    /// Run the handshake.
    ///
    /// Returns the bytes received after the last expected phrase, which
    /// belong to the session proper.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] if a prompt or the logged-in phrase
    /// does not arrive in time, and transport errors as they occur.
    pub async fn authenticate<T: Transport>(
        &self,
        transport: &mut T,
        listeners: &mut ListenerPipeline,
    ) -> Result<Vec<u8>> {
        let config = self.config;
        let mut expecter = Expecter::new();

        if let Some(login_prompt) = &config.login_prompt {
            info(listeners, &format!("waiting for login prompt(\"{login_prompt}\")..."));
            wait_for(&mut expecter, transport, listeners, login_prompt, config.timeout).await?;

            info(listeners, &format!("sending login name(\"{}\")...", config.user));
            send_line(transport, &config.user).await?;

            if let Some(password_prompt) = &config.password_prompt {
                info(
                    listeners,
                    &format!("waiting for password prompt(\"{password_prompt}\")..."),
                );
                wait_for(&mut expecter, transport, listeners, password_prompt, config.timeout)
                    .await?;

                info(listeners, "sending password...");
                send_line(transport, config.password.as_deref().unwrap_or_default()).await?;
            }
        }

        if let Some(phrase) = &config.logged_phrase {
            info(listeners, &format!("waiting for logged in phrase(\"{phrase}\")..."));
            wait_for(
                &mut expecter,
                transport,
                listeners,
                phrase,
                config.logged_phrase_timeout(),
            )
            .await?;
            info(listeners, "logged in");
        }

        Ok(expecter.into_leftover())
    }
}

fn info(listeners: &mut ListenerPipeline, message: &str) {
    listeners.dispatch(message, Origin::Internal, Severity::Info);
}

async fn wait_for<T: Transport>(
    expecter: &mut Expecter,
    transport: &mut T,
    listeners: &mut ListenerPipeline,
    pattern: &str,
    timeout: Duration,
) -> Result<()> {
    let regex = Regex::new(pattern)?;
    match expecter.expect(transport, &regex, timeout).await? {
        ExpectOutcome::Found { received, .. } => {
            info(
                listeners,
                &format!("got expected string, the received response >>>{received}<<<"),
            );
            Ok(())
        }
        ExpectOutcome::NotFound { received } => {
            info(
                listeners,
                &format!("expected string not arriving, the received response >>>{received}<<<"),
            );
            Err(SessionError::timeout(timeout, pattern, received))
        }
    }
}

//! telnet-logger binary entry point.
//!
//! Keeps one telnet console session logged until its session timer runs out
//! or the process is told to stop.

mod cli;
mod prompt;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use telnet_session::config::load_config_file;
use telnet_session::credentials::DEFAULT_PASSWORD_DB;
use telnet_session::logging::init_logging;
use telnet_session::trigger::{self, TriggerSender};
use telnet_session::{
    ConfigLayer, ConsoleListener, CredentialTable, Engine, FileListener, SessionConfig,
    Supervisor, TcpConnector, resolve_password,
};

use crate::cli::Cli;

/// Config file read when `--cfg` is not given.
const DEFAULT_CONFIG_FILE: &str = "telnet_logger.toml";

/// How long shutdown waits for a blocked stdin read.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_format.into()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "telnet-logger starting");

    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let result = runtime.block_on(run(config, !cli.no_stdin));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Merge defaults, config file and command line, then find the password.
fn load_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let file = match &cli.cfg {
        Some(path) => load_config_file(path, true),
        None => load_config_file(Path::new(DEFAULT_CONFIG_FILE), false),
    }
    .context("loading config file")?;

    let mut layer = ConfigLayer::merge(ConfigLayer::defaults(), file, cli.to_layer());

    if layer.needs_password() {
        let db = layer
            .password_db
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PASSWORD_DB));
        let table = CredentialTable::load(&db)?;
        resolve_password(&mut layer, &table, prompt::ask_password)?;
    }

    Ok(layer.resolve()?)
}

async fn run(config: SessionConfig, forward_stdin: bool) -> anyhow::Result<()> {
    let (triggers, receiver) = trigger::channel();
    let _signals = watch_signals(triggers)?;

    let mut builder = Engine::builder(config.clone(), TcpConnector::new())
        .listener(ConsoleListener::stdout())
        .triggers(receiver);

    if let Some(filename) = &config.filename {
        let dir = config.file_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let file = FileListener::create(
            &dir,
            &config.host,
            filename,
            config.max_log_size,
            config.max_logs,
        )
        .with_context(|| format!("opening log file in {}", dir.display()))?;
        builder = builder.listener(file);
    }

    if forward_stdin {
        builder = builder.local_input(tokio::io::stdin());
    }

    let mut supervisor = Supervisor::new(builder.build()?);
    let exit = supervisor.run().await;
    tracing::debug!(
        ?exit,
        attempts = supervisor.attempts(),
        faults = supervisor.faults(),
        "telnet-logger exiting"
    );
    Ok(())
}

#[cfg(unix)]
fn watch_signals(triggers: TriggerSender) -> anyhow::Result<trigger::SignalBridge> {
    Ok(trigger::spawn_signal_bridge(triggers)?)
}

#[cfg(not(unix))]
fn watch_signals(triggers: TriggerSender) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok()
            && trigger::deliver(&triggers, telnet_session::Trigger::Stop)
        {
            tracing::debug!("stop requested from console");
        }
    }))
}

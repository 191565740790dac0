//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use telnet_session::ConfigLayer;
use telnet_session::logging::LogFormat;

/// Diagnostic log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Text => Self::Text,
            CliLogFormat::Json => Self::Json,
        }
    }
}

/// telnet-logger - keep a telnet console session logged, reconnecting as needed.
///
/// Every option can also be set in the config file; options given here win.
/// Durations are in seconds.
#[derive(Debug, Default, Parser)]
#[command(name = "telnet-logger", version, about)]
pub struct Cli {
    /// Remote host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Remote port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Login name
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Password
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Login prompt pattern (empty to skip the login exchange)
    #[arg(long, value_name = "REGEX")]
    pub login_prompt: Option<String>,

    /// Password prompt pattern (empty to skip the password)
    #[arg(long, value_name = "REGEX")]
    pub password_prompt: Option<String>,

    /// Phrase confirming a successful login
    #[arg(long, value_name = "REGEX")]
    pub logged_phrase: Option<String>,

    /// Per-read timeout
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Command sent to probe the remote host
    #[arg(long)]
    pub wd_cmd: Option<String>,

    /// Interval between watchdog commands
    #[arg(long, value_name = "SECS")]
    pub wd_delay: Option<u64>,

    /// Longest silence tolerated before reconnecting
    #[arg(long, value_name = "SECS")]
    pub wd_max_wait: Option<u64>,

    /// Pattern of watchdog responses, hidden from the logs
    #[arg(long, value_name = "REGEX")]
    pub wd_response: Option<String>,

    /// Command sent on SIGUSR1
    #[arg(long)]
    pub sig_usr1_cmd: Option<String>,

    /// Command sent on SIGUSR2
    #[arg(long)]
    pub sig_usr2_cmd: Option<String>,

    /// Command sent after every login, `|` separates commands
    #[arg(long)]
    pub initial_cmd: Option<String>,

    /// Remote phrase that makes the initial command be resent
    #[arg(long, value_name = "REGEX")]
    pub initial_cmd_error_phrase: Option<String>,

    /// Wait after a connection fault
    #[arg(long, value_name = "SECS")]
    pub reconnect_delay: Option<u64>,

    /// Session lifetime (0 for unlimited)
    #[arg(long, value_name = "SECS")]
    pub session_timer: Option<u64>,

    /// Log file name suffix; enables the log file
    #[arg(long)]
    pub filename: Option<String>,

    /// Log file directory
    #[arg(long, value_name = "DIR")]
    pub file_dir: Option<PathBuf>,

    /// Rotated log files to keep
    #[arg(long)]
    pub max_logs: Option<usize>,

    /// Log file size that triggers rotation
    #[arg(long, value_name = "BYTES")]
    pub max_log_size: Option<u64>,

    /// Config file [default: telnet_logger.toml if present]
    #[arg(short = 'c', long = "cfg", value_name = "FILE")]
    pub cfg: Option<PathBuf>,

    /// Host/password table [default: password_db.txt]
    #[arg(long, value_name = "FILE")]
    pub password_db: Option<PathBuf>,

    /// Do not forward standard input to the remote host
    #[arg(long)]
    pub no_stdin: bool,

    /// Increase diagnostic verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Diagnostic log format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Text)]
    pub log_format: CliLogFormat,
}

impl Cli {
    /// The command-line configuration layer.
    #[must_use]
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            login_prompt: self.login_prompt.clone(),
            password_prompt: self.password_prompt.clone(),
            logged_phrase: self.logged_phrase.clone(),
            timeout: self.timeout,
            reconnect_delay: self.reconnect_delay,
            session_timer: self.session_timer,
            initial_cmd: self.initial_cmd.clone(),
            initial_cmd_error_phrase: self.initial_cmd_error_phrase.clone(),
            sig_usr1_cmd: self.sig_usr1_cmd.clone(),
            sig_usr2_cmd: self.sig_usr2_cmd.clone(),
            wd_cmd: self.wd_cmd.clone(),
            wd_delay: self.wd_delay,
            wd_response: self.wd_response.clone(),
            wd_max_wait: self.wd_max_wait,
            filename: self.filename.clone(),
            file_dir: self.file_dir.clone(),
            max_logs: self.max_logs,
            max_log_size: self.max_log_size,
            password_db: self.password_db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags() {
        let cli = Cli::parse_from([
            "telnet-logger",
            "-H",
            "console",
            "-P",
            "2003",
            "-u",
            "ops",
            "-p",
            "pw",
            "-vv",
        ]);
        assert_eq!(cli.host.as_deref(), Some("console"));
        assert_eq!(cli.port, Some(2003));
        assert_eq!(cli.user.as_deref(), Some("ops"));
        assert_eq!(cli.password.as_deref(), Some("pw"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn unset_flags_leave_layer_empty() {
        let cli = Cli::parse_from(["telnet-logger"]);
        assert_eq!(cli.to_layer(), ConfigLayer::default());
        assert!(!cli.no_stdin);
    }

    #[test]
    fn long_flags_reach_layer() {
        let cli = Cli::parse_from([
            "telnet-logger",
            "--wd-cmd",
            "show clock",
            "--wd-max-wait",
            "120",
            "--initial-cmd",
            "term len 0|show log",
            "--session-timer",
            "0",
            "--cfg",
            "lab.toml",
            "--no-stdin",
        ]);
        let layer = cli.to_layer();
        assert_eq!(layer.wd_cmd.as_deref(), Some("show clock"));
        assert_eq!(layer.wd_max_wait, Some(120));
        assert_eq!(layer.initial_cmd.as_deref(), Some("term len 0|show log"));
        assert_eq!(layer.session_timer, Some(0));
        assert_eq!(cli.cfg, Some(PathBuf::from("lab.toml")));
        assert!(cli.no_stdin);
    }
}

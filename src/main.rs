#![forbid(unsafe_code)]
//! `nimbus` - operator CLI for AWS/Azure resource lifecycle and
//! incident-response evidence collection.
//!
//! Exit behavior:
//!   - 0 on success or help display
//!   - 1 on missing credentials, unknown command, declined confirmation, or
//!     action failure

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;

use nimbus_ops::cli::{self, Cli};
use nimbus_ops::config::Config;
use nimbus_ops::error::OpsError;
use nimbus_ops::style::{self, Level};

/// Configure colored output from config and TTY detection.
fn configure_colors(config: &Config) {
    match config.general.color.as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => {
            if !io::stdout().is_terminal() {
                colored::control::set_override(false);
            }
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("NIMBUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();
    configure_colors(&config);
    init_tracing();

    match cli::run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let level = if e.is_user_abort() { Level::Warn } else { Level::Error };
            eprintln!("{}", style::paint(level, &format!("Error: {e}")));
            ExitCode::FAILURE
        }
    }
}

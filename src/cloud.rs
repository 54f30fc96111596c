//! Subprocess plumbing for wrapped provider CLIs.
//!
//! Every provider call shells out to `aws`, `az`, `mysql`, or `ssh` and
//! blocks until the tool returns. [`CommandRunner`] is the seam the provider
//! adapters sit on: production uses [`ShellRunner`], tests substitute a
//! scripted fake so no real CLI is ever invoked.
//!
//! The invoked command line is echoed to the terminal before execution (the
//! operator should always see what ran), with password-bearing arguments
//! masked.

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::style::{self, Level};

/// Captured result of one CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

impl CliOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes external tools. Object-safe so handlers can hold `&dyn`.
pub trait CommandRunner {
    /// Run a tool with captured stdout/stderr.
    fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> OpsResult<CliOutput>;

    /// Run a tool with inherited stdio (interactive clients, long creates).
    /// Returns the exit status.
    fn run_interactive(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> OpsResult<i32>;
}

/// Real subprocess execution.
#[derive(Debug, Default)]
pub struct ShellRunner;

fn spawn_error(program: &str, source: io::Error) -> OpsError {
    match source.kind() {
        io::ErrorKind::NotFound => OpsError::Subprocess {
            program: program.to_string(),
            detail: format!("'{program}' is not installed or not on PATH"),
        },
        _ => OpsError::LocalIo { context: format!("failed to spawn '{program}'"), source },
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> OpsResult<CliOutput> {
        echo_command(program, args);
        debug!(program, ?args, "invoking provider CLI");

        let mut command = Command::new(program);
        command.args(args);
        for (key, value) in env {
            command.env(key, value);
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = command.output().map_err(|source| spawn_error(program, source))?;
        Ok(CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            status: output.status.code().unwrap_or(-1),
        })
    }

    fn run_interactive(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> OpsResult<i32> {
        echo_command(program, args);
        debug!(program, ?args, "invoking provider CLI (interactive)");

        let mut command = Command::new(program);
        command.args(args);
        for (key, value) in env {
            command.env(key, value);
        }

        let status = command.status().map_err(|source| spawn_error(program, source))?;

        Ok(status.code().unwrap_or(-1))
    }
}

/// Echo the command line with passwords masked.
fn echo_command(program: &str, args: &[String]) {
    style::line(
        Level::Detail,
        &format!("[{}] {} {}", program.to_ascii_uppercase(), program, mask_args(args).join(" ")),
    );
}

/// Mask the value following any password-carrying flag, and inline
/// `-pPASSWORD` style arguments.
#[must_use]
pub fn mask_args(args: &[String]) -> Vec<String> {
    const SECRET_FLAGS: [&str; 3] = ["--admin-password", "--password", "-p"];

    let mut masked = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            masked.push("********".to_string());
            hide_next = false;
            continue;
        }
        if SECRET_FLAGS.contains(&arg.as_str()) {
            hide_next = true;
            masked.push(arg.clone());
            continue;
        }
        if arg.starts_with("-p") && arg.len() > 2 && !arg.starts_with("--") {
            masked.push("-p********".to_string());
            continue;
        }
        masked.push(arg.clone());
    }
    masked
}

/// Convenience for building `Vec<String>` argument lists from literals.
#[macro_export]
macro_rules! cli_args {
    ($($arg:expr),* $(,)?) => {
        vec![$($arg.to_string()),*]
    };
}

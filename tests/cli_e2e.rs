//! End-to-end tests for the compiled binary: argument surface, exit codes,
//! and behavior in an environment with no provider CLIs available.
//!
//! # Running
//!
//! ```bash
//! cargo test --test cli_e2e
//! ```

use std::process::{Command, Stdio};

/// Path to the nimbus binary (built in debug mode for tests).
fn nimbus_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // test binary name
    path.pop(); // deps/
    path.push("nimbus");
    path
}

struct RunOutput {
    output: std::process::Output,
}

impl RunOutput {
    fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).to_string()
    }

    fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).to_string()
    }

    fn code(&self) -> i32 {
        self.output.status.code().unwrap_or(-1)
    }
}

/// Run nimbus in an isolated environment: temp HOME, temp cwd, and a PATH
/// containing no provider CLIs, so nothing can reach a real cloud account.
fn run_isolated(args: &[&str]) -> RunOutput {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    let home = temp.path().join("home");
    let bin = temp.path().join("bin");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&bin).unwrap();

    let output = Command::new(nimbus_binary())
        .args(args)
        .env_clear()
        .env("HOME", &home)
        .env("PATH", &bin)
        .current_dir(temp.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to execute nimbus");

    RunOutput { output }
}

#[test]
fn help_exits_zero_and_lists_families() {
    let run = run_isolated(&["--help"]);
    assert_eq!(run.code(), 0, "stderr: {}", run.stderr_str());
    let stdout = run.stdout_str();
    for family in ["ec2", "s3", "rds", "vm", "storage", "blob", "forensics", "db"] {
        assert!(stdout.contains(family), "help should mention {family}");
    }
}

#[test]
fn subcommand_help_exits_zero() {
    for family in ["ec2", "s3", "forensics"] {
        let run = run_isolated(&[family, "--help"]);
        assert_eq!(run.code(), 0, "{family} --help failed: {}", run.stderr_str());
    }
}

#[test]
fn unknown_command_exits_nonzero() {
    let run = run_isolated(&["launch-the-missiles"]);
    assert_ne!(run.code(), 0);
}

#[test]
fn missing_subcommand_action_exits_nonzero() {
    let run = run_isolated(&["ec2"]);
    assert_ne!(run.code(), 0);
}

#[test]
fn version_prints_package_version() {
    let run = run_isolated(&["--version"]);
    assert_eq!(run.code(), 0);
    assert!(run.stdout_str().contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn aws_family_without_cli_exits_one_with_diagnosis() {
    // The isolated PATH has no `aws` binary; the preflight must fail with a
    // one-line diagnosis and exit code 1, never a panic.
    let run = run_isolated(&["s3", "list"]);
    assert_eq!(run.code(), 1, "stdout: {}", run.stdout_str());
    assert!(run.stderr_str().contains("Error"), "stderr: {}", run.stderr_str());
}

#[test]
fn azure_family_without_cli_exits_one() {
    let run = run_isolated(&["vm", "list"]);
    assert_eq!(run.code(), 1);
}

#[test]
fn forensics_isolate_without_cli_makes_no_artifacts() {
    let run = run_isolated(&["forensics", "isolate", "i-0abc"]);
    assert_eq!(run.code(), 1);
}

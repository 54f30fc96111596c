//! SSH tunnel to a private database through a jump-server VM.
//!
//! The tunnel is a scoped resource: [`SshTunnel::open`] spawns the `ssh`
//! child and the guard kills it on drop, so teardown happens on every exit
//! path (normal return, error propagation, interrupt). SIGINT does not
//! bypass the guard either: a `ctrlc` handler sets an atomic flag which the
//! blocking probe loops poll, turning the interrupt into an error return
//! that unwinds through the guards.
//!
//! Liveness is verified by repeated short-timeout TCP connects against the
//! local forward port, with a fixed sleep between attempts and a hard cap.
//! Exceeding the cap is a terminal error; the database client is never
//! started against a dead tunnel.

use std::net::{SocketAddr, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::cli_args;
use crate::cloud::CommandRunner;
use crate::error::{OpsError, OpsResult};
use crate::style::{self, Level};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static INSTALL: Once = Once::new();

/// Install the SIGINT/SIGTERM flag handler. Idempotent.
pub fn install_interrupt_flag() {
    INSTALL.call_once(|| {
        let _ = ctrlc::set_handler(|| {
            INTERRUPTED.store(true, Ordering::SeqCst);
            eprintln!();
            eprintln!("Received signal, cleaning up...");
        });
    });
}

/// True once the operator has pressed Ctrl-C.
#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Per-connect timeout for one probe attempt.
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Wait for a TCP endpoint to accept connections.
///
/// # Errors
///
/// Returns [`OpsError::Provider`] when `attempts` probes all fail or the
/// operator interrupts the wait.
pub fn probe_port(addr: SocketAddr, attempts: u32, interval: Duration) -> OpsResult<()> {
    for attempt in 1..=attempts {
        if interrupted() {
            return Err(OpsError::Provider { detail: "interrupted while waiting for tunnel".to_string() });
        }
        match TcpStream::connect_timeout(&addr, PROBE_CONNECT_TIMEOUT) {
            Ok(_) => {
                debug!(%addr, attempt, "tunnel port is live");
                return Ok(());
            }
            Err(e) => {
                debug!(%addr, attempt, error = %e, "tunnel probe failed");
            }
        }
        if attempt % 10 == 0 {
            println!("Still waiting... ({attempt}/{attempts})");
        }
        if attempt < attempts {
            thread::sleep(interval);
        }
    }
    Err(OpsError::Provider {
        detail: format!("tunnel on {addr} did not become ready after {attempts} attempts"),
    })
}

/// Wait for the jump server to accept SSH sessions, using the same bounded
/// retry shape as the port probe but through the provider CLI seam so tests
/// can fake it.
pub fn wait_for_ssh(
    runner: &dyn CommandRunner,
    user: &str,
    host: &str,
    attempts: u32,
    interval: Duration,
) -> OpsResult<()> {
    let key = ssh_key_path();
    for attempt in 1..=attempts {
        if interrupted() {
            return Err(OpsError::Provider { detail: "interrupted while waiting for SSH".to_string() });
        }
        let output = runner.run(
            "ssh",
            &cli_args![
                "-i",
                key,
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "ConnectTimeout=5",
                "-o",
                "ConnectionAttempts=1",
                format!("{user}@{host}"),
                "echo SSH ready"
            ],
            &[],
        )?;
        if output.success() {
            style::line(Level::Success, "SSH connection established");
            return Ok(());
        }
        if attempt % 10 == 0 {
            println!("Still waiting... ({attempt}/{attempts})");
        }
        if attempt < attempts {
            thread::sleep(interval);
        }
    }
    Err(OpsError::Provider { detail: format!("SSH to {host} timed out after {attempts} attempts") })
}

fn ssh_key_path() -> String {
    dirs::home_dir()
        .map(|h| h.join(".ssh").join("id_rsa").display().to_string())
        .unwrap_or_else(|| "~/.ssh/id_rsa".to_string())
}

/// A running SSH port-forward. Killing the child tears the forward down;
/// the guard does that on drop.
pub struct SshTunnel {
    child: Child,
    local_port: u16,
}

impl SshTunnel {
    /// Spawn `ssh -N -L local:remote_host:remote_port user@host`.
    ///
    /// The child is held (not daemonized with `-f`) so this process owns its
    /// lifetime.
    pub fn open(
        user: &str,
        host: &str,
        local_port: u16,
        remote_host: &str,
        remote_port: u16,
    ) -> OpsResult<Self> {
        let child = Command::new("ssh")
            .args([
                "-i",
                &ssh_key_path(),
                "-N",
                "-L",
                &format!("{local_port}:{remote_host}:{remote_port}"),
                "-o",
                "StrictHostKeyChecking=no",
                &format!("{user}@{host}"),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OpsError::LocalIo {
                context: "failed to spawn ssh tunnel".to_string(),
                source,
            })?;

        Ok(Self { child, local_port })
    }

    #[must_use]
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Block until the local forward port accepts connections.
    pub fn wait_ready(&self, attempts: u32, interval: Duration) -> OpsResult<()> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.local_port));
        probe_port(addr, attempts, interval)
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        debug!(local_port = self.local_port, "closing ssh tunnel");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn probe_succeeds_against_live_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        probe_port(addr, 3, Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn probe_times_out_after_bounded_attempts() {
        // Bind then drop to get a port that refuses connections.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = probe_port(addr, 3, Duration::from_millis(10)).unwrap_err();
        match err {
            OpsError::Provider { detail } => assert!(detail.contains("3 attempts")),
            other => panic!("unexpected: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn guard_kills_child_on_drop() {
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id();
        let tunnel = SshTunnel { child, local_port: 3307 };
        drop(tunnel);

        // The guard kills and reaps; a waited-on process leaves /proc.
        let alive = std::path::Path::new(&format!("/proc/{pid}")).exists();
        assert!(!alive, "tunnel child should be dead after drop");
    }
}

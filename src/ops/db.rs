//! Azure MySQL Flexible Server connectivity.
//!
//! Public servers get a direct `mysql` client invocation. Private servers
//! get a jump-server VM (reused when one exists), a server firewall rule
//! for its public IP, and an SSH tunnel on the configured local port. The
//! rule and the tunnel are scoped guards, so every exit path - client exit,
//! probe timeout, Ctrl-C - tears them down in reverse order.

use std::io::BufRead;
use std::time::Duration;

use chrono::Local;

use crate::cli_args;
use crate::cloud::CommandRunner;
use crate::config::Config;
use crate::error::{OpsError, OpsResult};
use crate::prompt::{self, Selection};
use crate::providers::{JumpHostApi, MySqlApi, MySqlServerInfo, ResourceDescriptor};
use crate::style::{self, Level};
use crate::tunnel::{self, SshTunnel};

const JUMP_HOST_PREFIX: &str = "mysql-jumpserver";
const JUMP_HOST_USER: &str = "azureuser";
const MYSQL_PORT: u16 = 3306;

fn probe_interval(config: &Config) -> Duration {
    Duration::from_millis(config.tunnel.probe_interval_ms)
}

/// Removes the temporary server firewall rule when dropped.
struct FirewallRuleGuard<'a> {
    api: &'a dyn MySqlApi,
    resource_group: String,
    server: String,
    rule_name: String,
}

impl Drop for FirewallRuleGuard<'_> {
    fn drop(&mut self) {
        println!("Removing firewall rule...");
        if let Err(e) = self.api.delete_firewall_rule(&self.resource_group, &self.server, &self.rule_name)
        {
            style::line(Level::Warn, &format!("Could not remove firewall rule {}: {e}", self.rule_name));
        }
    }
}

/// `nimbus db connect [SERVER]`.
pub fn connect<R: BufRead>(
    input: &mut R,
    runner: &dyn CommandRunner,
    mysql: &dyn MySqlApi,
    jump: &dyn JumpHostApi,
    config: &Config,
    server: Option<String>,
) -> OpsResult<()> {
    tunnel::install_interrupt_flag();

    let server_name = match server {
        Some(name) => name,
        None => {
            let servers = mysql.list_servers()?;
            let candidates: Vec<_> = servers
                .iter()
                .map(|s| ResourceDescriptor {
                    id: s.name.clone(),
                    name: format!(
                        "{} - Public: {}",
                        s.resource_group,
                        if s.public_access { "Enabled" } else { "Disabled" }
                    ),
                    state: s.state.clone(),
                })
                .collect();
            match prompt::select(input, &candidates, "connect to")? {
                Selection::Id(name) => name,
                Selection::Cancelled => return Ok(()),
            }
        }
    };

    style::line(Level::Info, "Gathering MySQL server information...");
    let mut server = mysql
        .find_server(&server_name)?
        .ok_or_else(|| OpsError::NotFound { kind: "mysql server", id: server_name.clone() })?;

    if server.state != "Ready" {
        return Err(OpsError::Provider {
            detail: format!("server is not ready (status: {})", server.state),
        });
    }

    // Public access without any firewall rule is unreachable in practice;
    // treat it as private and go through the jump server.
    if server.public_access {
        match mysql.firewall_rule_count(&server.resource_group, &server.name) {
            Ok(0) => {
                style::line(Level::Warn, "Warning: Server has public access enabled but no firewall rules");
                style::line(Level::Warn, "Treating as private server - will use jump server");
                server.public_access = false;
            }
            Ok(_) => {}
            Err(_) => server.public_access = false,
        }
    }

    style::banner("MySQL Server Information");
    println!("Name: {}", server.name);
    println!("FQDN: {}", server.fqdn);
    println!("Version: {}", server.version);
    println!("Location: {}", server.location);
    println!("Resource Group: {}", server.resource_group);
    println!("Public Access: {}", if server.public_access { "Enabled" } else { "Disabled" });
    println!("Status: {}", server.state);
    println!();

    if server.public_access {
        connect_public(input, runner, &server)?;
    } else {
        connect_via_jump_host(input, runner, mysql, jump, config, &server)?;
    }

    println!();
    style::line(Level::Success, "MySQL connection closed");
    Ok(())
}

/// Direct client connection against the server FQDN.
fn connect_public<R: BufRead>(
    input: &mut R,
    runner: &dyn CommandRunner,
    server: &MySqlServerInfo,
) -> OpsResult<()> {
    style::line(Level::Success, "Server has public access enabled");
    println!("Connecting directly to MySQL server...");
    println!();
    println!("Connection details:");
    println!("  Host: {}", server.fqdn);
    println!("  Port: {MYSQL_PORT}");
    println!();

    let credentials = read_credentials(input)?;
    println!();
    println!("Connecting to MySQL...");
    run_mysql_client(runner, &server.fqdn, MYSQL_PORT, &credentials)
}

/// Tunnelled connection through a jump-server VM.
fn connect_via_jump_host<R: BufRead>(
    input: &mut R,
    runner: &dyn CommandRunner,
    mysql: &dyn MySqlApi,
    jump: &dyn JumpHostApi,
    config: &Config,
    server: &MySqlServerInfo,
) -> OpsResult<()> {
    let (host_name, host_ip) = ensure_jump_host(input, jump, server)?;

    println!();
    style::line(Level::Info, "Setting up SSH tunnel to MySQL through jump server VM...");
    println!();
    println!("Waiting for VM to be fully ready (this may take 30-60 seconds)...");
    tunnel::wait_for_ssh(runner, JUMP_HOST_USER, &host_ip, config.tunnel.probe_attempts, probe_interval(config))?;
    println!();

    style::line(Level::Warn, "Adding firewall rule for jump server VM...");
    let rule_name = format!("jumpserver-access-{}", Local::now().timestamp());
    mysql.create_firewall_rule(&server.resource_group, &server.name, &rule_name, &host_ip)?;
    let _rule_guard = FirewallRuleGuard {
        api: mysql,
        resource_group: server.resource_group.clone(),
        server: server.name.clone(),
        rule_name,
    };
    style::line(Level::Success, "✓ Firewall rule created");
    println!();

    let credentials = read_credentials(input)?;
    println!();

    let local_port = config.tunnel.local_port;
    style::banner("SSH Tunnel Configuration");
    println!("Local Port: {local_port}");
    println!("Remote MySQL: {}:{MYSQL_PORT}", server.fqdn);
    println!("Jump Server: {host_ip}");
    println!();
    style::line(Level::Warn, "Starting SSH tunnel in background...");

    let ssh_tunnel = SshTunnel::open(JUMP_HOST_USER, &host_ip, local_port, &server.fqdn, MYSQL_PORT)?;
    // The client is only launched against a verified forward.
    ssh_tunnel.wait_ready(config.tunnel.probe_attempts, probe_interval(config))?;
    style::line(Level::Success, "✓ SSH tunnel established");
    println!();
    println!("Connecting to MySQL through tunnel...");
    println!();

    let client_result = run_mysql_client(runner, "127.0.0.1", local_port, &credentials);

    println!();
    println!("Cleaning up...");
    drop(ssh_tunnel);
    // _rule_guard drops here, removing the firewall rule.

    client_result?;

    println!();
    if prompt::confirm(input, "Delete jump server VM and associated resources? (y/N): ")? {
        style::line(Level::Warn, &format!("Deleting jump server VM and all associated resources: {host_name}"));
        jump.delete_jump_resources(&host_name, &server.resource_group)?;
        style::line(Level::Success, "✓ All jump server resources deleted");
    }
    Ok(())
}

/// Reuse an existing jump host or create a fresh one. Returns (name, ip).
fn ensure_jump_host<R: BufRead>(
    input: &mut R,
    jump: &dyn JumpHostApi,
    server: &MySqlServerInfo,
) -> OpsResult<(String, String)> {
    style::line(Level::Warn, "Server is private - checking for existing jump server...");
    println!();

    let existing = jump.list_jump_hosts(&server.resource_group, JUMP_HOST_PREFIX)?;
    if !existing.is_empty() {
        style::line(Level::Success, &format!("Found {} existing jump server VM(s)", existing.len()));
        for (i, (name, state)) in existing.iter().enumerate() {
            println!("{}. {name} - {state}", i + 1);
        }
        println!();

        let answer = prompt::read_line(input, "Use existing jump server? (Y/n): ")?;
        if !answer.trim().eq_ignore_ascii_case("n") {
            let (name, state) = existing[0].clone();
            let lower = state.to_ascii_lowercase();
            if lower.contains("stopped") || lower.contains("deallocated") {
                style::line(Level::Warn, &format!("Starting existing jump server VM: {name}"));
                jump.start_jump_host(&name, &server.resource_group)?;
            }
            let ip = jump.jump_host_ip(&name, &server.resource_group)?;
            style::line(Level::Success, &format!("✓ Using existing jump server VM: {name}"));
            println!("Public IP: {ip}");
            println!();
            return Ok((name, ip));
        }
    }

    style::line(Level::Warn, "Creating new Azure VM jump server instance...");
    println!();

    let name = format!("{JUMP_HOST_PREFIX}-{}", Local::now().timestamp());
    println!("Creating jump server VM: {name}");
    println!("Location: {}", server.location);
    println!("Resource Group: {}", server.resource_group);
    println!();
    println!("Launching VM (this may take 2-3 minutes)...");

    let ip = jump.create_jump_host(&name, &server.resource_group, &server.location)?;
    style::line(Level::Success, "✓ Jump server VM created successfully");
    println!("Public IP: {ip}");
    println!();
    Ok((name, ip))
}

struct DbCredentials {
    user: String,
    password: String,
    database: Option<String>,
}

fn read_credentials<R: BufRead>(input: &mut R) -> OpsResult<DbCredentials> {
    let user = prompt::read_line(input, "Enter MySQL username: ")?;
    let user = user.trim().to_string();
    if user.is_empty() {
        return Err(OpsError::Provider { detail: "username is required".to_string() });
    }

    let password = prompt::read_line(input, &format!("Enter password for user '{user}': "))?;
    if password.is_empty() {
        return Err(OpsError::Provider { detail: "password is required".to_string() });
    }

    let database = prompt::read_line(input, "Enter database name (press Enter for no database): ")?;
    let database = database.trim().to_string();
    Ok(DbCredentials { user, password, database: (!database.is_empty()).then_some(database) })
}

/// Launch the interactive `mysql` client. The password travels via
/// `MYSQL_PWD` so it never appears in the argument list.
fn run_mysql_client(
    runner: &dyn CommandRunner,
    host: &str,
    port: u16,
    credentials: &DbCredentials,
) -> OpsResult<()> {
    let mut args = cli_args!["-h", host, "-P", port.to_string(), "-u", credentials.user];
    if let Some(database) = &credentials.database {
        args.push(database.clone());
    }
    let env = vec![("MYSQL_PWD".to_string(), credentials.password.clone())];

    let status = runner.run_interactive("mysql", &args, &env)?;
    if status != 0 {
        return Err(OpsError::Subprocess {
            program: "mysql".to_string(),
            detail: format!("client exited with status {status}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CliOutput;
    use std::cell::RefCell;
    use std::io::Cursor;

    #[derive(Default)]
    struct FakeMySql {
        servers: Vec<MySqlServerInfo>,
        firewall_rules: usize,
        created_rules: RefCell<Vec<String>>,
        deleted_rules: RefCell<Vec<String>>,
    }

    impl MySqlApi for FakeMySql {
        fn list_servers(&self) -> OpsResult<Vec<MySqlServerInfo>> {
            Ok(self.servers.clone())
        }
        fn find_server(&self, name: &str) -> OpsResult<Option<MySqlServerInfo>> {
            Ok(self.servers.iter().find(|s| s.name == name).cloned())
        }
        fn firewall_rule_count(&self, _: &str, _: &str) -> OpsResult<usize> {
            Ok(self.firewall_rules)
        }
        fn create_firewall_rule(&self, _: &str, _: &str, rule: &str, _: &str) -> OpsResult<()> {
            self.created_rules.borrow_mut().push(rule.to_string());
            Ok(())
        }
        fn delete_firewall_rule(&self, _: &str, _: &str, rule: &str) -> OpsResult<()> {
            self.deleted_rules.borrow_mut().push(rule.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullRunner {
        invocations: RefCell<Vec<String>>,
    }

    impl CommandRunner for NullRunner {
        fn run(&self, program: &str, _: &[String], _: &[(String, String)]) -> OpsResult<CliOutput> {
            self.invocations.borrow_mut().push(program.to_string());
            Ok(CliOutput { status: 0, ..Default::default() })
        }
        fn run_interactive(&self, program: &str, _: &[String], _: &[(String, String)]) -> OpsResult<i32> {
            self.invocations.borrow_mut().push(program.to_string());
            Ok(0)
        }
    }

    #[derive(Default)]
    struct NullJump;

    impl JumpHostApi for NullJump {
        fn list_jump_hosts(&self, _: &str, _: &str) -> OpsResult<Vec<(String, String)>> {
            Ok(Vec::new())
        }
        fn jump_host_ip(&self, _: &str, _: &str) -> OpsResult<String> {
            Ok("203.0.113.10".to_string())
        }
        fn start_jump_host(&self, _: &str, _: &str) -> OpsResult<()> {
            Ok(())
        }
        fn create_jump_host(&self, _: &str, _: &str, _: &str) -> OpsResult<String> {
            Ok("203.0.113.10".to_string())
        }
        fn delete_jump_resources(&self, _: &str, _: &str) -> OpsResult<()> {
            Ok(())
        }
    }

    fn public_server(name: &str) -> MySqlServerInfo {
        MySqlServerInfo {
            name: name.to_string(),
            resource_group: "rg-db".to_string(),
            state: "Ready".to_string(),
            fqdn: format!("{name}.mysql.database.azure.com"),
            version: "8.0.21".to_string(),
            location: "eastus".to_string(),
            public_access: true,
        }
    }

    #[test]
    fn public_server_connects_directly() {
        let mysql = FakeMySql { servers: vec![public_server("db-1")], firewall_rules: 2, ..Default::default() };
        let runner = NullRunner::default();
        let mut input = Cursor::new("admin\nhunter2\nappdb\n");
        connect(&mut input, &runner, &mysql, &NullJump, &Config::default(), Some("db-1".to_string()))
            .unwrap();
        assert_eq!(*runner.invocations.borrow(), vec!["mysql".to_string()]);
        assert!(mysql.created_rules.borrow().is_empty());
    }

    #[test]
    fn unknown_server_is_not_found() {
        let mysql = FakeMySql::default();
        let runner = NullRunner::default();
        let mut input = Cursor::new("");
        let err = connect(&mut input, &runner, &mysql, &NullJump, &Config::default(), Some("ghost".to_string()))
            .unwrap_err();
        assert!(matches!(err, OpsError::NotFound { .. }));
    }

    #[test]
    fn not_ready_server_is_rejected() {
        let mut server = public_server("db-1");
        server.state = "Stopped".to_string();
        let mysql = FakeMySql { servers: vec![server], ..Default::default() };
        let runner = NullRunner::default();
        let mut input = Cursor::new("");
        let err = connect(&mut input, &runner, &mysql, &NullJump, &Config::default(), Some("db-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, OpsError::Provider { .. }));
        assert!(runner.invocations.borrow().is_empty());
    }

    #[test]
    fn firewall_guard_removes_rule_on_drop() {
        let mysql = FakeMySql::default();
        {
            let _guard = FirewallRuleGuard {
                api: &mysql,
                resource_group: "rg-db".to_string(),
                server: "db-1".to_string(),
                rule_name: "jumpserver-access-1".to_string(),
            };
        }
        assert_eq!(*mysql.deleted_rules.borrow(), vec!["jumpserver-access-1".to_string()]);
    }

    #[test]
    fn missing_username_aborts_before_client_launch() {
        let mysql = FakeMySql { servers: vec![public_server("db-1")], firewall_rules: 1, ..Default::default() };
        let runner = NullRunner::default();
        let mut input = Cursor::new("\n");
        let err = connect(&mut input, &runner, &mysql, &NullJump, &Config::default(), Some("db-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, OpsError::Provider { .. }));
        assert!(runner.invocations.borrow().is_empty());
    }

    #[test]
    fn credentials_parse_optional_database() {
        let mut input = Cursor::new("root\nsecret\n\n");
        let creds = read_credentials(&mut input).unwrap();
        assert_eq!(creds.user, "root");
        assert!(creds.database.is_none());

        let mut input = Cursor::new("root\nsecret\nappdb\n");
        let creds = read_credentials(&mut input).unwrap();
        assert_eq!(creds.database.as_deref(), Some("appdb"));
    }
}

//! Azure adapter over the `az` CLI.
//!
//! Azure addresses most resources by name + resource group, so the listing
//! calls return both. Power state needs a second call per VM
//! (`get-instance-view`), matching how the CLI itself exposes it.

use std::path::Path;

use serde_json::Value;

use crate::cli_args;
use crate::cloud::CommandRunner;
use crate::error::{OpsError, OpsResult};
use crate::providers::{
    expect_success, parse_json, BlobApi, JumpHostApi, MySqlApi, MySqlServerInfo,
    StorageAccountInfo, StorageApi, VmApi, VmInfo,
};

const AZ: &str = "az";

/// Thin adapter implementing the Azure capability traits.
pub struct AzCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> AzCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Login preflight: `az account show`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::CredentialsMissing`] when no login session exists.
    pub fn check_credentials(&self) -> OpsResult<String> {
        let output = self.runner.run(AZ, &cli_args!["account", "show", "--output", "json"], &[])?;
        if !output.success() {
            return Err(OpsError::CredentialsMissing { provider: "azure", hint: "run `az login`" });
        }
        let value = parse_json(&output, AZ)?;
        Ok(value["user"]["name"].as_str().unwrap_or("unknown").to_string())
    }

    fn run_json(&self, args: &[String], kind: &'static str, id: &str) -> OpsResult<Value> {
        let output = self.runner.run(AZ, args, &[])?;
        expect_success(&output, AZ, kind, id)?;
        parse_json(&output, AZ)
    }

    fn run_checked(&self, args: &[String], kind: &'static str, id: &str) -> OpsResult<()> {
        let output = self.runner.run(AZ, args, &[])?;
        expect_success(&output, AZ, kind, id)
    }

    fn run_tsv(&self, args: &[String], kind: &'static str, id: &str) -> OpsResult<String> {
        let output = self.runner.run(AZ, args, &[])?;
        expect_success(&output, AZ, kind, id)?;
        Ok(output.stdout.trim().to_string())
    }
}

fn parse_vm(vm: &Value) -> VmInfo {
    VmInfo {
        name: vm["name"].as_str().unwrap_or_default().to_string(),
        resource_group: vm["resourceGroup"].as_str().unwrap_or_default().to_string(),
        location: vm["location"].as_str().unwrap_or_default().to_string(),
        size: vm["hardwareProfile"]["vmSize"].as_str().unwrap_or_default().to_string(),
    }
}

impl VmApi for AzCli<'_> {
    fn list_vms(&self) -> OpsResult<Vec<VmInfo>> {
        let value = self.run_json(&cli_args!["vm", "list", "--output", "json"], "vm", "")?;
        Ok(value.as_array().map(|vms| vms.iter().map(parse_vm).collect()).unwrap_or_default())
    }

    fn find_vm(&self, name: &str) -> OpsResult<Option<VmInfo>> {
        let value = self.run_json(
            &cli_args!["vm", "list", "--query", format!("[?name=='{name}']"), "--output", "json"],
            "vm",
            name,
        )?;
        Ok(value.as_array().and_then(|vms| vms.first()).map(parse_vm))
    }

    fn power_state(&self, name: &str, resource_group: &str) -> OpsResult<String> {
        let output = self.runner.run(
            AZ,
            &cli_args![
                "vm",
                "get-instance-view",
                "--name",
                name,
                "--resource-group",
                resource_group,
                "--query",
                "instanceView.statuses[?starts_with(code, 'PowerState/')].displayStatus",
                "--output",
                "tsv"
            ],
            &[],
        )?;
        if !output.success() {
            return Ok("Unknown".to_string());
        }
        let state = output.stdout.trim();
        Ok(if state.is_empty() { "Unknown".to_string() } else { state.to_string() })
    }

    fn list_resource_groups(&self) -> OpsResult<Vec<(String, String)>> {
        let value = self.run_json(
            &cli_args!["group", "list", "--query", "[].{name:name, location:location}", "--output", "json"],
            "resource group",
            "",
        )?;
        Ok(value
            .as_array()
            .map(|groups| {
                groups
                    .iter()
                    .map(|g| {
                        (
                            g["name"].as_str().unwrap_or_default().to_string(),
                            g["location"].as_str().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn resource_group_exists(&self, name: &str) -> OpsResult<bool> {
        let output =
            self.runner.run(AZ, &cli_args!["group", "show", "--name", name, "--output", "json"], &[])?;
        Ok(output.success())
    }

    fn resource_group_location(&self, name: &str) -> OpsResult<String> {
        self.run_tsv(
            &cli_args!["group", "show", "--name", name, "--query", "location", "--output", "tsv"],
            "resource group",
            name,
        )
    }

    fn create_resource_group(&self, name: &str, location: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["group", "create", "--name", name, "--location", location, "--output", "none"],
            "resource group",
            name,
        )
    }

    fn create_vm(&self, args: &[String]) -> OpsResult<()> {
        let mut full = cli_args!["vm", "create"];
        full.extend(args.iter().cloned());
        let status = self.runner.run_interactive(AZ, &full, &[])?;
        if status != 0 {
            return Err(OpsError::Subprocess {
                program: AZ.to_string(),
                detail: format!("vm create exited with status {status}"),
            });
        }
        Ok(())
    }

    fn show_vm_details(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        let status = self.runner.run_interactive(
            AZ,
            &cli_args![
                "vm",
                "show",
                "--name",
                name,
                "--resource-group",
                resource_group,
                "--show-details",
                "--query",
                "{Name:name, ResourceGroup:resourceGroup, Location:location, Size:hardwareProfile.vmSize, PublicIP:publicIps, PrivateIP:privateIps}",
                "--output",
                "table"
            ],
            &[],
        )?;
        if status != 0 {
            return Err(OpsError::NotFound { kind: "vm", id: name.to_string() });
        }
        Ok(())
    }

    fn start_vm(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["vm", "start", "--name", name, "--resource-group", resource_group],
            "vm",
            name,
        )
    }

    fn deallocate_vm(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["vm", "deallocate", "--name", name, "--resource-group", resource_group],
            "vm",
            name,
        )
    }

    fn delete_vm(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["vm", "delete", "--name", name, "--resource-group", resource_group, "--yes"],
            "vm",
            name,
        )
    }

    fn list_associated(
        &self,
        kind: &str,
        resource_group: &str,
        needle: &str,
    ) -> OpsResult<Vec<String>> {
        let group = if kind == "disk" {
            cli_args![kind, "list"]
        } else {
            cli_args!["network", kind, "list"]
        };
        let mut args = group;
        args.extend(cli_args![
            "--resource-group",
            resource_group,
            "--query",
            format!("[?contains(name, '{needle}')].[name]"),
            "--output",
            "tsv"
        ]);
        let stdout = self.run_tsv(&args, "resource", needle)?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn delete_associated(&self, kind: &str, resource_group: &str, name: &str) -> OpsResult<()> {
        let mut args = if kind == "disk" {
            cli_args![kind, "delete", "--yes"]
        } else {
            cli_args!["network", kind, "delete"]
        };
        args.extend(cli_args!["--resource-group", resource_group, "--name", name]);
        self.run_checked(&args, "resource", name)
    }
}

impl StorageApi for AzCli<'_> {
    fn list_accounts(&self) -> OpsResult<Vec<StorageAccountInfo>> {
        let value = self.run_json(
            &cli_args![
                "storage",
                "account",
                "list",
                "--query",
                "[].{name:name, rg:resourceGroup}",
                "--output",
                "json"
            ],
            "storage account",
            "",
        )?;
        Ok(value
            .as_array()
            .map(|accounts| {
                accounts
                    .iter()
                    .map(|a| StorageAccountInfo {
                        name: a["name"].as_str().unwrap_or_default().to_string(),
                        resource_group: a["rg"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_group_names(&self) -> OpsResult<Vec<String>> {
        let stdout = self.run_tsv(
            &cli_args!["group", "list", "--query", "[].name", "--output", "tsv"],
            "resource group",
            "",
        )?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn create_group(&self, name: &str, location: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["group", "create", "--name", name, "--location", location, "--output", "none"],
            "resource group",
            name,
        )
    }

    fn account_resource_group(&self, name: &str) -> OpsResult<String> {
        self.run_tsv(
            &cli_args![
                "storage",
                "account",
                "show",
                "--name",
                name,
                "--query",
                "resourceGroup",
                "--output",
                "tsv"
            ],
            "storage account",
            name,
        )
    }

    fn create_account(
        &self,
        name: &str,
        resource_group: &str,
        location: &str,
        sku: &str,
        kind: &str,
    ) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "storage",
                "account",
                "create",
                "--name",
                name,
                "--resource-group",
                resource_group,
                "--location",
                location,
                "--sku",
                sku,
                "--kind",
                kind,
                "--allow-shared-key-access",
                "false",
                "--min-tls-version",
                "TLS1_2"
            ],
            "storage account",
            name,
        )
    }

    fn delete_account(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "storage",
                "account",
                "delete",
                "--name",
                name,
                "--resource-group",
                resource_group,
                "--yes"
            ],
            "storage account",
            name,
        )
    }

    fn signed_in_user_id(&self) -> OpsResult<String> {
        self.run_tsv(
            &cli_args!["ad", "signed-in-user", "show", "--query", "id", "--output", "tsv"],
            "user",
            "",
        )
    }

    fn subscription_id(&self) -> OpsResult<String> {
        self.run_tsv(&cli_args!["account", "show", "--query", "id", "--output", "tsv"], "subscription", "")
    }

    fn assign_blob_owner_role(&self, assignee: &str, scope: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "role",
                "assignment",
                "create",
                "--assignee",
                assignee,
                "--role",
                "Storage Blob Data Owner",
                "--scope",
                scope,
                "--output",
                "none"
            ],
            "role assignment",
            assignee,
        )
    }
}

impl BlobApi for AzCli<'_> {
    fn list_account_names(&self) -> OpsResult<Vec<String>> {
        let stdout = self.run_tsv(
            &cli_args!["storage", "account", "list", "--query", "[].name", "--output", "tsv"],
            "storage account",
            "",
        )?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn list_containers(&self, account: &str) -> OpsResult<Vec<String>> {
        let output = self.runner.run(
            AZ,
            &cli_args![
                "storage",
                "container",
                "list",
                "--account-name",
                account,
                "--auth-mode",
                "login",
                "--query",
                "[].name",
                "--output",
                "tsv"
            ],
            &[],
        )?;
        // An account the caller cannot enumerate contributes no containers.
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn list_blobs(&self, account: &str, container: &str) -> OpsResult<Vec<String>> {
        let stdout = self.run_tsv(
            &cli_args![
                "storage",
                "blob",
                "list",
                "--account-name",
                account,
                "--container-name",
                container,
                "--auth-mode",
                "login",
                "--query",
                "[].name",
                "--output",
                "tsv"
            ],
            "container",
            container,
        )?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn upload_blob(
        &self,
        account: &str,
        container: &str,
        file: &Path,
        blob_name: &str,
    ) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "storage",
                "blob",
                "upload",
                "--account-name",
                account,
                "--container-name",
                container,
                "--file",
                file.display(),
                "--name",
                blob_name,
                "--auth-mode",
                "login"
            ],
            "blob",
            blob_name,
        )
    }

    fn download_blob(
        &self,
        account: &str,
        container: &str,
        blob_name: &str,
        dest: &Path,
    ) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "storage",
                "blob",
                "download",
                "--account-name",
                account,
                "--container-name",
                container,
                "--name",
                blob_name,
                "--file",
                dest.display(),
                "--auth-mode",
                "login"
            ],
            "blob",
            blob_name,
        )
    }

    fn download_batch(&self, account: &str, container: &str, dest: &Path) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "storage",
                "blob",
                "download-batch",
                "--account-name",
                account,
                "--destination",
                dest.display(),
                "--source",
                container,
                "--auth-mode",
                "login"
            ],
            "container",
            container,
        )
    }

    fn show_container(&self, account: &str, container: &str) -> OpsResult<Value> {
        self.run_json(
            &cli_args![
                "storage",
                "container",
                "show",
                "--account-name",
                account,
                "--name",
                container,
                "--auth-mode",
                "login",
                "--output",
                "json"
            ],
            "container",
            container,
        )
    }
}

fn parse_mysql_server(server: &Value) -> MySqlServerInfo {
    MySqlServerInfo {
        name: server["name"].as_str().unwrap_or_default().to_string(),
        resource_group: server["resourceGroup"].as_str().unwrap_or_default().to_string(),
        state: server["state"].as_str().unwrap_or_default().to_string(),
        fqdn: server["fullyQualifiedDomainName"].as_str().unwrap_or_default().to_string(),
        version: server["version"].as_str().unwrap_or_default().to_string(),
        location: server["location"].as_str().unwrap_or_default().to_string(),
        public_access: server["network"]["publicNetworkAccess"].as_str() == Some("Enabled"),
    }
}

impl MySqlApi for AzCli<'_> {
    fn list_servers(&self) -> OpsResult<Vec<MySqlServerInfo>> {
        let value = self.run_json(
            &cli_args!["mysql", "flexible-server", "list", "--output", "json"],
            "mysql server",
            "",
        )?;
        Ok(value
            .as_array()
            .map(|servers| servers.iter().map(parse_mysql_server).collect())
            .unwrap_or_default())
    }

    fn find_server(&self, name: &str) -> OpsResult<Option<MySqlServerInfo>> {
        let value = self.run_json(
            &cli_args![
                "mysql",
                "flexible-server",
                "list",
                "--query",
                format!("[?name=='{name}']"),
                "--output",
                "json"
            ],
            "mysql server",
            name,
        )?;
        Ok(value.as_array().and_then(|s| s.first()).map(parse_mysql_server))
    }

    fn firewall_rule_count(&self, resource_group: &str, server: &str) -> OpsResult<usize> {
        let stdout = self.run_tsv(
            &cli_args![
                "mysql",
                "flexible-server",
                "firewall-rule",
                "list",
                "--resource-group",
                resource_group,
                "--name",
                server,
                "--query",
                "length(@)",
                "--output",
                "tsv"
            ],
            "mysql server",
            server,
        )?;
        stdout
            .parse()
            .map_err(|_| OpsError::Provider { detail: format!("unexpected firewall rule count '{stdout}'") })
    }

    fn create_firewall_rule(
        &self,
        resource_group: &str,
        server: &str,
        rule_name: &str,
        ip: &str,
    ) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "mysql",
                "flexible-server",
                "firewall-rule",
                "create",
                "--resource-group",
                resource_group,
                "--name",
                server,
                "--rule-name",
                rule_name,
                "--start-ip-address",
                ip,
                "--end-ip-address",
                ip,
                "--output",
                "none"
            ],
            "firewall rule",
            rule_name,
        )
    }

    fn delete_firewall_rule(
        &self,
        resource_group: &str,
        server: &str,
        rule_name: &str,
    ) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "mysql",
                "flexible-server",
                "firewall-rule",
                "delete",
                "--resource-group",
                resource_group,
                "--name",
                server,
                "--rule-name",
                rule_name,
                "--yes",
                "--output",
                "none"
            ],
            "firewall rule",
            rule_name,
        )
    }
}

impl JumpHostApi for AzCli<'_> {
    fn jump_host_ip(&self, name: &str, resource_group: &str) -> OpsResult<String> {
        self.run_tsv(
            &cli_args![
                "vm",
                "show",
                "--resource-group",
                resource_group,
                "--name",
                name,
                "--show-details",
                "--query",
                "publicIps",
                "--output",
                "tsv"
            ],
            "vm",
            name,
        )
    }

    fn start_jump_host(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["vm", "start", "--resource-group", resource_group, "--name", name, "--no-wait"],
            "vm",
            name,
        )
    }

    fn list_jump_hosts(&self, resource_group: &str, prefix: &str) -> OpsResult<Vec<(String, String)>> {
        let value = self.run_json(
            &cli_args![
                "vm",
                "list",
                "--resource-group",
                resource_group,
                "--query",
                format!("[?starts_with(name, '{prefix}')].{{name:name, state:powerState}}"),
                "--output",
                "json"
            ],
            "vm",
            "",
        )?;
        Ok(value
            .as_array()
            .map(|vms| {
                vms.iter()
                    .map(|vm| {
                        (
                            vm["name"].as_str().unwrap_or_default().to_string(),
                            vm["state"].as_str().unwrap_or("Unknown").to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_jump_host(&self, name: &str, resource_group: &str, location: &str) -> OpsResult<String> {
        let value = self.run_json(
            &cli_args![
                "vm",
                "create",
                "--resource-group",
                resource_group,
                "--name",
                name,
                "--location",
                location,
                "--image",
                "Ubuntu2204",
                "--size",
                "Standard_B1s",
                "--admin-username",
                "azureuser",
                "--generate-ssh-keys",
                "--public-ip-sku",
                "Standard",
                "--public-ip-address",
                format!("{name}-ip"),
                "--nsg",
                format!("{name}-nsg"),
                "--nsg-rule",
                "SSH",
                "--output",
                "json"
            ],
            "vm",
            name,
        )?;
        value["publicIpAddress"]
            .as_str()
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
            .ok_or_else(|| OpsError::Provider {
                detail: "failed to get jump server VM public IP".to_string(),
            })
    }

    fn delete_jump_resources(&self, name: &str, resource_group: &str) -> OpsResult<()> {
        // Best-effort sweep; a failed delete of one resource must not strand
        // the rest.
        let delete_vm = cli_args![
            "vm",
            "delete",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--yes",
            "--force-deletion",
            "yes",
            "--output",
            "none"
        ];
        if let Err(e) = self.run_checked(&delete_vm, "vm", name) {
            tracing::debug!(error = %e, "jump vm delete skipped");
        }

        let network: [(&str, String); 3] = [
            ("nic", format!("{name}VMNic")),
            ("public-ip", format!("{name}-ip")),
            ("nsg", format!("{name}-nsg")),
        ];
        for (kind, resource) in network {
            let args = cli_args![
                "network",
                kind,
                "delete",
                "--resource-group",
                resource_group,
                "--name",
                resource,
                "--output",
                "none"
            ];
            if let Err(e) = self.run_checked(&args, "resource", name) {
                tracing::debug!(kind, error = %e, "jump resource delete skipped");
            }
        }

        // Disk names carry a generated suffix; find them by prefix.
        if let Ok(disks) = self.list_associated("disk", resource_group, name) {
            for disk in disks {
                if let Err(e) = self.delete_associated("disk", resource_group, &disk) {
                    tracing::debug!(%disk, error = %e, "jump disk delete skipped");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CliOutput;
    use std::cell::RefCell;

    struct FakeRunner {
        responses: RefCell<Vec<CliOutput>>,
        pub calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeRunner {
        fn new(responses: Vec<CliOutput>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self { responses: RefCell::new(responses), calls: RefCell::new(Vec::new()) }
        }

        fn ok(stdout: &str) -> CliOutput {
            CliOutput { stdout: stdout.to_string(), stderr: String::new(), status: 0 }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, _program: &str, args: &[String], _env: &[(String, String)]) -> OpsResult<CliOutput> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(self.responses.borrow_mut().pop().expect("unexpected CLI call"))
        }

        fn run_interactive(&self, _program: &str, args: &[String], _env: &[(String, String)]) -> OpsResult<i32> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(0)
        }
    }

    #[test]
    fn parses_vm_listing() {
        let body = serde_json::json!([{
            "name": "web-01",
            "resourceGroup": "rg-prod",
            "location": "eastus",
            "hardwareProfile": {"vmSize": "Standard_B1s"}
        }]);
        let runner = FakeRunner::new(vec![FakeRunner::ok(&body.to_string())]);
        let az = AzCli::new(&runner);

        let vms = az.list_vms().unwrap();
        assert_eq!(vms.len(), 1);
        assert_eq!(vms[0].name, "web-01");
        assert_eq!(vms[0].resource_group, "rg-prod");
    }

    #[test]
    fn power_state_failure_degrades_to_unknown() {
        let runner = FakeRunner::new(vec![CliOutput {
            stdout: String::new(),
            stderr: "some transient failure".to_string(),
            status: 1,
        }]);
        let az = AzCli::new(&runner);
        assert_eq!(az.power_state("web-01", "rg-prod").unwrap(), "Unknown");
    }

    #[test]
    fn deallocate_is_the_stop_verb() {
        let runner = FakeRunner::new(vec![FakeRunner::ok("")]);
        let az = AzCli::new(&runner);
        az.deallocate_vm("web-01", "rg-prod").unwrap();
        assert!(runner.calls.borrow()[0].contains(&"deallocate".to_string()));
    }

    #[test]
    fn unreadable_account_contributes_no_containers() {
        let runner = FakeRunner::new(vec![CliOutput {
            stdout: String::new(),
            stderr: "AuthorizationFailure".to_string(),
            status: 1,
        }]);
        let az = AzCli::new(&runner);
        assert!(az.list_containers("lockedaccount").unwrap().is_empty());
    }

    #[test]
    fn mysql_public_access_flag() {
        let body = serde_json::json!([{
            "name": "db-1",
            "resourceGroup": "rg-db",
            "state": "Ready",
            "fullyQualifiedDomainName": "db-1.mysql.database.azure.com",
            "version": "8.0.21",
            "location": "eastus",
            "network": {"publicNetworkAccess": "Disabled"}
        }]);
        let runner = FakeRunner::new(vec![FakeRunner::ok(&body.to_string())]);
        let az = AzCli::new(&runner);
        let servers = az.list_servers().unwrap();
        assert!(!servers[0].public_access);
        assert_eq!(servers[0].fqdn, "db-1.mysql.database.azure.com");
    }

    #[test]
    fn associated_disk_listing_uses_disk_group() {
        let runner = FakeRunner::new(vec![FakeRunner::ok("web-01_disk1_abc\n")]);
        let az = AzCli::new(&runner);
        let disks = az.list_associated("disk", "rg-prod", "web-01").unwrap();
        assert_eq!(disks, vec!["web-01_disk1_abc"]);
        let calls = runner.calls.borrow();
        assert_eq!(calls[0][0], "disk");
        assert_ne!(calls[0][0], "network");
    }
}

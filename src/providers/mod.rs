//! Provider capability traits and the adapters that implement them.
//!
//! The command handlers never talk to a cloud SDK or CLI directly: each
//! resource family depends on a narrow trait covering exactly the calls it
//! makes ([`Ec2Api`], [`S3Api`], [`RdsApi`], [`VmApi`], [`StorageApi`],
//! [`BlobApi`], [`MySqlApi`]). Production wires in [`aws::AwsCli`] and
//! [`azure::AzCli`], thin adapters that shell out through
//! [`crate::cloud::CommandRunner`] and parse `--output json`; tests wire in
//! fakes.

pub mod aws;
pub mod azure;

use serde_json::Value;

use crate::cloud::CliOutput;
use crate::error::{OpsError, OpsResult};

/// One row of a selection list: the id the provider understands plus the
/// fields the operator sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: String,
    pub name: String,
    pub state: String,
}

/// EC2 instance details used by the list table and forensic flows.
#[derive(Debug, Clone, Default)]
pub struct InstanceInfo {
    pub id: String,
    pub instance_type: String,
    pub state: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub name: Option<String>,
    pub availability_zone: String,
    pub launch_time: String,
    /// (group id, group name) pairs currently attached.
    pub security_groups: Vec<(String, String)>,
    /// (volume id, device name) pairs from the block device mappings.
    pub volumes: Vec<(String, String)>,
}

impl InstanceInfo {
    #[must_use]
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| "No Name".to_string()),
            state: self.state.clone(),
        }
    }
}

/// Parameters for launching a new EC2 instance. Empty optionals are omitted
/// from the provider call.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    pub ami_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub security_group: Option<String>,
    pub subnet_id: Option<String>,
    pub name_tag: Option<String>,
}

/// EBS snapshot details.
#[derive(Debug, Clone, Default)]
pub struct SnapshotInfo {
    pub id: String,
    pub description: String,
    pub state: String,
    pub volume_size_gb: u64,
    pub start_time: String,
    pub name: Option<String>,
    pub source_instance: Option<String>,
}

impl SnapshotInfo {
    #[must_use]
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| "No Name".to_string()),
            state: self.state.clone(),
        }
    }
}

/// S3 bucket listing entry.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    pub name: String,
    pub created: String,
}

/// S3 object listing entry.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: u64,
}

/// RDS database instance listing entry.
#[derive(Debug, Clone)]
pub struct DbInstanceInfo {
    pub id: String,
    pub engine: String,
    pub status: String,
    pub endpoint: Option<String>,
    pub port: Option<u16>,
}

/// Azure VM listing entry. Azure addresses VMs by name + resource group.
#[derive(Debug, Clone)]
pub struct VmInfo {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub size: String,
}

/// Azure storage account listing entry.
#[derive(Debug, Clone)]
pub struct StorageAccountInfo {
    pub name: String,
    pub resource_group: String,
}

/// Azure MySQL Flexible Server listing entry.
#[derive(Debug, Clone)]
pub struct MySqlServerInfo {
    pub name: String,
    pub resource_group: String,
    pub state: String,
    pub fqdn: String,
    pub version: String,
    pub location: String,
    pub public_access: bool,
}

/// EC2 instance lifecycle and forensic operations.
pub trait Ec2Api {
    fn list_instances(&self, state_filter: Option<&str>) -> OpsResult<Vec<InstanceInfo>>;
    fn describe_instance(&self, id: &str) -> OpsResult<InstanceInfo>;
    fn latest_amazon_linux_ami(&self) -> OpsResult<String>;
    fn launch_instance(&self, spec: &LaunchSpec) -> OpsResult<String>;
    fn wait_instance_running(&self, id: &str) -> OpsResult<()>;
    fn start_instance(&self, id: &str) -> OpsResult<()>;
    fn stop_instance(&self, id: &str) -> OpsResult<()>;
    fn terminate_instance(&self, id: &str) -> OpsResult<()>;

    fn find_security_group(&self, group_name: &str) -> OpsResult<Option<String>>;
    fn default_vpc(&self) -> OpsResult<String>;
    fn create_security_group(&self, name: &str, description: &str, vpc_id: &str)
        -> OpsResult<String>;
    fn revoke_all_egress(&self, group_id: &str) -> OpsResult<()>;
    fn replace_instance_security_groups(&self, id: &str, group_ids: &[String]) -> OpsResult<()>;

    fn create_snapshot(&self, volume_id: &str, description: &str) -> OpsResult<SnapshotInfo>;
    fn tag_resource(&self, resource_id: &str, tags: &[(String, String)]) -> OpsResult<()>;
    fn list_own_snapshots(&self) -> OpsResult<Vec<SnapshotInfo>>;
    fn describe_snapshot(&self, id: &str) -> OpsResult<SnapshotInfo>;
    fn delete_snapshot(&self, id: &str) -> OpsResult<()>;
}

/// S3 bucket and object operations.
pub trait S3Api {
    fn list_buckets(&self) -> OpsResult<Vec<BucketInfo>>;
    fn bucket_exists(&self, name: &str) -> OpsResult<bool>;
    fn create_bucket(&self, name: &str, region: &str) -> OpsResult<()>;
    fn enable_versioning(&self, name: &str) -> OpsResult<()>;
    fn block_public_access(&self, name: &str) -> OpsResult<()>;
    fn empty_bucket(&self, name: &str) -> OpsResult<()>;
    fn delete_bucket(&self, name: &str) -> OpsResult<()>;
    fn list_objects(&self, bucket: &str) -> OpsResult<Vec<ObjectInfo>>;
    fn upload_object(&self, bucket: &str, file: &std::path::Path, key: &str) -> OpsResult<()>;
    fn download_object(&self, bucket: &str, key: &str, dest: &std::path::Path) -> OpsResult<()>;
    fn bucket_location(&self, name: &str) -> OpsResult<String>;
    fn bucket_versioning(&self, name: &str) -> OpsResult<String>;
    /// Fetch one named bucket attribute as raw JSON for the evidence
    /// collector (acl, policy, encryption, ...). Per-call failures are the
    /// caller's to capture; this returns them as errors.
    fn bucket_attribute(&self, name: &str, attribute: &str) -> OpsResult<Value>;
}

/// RDS database instance operations.
pub trait RdsApi {
    fn list_db_instances(&self) -> OpsResult<Vec<DbInstanceInfo>>;
    fn describe_db_instance(&self, id: &str) -> OpsResult<Value>;
    fn start_db_instance(&self, id: &str) -> OpsResult<()>;
    fn stop_db_instance(&self, id: &str) -> OpsResult<()>;
}

/// Azure VM lifecycle operations.
pub trait VmApi {
    fn list_vms(&self) -> OpsResult<Vec<VmInfo>>;
    fn find_vm(&self, name: &str) -> OpsResult<Option<VmInfo>>;
    fn power_state(&self, name: &str, resource_group: &str) -> OpsResult<String>;
    fn list_resource_groups(&self) -> OpsResult<Vec<(String, String)>>;
    fn resource_group_exists(&self, name: &str) -> OpsResult<bool>;
    fn resource_group_location(&self, name: &str) -> OpsResult<String>;
    fn create_resource_group(&self, name: &str, location: &str) -> OpsResult<()>;
    /// Streams `az vm create` progress to the terminal; args are assembled
    /// by the caller because the auth flags vary.
    fn create_vm(&self, args: &[String]) -> OpsResult<()>;
    fn show_vm_details(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    fn start_vm(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    fn deallocate_vm(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    fn delete_vm(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    /// Names of network/disk resources in the group containing `needle`,
    /// for the post-delete sweep. `kind` is the az sub-group ("nic",
    /// "public-ip", "nsg", "disk", "vnet").
    fn list_associated(&self, kind: &str, resource_group: &str, needle: &str)
        -> OpsResult<Vec<String>>;
    fn delete_associated(&self, kind: &str, resource_group: &str, name: &str) -> OpsResult<()>;
}

/// Azure storage account operations.
pub trait StorageApi {
    fn list_accounts(&self) -> OpsResult<Vec<StorageAccountInfo>>;
    /// Names of every resource group in the subscription.
    fn list_group_names(&self) -> OpsResult<Vec<String>>;
    fn create_group(&self, name: &str, location: &str) -> OpsResult<()>;
    fn account_resource_group(&self, name: &str) -> OpsResult<String>;
    fn create_account(
        &self,
        name: &str,
        resource_group: &str,
        location: &str,
        sku: &str,
        kind: &str,
    ) -> OpsResult<()>;
    fn delete_account(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    fn signed_in_user_id(&self) -> OpsResult<String>;
    fn subscription_id(&self) -> OpsResult<String>;
    fn assign_blob_owner_role(&self, assignee: &str, scope: &str) -> OpsResult<()>;
}

/// Azure blob container operations. Containers are addressed by name across
/// all storage accounts, so most calls resolve the owning account first.
pub trait BlobApi {
    fn list_account_names(&self) -> OpsResult<Vec<String>>;
    fn list_containers(&self, account: &str) -> OpsResult<Vec<String>>;
    fn list_blobs(&self, account: &str, container: &str) -> OpsResult<Vec<String>>;
    fn upload_blob(
        &self,
        account: &str,
        container: &str,
        file: &std::path::Path,
        blob_name: &str,
    ) -> OpsResult<()>;
    fn download_blob(
        &self,
        account: &str,
        container: &str,
        blob_name: &str,
        dest: &std::path::Path,
    ) -> OpsResult<()>;
    fn download_batch(&self, account: &str, container: &str, dest: &std::path::Path)
        -> OpsResult<()>;
    fn show_container(&self, account: &str, container: &str) -> OpsResult<Value>;
}

/// Azure MySQL Flexible Server operations for the connect flow.
pub trait MySqlApi {
    fn list_servers(&self) -> OpsResult<Vec<MySqlServerInfo>>;
    fn find_server(&self, name: &str) -> OpsResult<Option<MySqlServerInfo>>;
    fn firewall_rule_count(&self, resource_group: &str, server: &str) -> OpsResult<usize>;
    fn create_firewall_rule(
        &self,
        resource_group: &str,
        server: &str,
        rule_name: &str,
        ip: &str,
    ) -> OpsResult<()>;
    fn delete_firewall_rule(&self, resource_group: &str, server: &str, rule_name: &str)
        -> OpsResult<()>;
}

/// Jump-server VM operations for private-database connectivity.
pub trait JumpHostApi {
    /// (name, power state) of VMs in the group whose names start with
    /// `prefix`.
    fn list_jump_hosts(&self, resource_group: &str, prefix: &str) -> OpsResult<Vec<(String, String)>>;
    fn jump_host_ip(&self, name: &str, resource_group: &str) -> OpsResult<String>;
    fn start_jump_host(&self, name: &str, resource_group: &str) -> OpsResult<()>;
    /// Create the jump VM and return its public IP.
    fn create_jump_host(&self, name: &str, resource_group: &str, location: &str) -> OpsResult<String>;
    /// Best-effort teardown of the VM and its NIC, public IP, NSG, and
    /// disks. Individual failures are skipped, not propagated.
    fn delete_jump_resources(&self, name: &str, resource_group: &str) -> OpsResult<()>;
}

/// Parse a CLI invocation's stdout as JSON, mapping failures into the
/// taxonomy. An empty stdout parses as JSON `null`.
pub fn parse_json(output: &CliOutput, program: &str) -> OpsResult<Value> {
    if output.stdout.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&output.stdout).map_err(|e| OpsError::Provider {
        detail: format!("{program} returned malformed JSON: {e}"),
    })
}

/// Check a captured invocation succeeded, classifying stderr otherwise.
pub fn expect_success(
    output: &CliOutput,
    program: &str,
    kind: &'static str,
    id: &str,
) -> OpsResult<()> {
    if output.success() {
        return Ok(());
    }
    Err(OpsError::classify_cli(program, kind, id, &output.stderr))
}

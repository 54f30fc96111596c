//! CLI argument parsing and command dispatch.
//!
//! One subcommand family per resource kind, mirroring the managers the tool
//! grew out of: `ec2`, `s3`, `rds` on AWS; `vm`, `storage`, `blob`, `db` on
//! Azure; `forensics` for the incident-response flows. Omitted resource ids
//! fall back to the interactive selector.

use std::io;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cloud::ShellRunner;
use crate::config::Config;
use crate::error::OpsResult;
use crate::ops;
use crate::providers::aws::AwsCli;
use crate::providers::azure::AzCli;

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    let mut version = env!("CARGO_PKG_VERSION").to_string();
    if let Some(timestamp) = option_env!("VERGEN_BUILD_TIMESTAMP") {
        version.push_str(&format!("\nbuilt:  {timestamp}"));
    }
    if let Some(rustc) = option_env!("VERGEN_RUSTC_SEMVER") {
        version.push_str(&format!("\nrustc:  {rustc}"));
    }
    if let Some(target) = option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
        version.push_str(&format!("\ntarget: {target}"));
    }
    version
});

/// Operator CLI for AWS/Azure resource lifecycle and incident-response
/// evidence collection.
#[derive(Parser, Debug)]
#[command(name = "nimbus")]
#[command(version, long_version = LONG_VERSION.as_str(), about, long_about = None)]
pub struct Cli {
    /// Resource family to operate on
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level resource families.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage EC2 instances
    Ec2 {
        #[command(subcommand)]
        action: Ec2Action,
    },

    /// Manage S3 buckets and objects
    S3 {
        #[command(subcommand)]
        action: S3Action,
    },

    /// Manage RDS database instances
    Rds {
        #[command(subcommand)]
        action: RdsAction,
    },

    /// Manage Azure VMs
    Vm {
        #[command(subcommand)]
        action: VmAction,
    },

    /// Manage Azure Storage Accounts
    Storage {
        #[command(subcommand)]
        action: StorageAction,
    },

    /// Manage Azure Blob containers
    Blob {
        #[command(subcommand)]
        action: BlobAction,
    },

    /// Incident-response evidence collection
    Forensics {
        #[command(subcommand)]
        action: ForensicsAction,
    },

    /// Database connectivity (Azure MySQL Flexible Server)
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum Ec2Action {
    /// List all EC2 instances
    List,
    /// Create a new EC2 instance interactively
    Create,
    /// Start a stopped instance
    Start { id: Option<String> },
    /// Stop a running instance
    Stop { id: Option<String> },
    /// Terminate an instance
    Terminate { id: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum S3Action {
    /// List all S3 buckets
    List,
    /// Create a new bucket interactively
    Create,
    /// Delete a bucket (empties it first)
    Delete { name: Option<String> },
    /// Upload file(s); the last argument may name the target bucket
    Upload { files: Vec<String> },
    /// Download one object
    Download { bucket: Option<String>, key: Option<String>, dest: Option<String> },
    /// Download every object as a zip archive
    Dump { bucket: Option<String> },
    /// Show bucket information
    Info { name: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum RdsAction {
    /// List all database instances
    List,
    /// Show the raw description of one instance
    Describe { id: Option<String> },
    /// Start a stopped database
    Start { id: Option<String> },
    /// Stop a running database
    Stop { id: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum VmAction {
    /// List all VMs in the current subscription
    List,
    /// Create a new VM interactively
    Create,
    /// Start a stopped VM
    Start { name: Option<String> },
    /// Stop (deallocate) a running VM
    Stop { name: Option<String> },
    /// Delete a VM and optionally its associated resources
    Delete { name: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum StorageAction {
    /// List all Storage Accounts
    List,
    /// Create a new Storage Account interactively
    Create,
    /// Delete a Storage Account
    Delete { name: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum BlobAction {
    /// List all containers across all Storage Accounts
    List,
    /// Upload file(s) to a container; the last argument names the container
    Upload {
        #[arg(required = true, num_args = 2.., value_name = "FILES... CONTAINER")]
        args: Vec<String>,
    },
    /// Download blob(s) from a container
    Download { container: String, blob: Option<String> },
    /// Download every blob as a zip archive
    Dump { container: String },
    /// Show container information
    Info { container: String },
}

#[derive(Subcommand, Debug)]
pub enum ForensicsAction {
    /// Quarantine an instance by swapping its security groups
    Isolate { id: Option<String> },
    /// Snapshot every volume of an instance for evidence preservation
    Snapshot { id: Option<String> },
    /// Delete an EBS snapshot (double confirmation, audit report)
    SnapshotDelete { id: Option<String> },
    /// Collect metadata for every bucket into a JSON evidence file
    Buckets,
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    /// Connect to a MySQL Flexible Server (tunnelled when private)
    Connect { server: Option<String> },
}

/// Dispatch a parsed command. Provider credentials are checked before the
/// first provider call of each family.
pub fn run(cli: Cli, config: &Config) -> OpsResult<()> {
    let runner = ShellRunner;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    match cli.command {
        Command::Ec2 { action } => {
            let aws = AwsCli::new(&runner, &config.aws.region);
            preflight_aws(&aws)?;
            match action {
                Ec2Action::List => ops::ec2::list(&aws),
                Ec2Action::Create => ops::ec2::create(&mut input, &aws),
                Ec2Action::Start { id } => ops::ec2::start(&mut input, &aws, id),
                Ec2Action::Stop { id } => ops::ec2::stop(&mut input, &aws, id),
                Ec2Action::Terminate { id } => ops::ec2::terminate(&mut input, &aws, id),
            }
        }

        Command::S3 { action } => {
            let aws = AwsCli::new(&runner, &config.aws.region);
            preflight_aws(&aws)?;
            match action {
                S3Action::List => ops::s3::list(&aws),
                S3Action::Create => ops::s3::create(&mut input, &aws, config),
                S3Action::Delete { name } => ops::s3::delete(&mut input, &aws, name),
                S3Action::Upload { files } => {
                    let (files, bucket) = ops::s3::split_upload_args(&aws, files)?;
                    ops::s3::upload(&mut input, &aws, &files, bucket)
                }
                S3Action::Download { bucket, key, dest } => {
                    ops::s3::download(&mut input, &aws, bucket, key, dest, config)
                }
                S3Action::Dump { bucket } => ops::s3::dump(&mut input, &aws, bucket, config),
                S3Action::Info { name } => ops::s3::info(&mut input, &aws, name),
            }
        }

        Command::Rds { action } => {
            let aws = AwsCli::new(&runner, &config.aws.region);
            preflight_aws(&aws)?;
            match action {
                RdsAction::List => ops::rds::list(&aws),
                RdsAction::Describe { id } => ops::rds::describe(&mut input, &aws, id),
                RdsAction::Start { id } => ops::rds::start(&mut input, &aws, id),
                RdsAction::Stop { id } => ops::rds::stop(&mut input, &aws, id),
            }
        }

        Command::Vm { action } => {
            let az = AzCli::new(&runner);
            preflight_azure(&az)?;
            match action {
                VmAction::List => ops::vm::list(&az),
                VmAction::Create => ops::vm::create(&mut input, &az),
                VmAction::Start { name } => ops::vm::start(&mut input, &az, name),
                VmAction::Stop { name } => ops::vm::stop(&mut input, &az, name),
                VmAction::Delete { name } => ops::vm::delete(&mut input, &az, name),
            }
        }

        Command::Storage { action } => {
            let az = AzCli::new(&runner);
            preflight_azure(&az)?;
            match action {
                StorageAction::List => ops::storage::list(&az),
                StorageAction::Create => ops::storage::create(&mut input, &az),
                StorageAction::Delete { name } => ops::storage::delete(&mut input, &az, name),
            }
        }

        Command::Blob { action } => {
            let az = AzCli::new(&runner);
            preflight_azure(&az)?;
            match action {
                BlobAction::List => ops::blob::list(&az),
                BlobAction::Upload { args } => {
                    let (files, container) = args.split_at(args.len() - 1);
                    ops::blob::upload(&az, files, &container[0])
                }
                BlobAction::Download { container, blob } => {
                    ops::blob::download(&mut input, &az, &container, blob, config)
                }
                BlobAction::Dump { container } => ops::blob::dump(&mut input, &az, &container, config),
                BlobAction::Info { container } => ops::blob::info(&az, &container),
            }
        }

        Command::Forensics { action } => {
            let aws = AwsCli::new(&runner, &config.aws.region);
            preflight_aws(&aws)?;
            match action {
                ForensicsAction::Isolate { id } => ops::forensics::isolate(&mut input, &aws, config, id),
                ForensicsAction::Snapshot { id } => ops::forensics::snapshot(&mut input, &aws, config, id),
                ForensicsAction::SnapshotDelete { id } => {
                    ops::forensics::snapshot_delete(&mut input, &aws, config, id)
                }
                ForensicsAction::Buckets => ops::forensics::buckets(&mut input, &aws, config),
            }
        }

        Command::Db { action } => {
            let az = AzCli::new(&runner);
            preflight_azure(&az)?;
            match action {
                DbAction::Connect { server } => {
                    ops::db::connect(&mut input, &runner, &az, &az, config, server)
                }
            }
        }
    }
}

fn preflight_aws(aws: &AwsCli<'_>) -> OpsResult<()> {
    let identity = aws.check_credentials()?;
    debug!(%identity, "aws credentials verified");
    Ok(())
}

fn preflight_azure(az: &AzCli<'_>) -> OpsResult<()> {
    let account = az.check_credentials()?;
    debug!(%account, "azure login verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::parse_from(["nimbus", "ec2", "terminate", "i-0abc"]);
        match cli.command {
            Command::Ec2 { action: Ec2Action::Terminate { id } } => {
                assert_eq!(id.as_deref(), Some("i-0abc"));
            }
            other => panic!("unexpected parse: {other:?}"),
        }

        let cli = Cli::parse_from(["nimbus", "forensics", "snapshot-delete"]);
        assert!(matches!(
            cli.command,
            Command::Forensics { action: ForensicsAction::SnapshotDelete { id: None } }
        ));
    }

    #[test]
    fn blob_upload_requires_file_and_container() {
        let result = Cli::try_parse_from(["nimbus", "blob", "upload", "only-one-arg"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["nimbus", "blob", "upload", "a.txt", "b.txt", "evidence"]);
        match cli.command {
            Command::Blob { action: BlobAction::Upload { args } } => {
                assert_eq!(args, vec!["a.txt", "b.txt", "evidence"]);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}

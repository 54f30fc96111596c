//! AWS adapter over the `aws` CLI.
//!
//! Every call shells out with `--output json` and parses the result. The
//! adapter is deliberately mechanical: build argv, run, classify, extract.
//! Region handling follows the CLI's own profile resolution; the configured
//! region is only passed where a call is region-sensitive (bucket creation).

use std::path::Path;

use serde_json::{json, Value};

use crate::cli_args;
use crate::cloud::CommandRunner;
use crate::error::{OpsError, OpsResult};
use crate::providers::{
    expect_success, parse_json, BucketInfo, DbInstanceInfo, Ec2Api, InstanceInfo, LaunchSpec,
    ObjectInfo, RdsApi, S3Api, SnapshotInfo,
};

const AWS: &str = "aws";

/// Thin adapter implementing the AWS capability traits.
pub struct AwsCli<'a> {
    runner: &'a dyn CommandRunner,
    region: String,
}

impl<'a> AwsCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, region: &str) -> Self {
        Self { runner, region: region.to_string() }
    }

    /// Credential preflight: `aws sts get-caller-identity`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::CredentialsMissing`] when the CLI cannot resolve
    /// credentials.
    pub fn check_credentials(&self) -> OpsResult<String> {
        let output = self.runner.run(AWS, &cli_args!["sts", "get-caller-identity", "--output", "json"], &[])?;
        if !output.success() {
            return Err(OpsError::CredentialsMissing {
                provider: "aws",
                hint: "run `aws configure` or set AWS environment variables",
            });
        }
        let value = parse_json(&output, AWS)?;
        Ok(value["Arn"].as_str().unwrap_or("unknown").to_string())
    }

    fn run_json(&self, args: &[String]) -> OpsResult<Value> {
        let output = self.runner.run(AWS, args, &[])?;
        expect_success(&output, AWS, "resource", "")?;
        parse_json(&output, AWS)
    }

    fn run_checked(&self, args: &[String], kind: &'static str, id: &str) -> OpsResult<()> {
        let output = self.runner.run(AWS, args, &[])?;
        expect_success(&output, AWS, kind, id)
    }
}

/// Flatten a describe-instances response into instance records.
fn parse_reservations(value: &Value) -> Vec<InstanceInfo> {
    let mut instances = Vec::new();
    for reservation in value["Reservations"].as_array().unwrap_or(&Vec::new()) {
        for inst in reservation["Instances"].as_array().unwrap_or(&Vec::new()) {
            instances.push(parse_instance(inst));
        }
    }
    instances
}

fn parse_instance(inst: &Value) -> InstanceInfo {
    let name = inst["Tags"]
        .as_array()
        .and_then(|tags| {
            tags.iter()
                .find(|t| t["Key"].as_str() == Some("Name"))
                .and_then(|t| t["Value"].as_str())
        })
        .map(str::to_string);

    let security_groups = inst["SecurityGroups"]
        .as_array()
        .map(|groups| {
            groups
                .iter()
                .map(|g| {
                    (
                        g["GroupId"].as_str().unwrap_or_default().to_string(),
                        g["GroupName"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let volumes = inst["BlockDeviceMappings"]
        .as_array()
        .map(|mappings| {
            mappings
                .iter()
                .filter_map(|m| {
                    let volume_id = m["Ebs"]["VolumeId"].as_str()?;
                    let device = m["DeviceName"].as_str().unwrap_or_default();
                    Some((volume_id.to_string(), device.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    InstanceInfo {
        id: inst["InstanceId"].as_str().unwrap_or_default().to_string(),
        instance_type: inst["InstanceType"].as_str().unwrap_or_default().to_string(),
        state: inst["State"]["Name"].as_str().unwrap_or_default().to_string(),
        public_ip: inst["PublicIpAddress"].as_str().map(str::to_string),
        private_ip: inst["PrivateIpAddress"].as_str().map(str::to_string),
        name,
        availability_zone: inst["Placement"]["AvailabilityZone"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        launch_time: inst["LaunchTime"].as_str().unwrap_or_default().to_string(),
        security_groups,
        volumes,
    }
}

fn parse_snapshot(snap: &Value) -> SnapshotInfo {
    let tag = |key: &str| {
        snap["Tags"].as_array().and_then(|tags| {
            tags.iter()
                .find(|t| t["Key"].as_str() == Some(key))
                .and_then(|t| t["Value"].as_str())
                .map(str::to_string)
        })
    };

    SnapshotInfo {
        id: snap["SnapshotId"].as_str().unwrap_or_default().to_string(),
        description: snap["Description"].as_str().unwrap_or_default().to_string(),
        state: snap["State"].as_str().unwrap_or_default().to_string(),
        volume_size_gb: snap["VolumeSize"].as_u64().unwrap_or(0),
        start_time: snap["StartTime"].as_str().unwrap_or_default().to_string(),
        name: tag("Name"),
        source_instance: tag("SourceInstance"),
    }
}

impl Ec2Api for AwsCli<'_> {
    fn list_instances(&self, state_filter: Option<&str>) -> OpsResult<Vec<InstanceInfo>> {
        let mut args = cli_args!["ec2", "describe-instances", "--output", "json"];
        if let Some(state) = state_filter {
            args.push("--filters".to_string());
            args.push(format!("Name=instance-state-name,Values={state}"));
        }
        Ok(parse_reservations(&self.run_json(&args)?))
    }

    fn describe_instance(&self, id: &str) -> OpsResult<InstanceInfo> {
        let args = cli_args!["ec2", "describe-instances", "--instance-ids", id, "--output", "json"];
        let output = self.runner.run(AWS, &args, &[])?;
        expect_success(&output, AWS, "instance", id)?;
        let value = parse_json(&output, AWS)?;
        parse_reservations(&value)
            .into_iter()
            .next()
            .ok_or_else(|| OpsError::NotFound { kind: "instance", id: id.to_string() })
    }

    fn latest_amazon_linux_ami(&self) -> OpsResult<String> {
        let value = self.run_json(&cli_args![
            "ec2",
            "describe-images",
            "--owners",
            "amazon",
            "--filters",
            "Name=name,Values=al2023-ami-2023*-x86_64",
            "Name=state,Values=available",
            "--output",
            "json"
        ])?;

        let mut images: Vec<&Value> = value["Images"].as_array().map(|a| a.iter().collect()).unwrap_or_default();
        images.sort_by_key(|img| std::cmp::Reverse(img["CreationDate"].as_str().unwrap_or_default().to_string()));
        images
            .first()
            .and_then(|img| img["ImageId"].as_str())
            .map(str::to_string)
            .ok_or_else(|| OpsError::Provider { detail: "no Amazon Linux 2023 image available".to_string() })
    }

    fn launch_instance(&self, spec: &LaunchSpec) -> OpsResult<String> {
        let mut args = cli_args![
            "ec2",
            "run-instances",
            "--image-id",
            spec.ami_id,
            "--instance-type",
            spec.instance_type,
            "--count",
            "1",
            "--output",
            "json"
        ];
        if let Some(key) = &spec.key_name {
            args.push("--key-name".to_string());
            args.push(key.clone());
        }
        if let Some(group) = &spec.security_group {
            args.push("--security-group-ids".to_string());
            args.push(group.clone());
        }
        if let Some(subnet) = &spec.subnet_id {
            args.push("--subnet-id".to_string());
            args.push(subnet.clone());
        }
        if let Some(name) = &spec.name_tag {
            args.push("--tag-specifications".to_string());
            args.push(
                json!([{
                    "ResourceType": "instance",
                    "Tags": [{"Key": "Name", "Value": name}],
                }])
                .to_string(),
            );
        }

        let value = self.run_json(&args)?;
        value["Instances"][0]["InstanceId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OpsError::Provider { detail: "run-instances returned no instance id".to_string() })
    }

    fn wait_instance_running(&self, id: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["ec2", "wait", "instance-running", "--instance-ids", id], "instance", id)
    }

    fn start_instance(&self, id: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["ec2", "start-instances", "--instance-ids", id, "--output", "json"], "instance", id)
    }

    fn stop_instance(&self, id: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["ec2", "stop-instances", "--instance-ids", id, "--output", "json"], "instance", id)
    }

    fn terminate_instance(&self, id: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["ec2", "terminate-instances", "--instance-ids", id, "--output", "json"],
            "instance",
            id,
        )
    }

    fn find_security_group(&self, group_name: &str) -> OpsResult<Option<String>> {
        let args = cli_args![
            "ec2",
            "describe-security-groups",
            "--group-names",
            group_name,
            "--output",
            "json"
        ];
        let output = self.runner.run(AWS, &args, &[])?;
        if !output.success() {
            // InvalidGroup.NotFound means "create it"; anything else is real.
            return match OpsError::classify_cli(AWS, "security group", group_name, &output.stderr) {
                OpsError::NotFound { .. } => Ok(None),
                other => Err(other),
            };
        }
        let value = parse_json(&output, AWS)?;
        Ok(value["SecurityGroups"][0]["GroupId"].as_str().map(str::to_string))
    }

    fn default_vpc(&self) -> OpsResult<String> {
        let value = self.run_json(&cli_args![
            "ec2",
            "describe-vpcs",
            "--filters",
            "Name=isDefault,Values=true",
            "--output",
            "json"
        ])?;
        value["Vpcs"][0]["VpcId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OpsError::Provider { detail: "could not find default VPC".to_string() })
    }

    fn create_security_group(&self, name: &str, description: &str, vpc_id: &str) -> OpsResult<String> {
        let value = self.run_json(&cli_args![
            "ec2",
            "create-security-group",
            "--group-name",
            name,
            "--description",
            description,
            "--vpc-id",
            vpc_id,
            "--output",
            "json"
        ])?;
        value["GroupId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| OpsError::Provider { detail: "create-security-group returned no id".to_string() })
    }

    fn revoke_all_egress(&self, group_id: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "ec2",
                "revoke-security-group-egress",
                "--group-id",
                group_id,
                "--protocol",
                "all",
                "--cidr",
                "0.0.0.0/0"
            ],
            "security group",
            group_id,
        )
    }

    fn replace_instance_security_groups(&self, id: &str, group_ids: &[String]) -> OpsResult<()> {
        let mut args = cli_args!["ec2", "modify-instance-attribute", "--instance-id", id, "--groups"];
        args.extend(group_ids.iter().cloned());
        self.run_checked(&args, "instance", id)
    }

    fn create_snapshot(&self, volume_id: &str, description: &str) -> OpsResult<SnapshotInfo> {
        let value = self.run_json(&cli_args![
            "ec2",
            "create-snapshot",
            "--volume-id",
            volume_id,
            "--description",
            description,
            "--output",
            "json"
        ])?;
        Ok(parse_snapshot(&value))
    }

    fn tag_resource(&self, resource_id: &str, tags: &[(String, String)]) -> OpsResult<()> {
        let tag_json: Vec<Value> =
            tags.iter().map(|(k, v)| json!({"Key": k, "Value": v})).collect();
        self.run_checked(
            &cli_args![
                "ec2",
                "create-tags",
                "--resources",
                resource_id,
                "--tags",
                Value::Array(tag_json).to_string()
            ],
            "resource",
            resource_id,
        )
    }

    fn list_own_snapshots(&self) -> OpsResult<Vec<SnapshotInfo>> {
        let value = self.run_json(&cli_args![
            "ec2",
            "describe-snapshots",
            "--owner-ids",
            "self",
            "--output",
            "json"
        ])?;
        Ok(value["Snapshots"]
            .as_array()
            .map(|snaps| snaps.iter().map(parse_snapshot).collect())
            .unwrap_or_default())
    }

    fn describe_snapshot(&self, id: &str) -> OpsResult<SnapshotInfo> {
        let args = cli_args!["ec2", "describe-snapshots", "--snapshot-ids", id, "--output", "json"];
        let output = self.runner.run(AWS, &args, &[])?;
        expect_success(&output, AWS, "snapshot", id)?;
        let value = parse_json(&output, AWS)?;
        value["Snapshots"][0]
            .as_object()
            .map(|_| parse_snapshot(&value["Snapshots"][0]))
            .ok_or_else(|| OpsError::NotFound { kind: "snapshot", id: id.to_string() })
    }

    fn delete_snapshot(&self, id: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["ec2", "delete-snapshot", "--snapshot-id", id], "snapshot", id)
    }
}

impl S3Api for AwsCli<'_> {
    fn list_buckets(&self) -> OpsResult<Vec<BucketInfo>> {
        let value = self.run_json(&cli_args!["s3api", "list-buckets", "--output", "json"])?;
        Ok(value["Buckets"]
            .as_array()
            .map(|buckets| {
                buckets
                    .iter()
                    .map(|b| BucketInfo {
                        name: b["Name"].as_str().unwrap_or_default().to_string(),
                        created: b["CreationDate"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn bucket_exists(&self, name: &str) -> OpsResult<bool> {
        let output = self.runner.run(AWS, &cli_args!["s3api", "head-bucket", "--bucket", name], &[])?;
        if output.success() {
            return Ok(true);
        }
        match OpsError::classify_cli(AWS, "bucket", name, &output.stderr) {
            OpsError::NotFound { .. } => Ok(false),
            other => Err(other),
        }
    }

    fn create_bucket(&self, name: &str, region: &str) -> OpsResult<()> {
        let mut args = cli_args!["s3api", "create-bucket", "--bucket", name, "--region", region];
        // us-east-1 rejects an explicit location constraint.
        if region != "us-east-1" {
            args.push("--create-bucket-configuration".to_string());
            args.push(format!("LocationConstraint={region}"));
        }
        self.run_checked(&args, "bucket", name)
    }

    fn enable_versioning(&self, name: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "s3api",
                "put-bucket-versioning",
                "--bucket",
                name,
                "--versioning-configuration",
                "Status=Enabled"
            ],
            "bucket",
            name,
        )
    }

    fn block_public_access(&self, name: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args![
                "s3api",
                "put-public-access-block",
                "--bucket",
                name,
                "--public-access-block-configuration",
                "BlockPublicAcls=true,IgnorePublicAcls=true,BlockPublicPolicy=true,RestrictPublicBuckets=true"
            ],
            "bucket",
            name,
        )
    }

    fn empty_bucket(&self, name: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["s3", "rm", format!("s3://{name}"), "--recursive"], "bucket", name)
    }

    fn delete_bucket(&self, name: &str) -> OpsResult<()> {
        self.run_checked(&cli_args!["s3api", "delete-bucket", "--bucket", name], "bucket", name)
    }

    fn list_objects(&self, bucket: &str) -> OpsResult<Vec<ObjectInfo>> {
        let args = cli_args!["s3api", "list-objects-v2", "--bucket", bucket, "--output", "json"];
        let output = self.runner.run(AWS, &args, &[])?;
        expect_success(&output, AWS, "bucket", bucket)?;
        let value = parse_json(&output, AWS)?;
        Ok(value["Contents"]
            .as_array()
            .map(|objects| {
                objects
                    .iter()
                    .map(|o| ObjectInfo {
                        key: o["Key"].as_str().unwrap_or_default().to_string(),
                        size_bytes: o["Size"].as_u64().unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn upload_object(&self, bucket: &str, file: &Path, key: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["s3", "cp", file.display(), format!("s3://{bucket}/{key}")],
            "bucket",
            bucket,
        )
    }

    fn download_object(&self, bucket: &str, key: &str, dest: &Path) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["s3", "cp", format!("s3://{bucket}/{key}"), dest.display()],
            "object",
            key,
        )
    }

    fn bucket_location(&self, name: &str) -> OpsResult<String> {
        let value =
            self.run_json(&cli_args!["s3api", "get-bucket-location", "--bucket", name, "--output", "json"])?;
        Ok(value["LocationConstraint"].as_str().unwrap_or("us-east-1").to_string())
    }

    fn bucket_versioning(&self, name: &str) -> OpsResult<String> {
        let value =
            self.run_json(&cli_args!["s3api", "get-bucket-versioning", "--bucket", name, "--output", "json"])?;
        Ok(value["Status"].as_str().unwrap_or("Disabled").to_string())
    }

    fn bucket_attribute(&self, name: &str, attribute: &str) -> OpsResult<Value> {
        // One attribute breaks the get-bucket-* naming pattern.
        let subcommand = if attribute == "public-access-block" {
            "get-public-access-block".to_string()
        } else {
            format!("get-bucket-{attribute}")
        };
        let args = cli_args!["s3api", subcommand, "--bucket", name, "--output", "json"];
        let output = self.runner.run(AWS, &args, &[])?;
        expect_success(&output, AWS, "bucket", name)?;
        parse_json(&output, AWS)
    }
}

impl RdsApi for AwsCli<'_> {
    fn list_db_instances(&self) -> OpsResult<Vec<DbInstanceInfo>> {
        let value = self.run_json(&cli_args!["rds", "describe-db-instances", "--output", "json"])?;
        Ok(value["DBInstances"]
            .as_array()
            .map(|dbs| {
                dbs.iter()
                    .map(|db| DbInstanceInfo {
                        id: db["DBInstanceIdentifier"].as_str().unwrap_or_default().to_string(),
                        engine: db["Engine"].as_str().unwrap_or_default().to_string(),
                        status: db["DBInstanceStatus"].as_str().unwrap_or_default().to_string(),
                        endpoint: db["Endpoint"]["Address"].as_str().map(str::to_string),
                        port: db["Endpoint"]["Port"].as_u64().and_then(|p| u16::try_from(p).ok()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn describe_db_instance(&self, id: &str) -> OpsResult<Value> {
        let args = cli_args![
            "rds",
            "describe-db-instances",
            "--db-instance-identifier",
            id,
            "--output",
            "json"
        ];
        let output = self.runner.run(AWS, &args, &[])?;
        expect_success(&output, AWS, "database", id)?;
        parse_json(&output, AWS)
    }

    fn start_db_instance(&self, id: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["rds", "start-db-instance", "--db-instance-identifier", id, "--output", "json"],
            "database",
            id,
        )
    }

    fn stop_db_instance(&self, id: &str) -> OpsResult<()> {
        self.run_checked(
            &cli_args!["rds", "stop-db-instance", "--db-instance-identifier", id, "--output", "json"],
            "database",
            id,
        )
    }
}

impl AwsCli<'_> {
    /// Region configured for region-sensitive calls.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

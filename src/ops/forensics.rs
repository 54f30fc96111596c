//! Incident-response commands: instance isolation, evidence snapshots,
//! snapshot deletion with audit trail, and bucket metadata collection.
//!
//! These are the flows where the confirmation and reporting discipline
//! matters most: isolation and snapshot deletion both write their audit
//! artifact before touching the resource, and snapshot deletion sits behind
//! the double confirmation gate.

use std::fs;
use std::io::BufRead;

use chrono::{Local, Utc};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::Config;
use crate::error::{OpsError, OpsResult};
use crate::ops::resolve_id;
use crate::prompt;
use crate::providers::{Ec2Api, ResourceDescriptor, S3Api, SnapshotInfo};
use crate::report::{self, Details};
use crate::style::{self, Level};

const QUARANTINE_SG_NAME: &str = "ec2-quarantine-sg";
const QUARANTINE_SG_DESCRIPTION: &str =
    "Quarantine Security Group for Incident Response - Blocks all traffic";

/// Bucket attributes collected by `forensics buckets`, in report order.
const BUCKET_ATTRIBUTES: [&str; 8] = [
    "location",
    "acl",
    "public-access-block",
    "policy",
    "versioning",
    "encryption",
    "logging",
    "lifecycle-configuration",
];

/// `nimbus forensics isolate [ID]` - swap all security groups for the
/// quarantine group, backing up the originals first.
pub fn isolate<R: BufRead>(
    input: &mut R,
    api: &dyn Ec2Api,
    config: &Config,
    id: Option<String>,
) -> OpsResult<()> {
    style::line(Level::Error, "EC2 Instance Isolation for Incident Response");
    style::separator(50);
    println!();

    let quarantine_sg = ensure_quarantine_group(api)?;

    let Some(instance_id) = resolve_id(input, id, || active_instances(api), "isolate")? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("Verifying instance {instance_id}..."));
    let instance = api.describe_instance(&instance_id)?;

    style::line(Level::Warn, "Current security groups:");
    for (group_id, group_name) in &instance.security_groups {
        println!("  - {group_id} ({group_name})");
    }

    println!();
    style::line(
        Level::Error,
        "WARNING: This will isolate the instance by replacing all security groups with the quarantine SG",
    );
    style::line(Level::Error, "The instance will be completely isolated from network traffic");
    if !prompt::confirm(input, "Are you sure you want to proceed? (y/N): ")? {
        return Err(OpsError::ConfirmationDeclined);
    }

    let original_groups: Vec<String> =
        instance.security_groups.iter().map(|(id, _)| id.clone()).collect();
    let backup_file = report::write_sg_backup(&instance_id, &original_groups)?;
    style::line(Level::Success, &format!("Original security groups saved to: {}", backup_file.display()));

    style::line(Level::Warn, "Applying quarantine security group...");
    api.replace_instance_security_groups(&instance_id, &[quarantine_sg.clone()])?;

    let details: Details = vec![
        ("Quarantine Security Group".to_string(), quarantine_sg.clone()),
        ("Original Security Groups".to_string(), original_groups.join(", ")),
        ("Instance State".to_string(), instance.state.clone()),
        ("Instance Type".to_string(), instance.instance_type.clone()),
        ("Availability Zone".to_string(), instance.availability_zone.clone()),
        ("Launch Time".to_string(), instance.launch_time.clone()),
        ("Original SG Backup File".to_string(), backup_file.display().to_string()),
    ];
    let report_dir = report::resolve_output_dir(input, &config.output_dir())?;
    let report_file = report::write_report(&report_dir, &instance_id, "NETWORK_ISOLATION", &details)?;

    println!();
    style::line(Level::Success, &format!("✓ Instance {instance_id} has been successfully isolated!"));
    style::line(Level::Success, &format!("✓ Applied quarantine security group: {quarantine_sg}"));
    style::line(Level::Success, "✓ All network traffic blocked (inbound and outbound)");
    style::line(Level::Success, &format!("✓ Evidence report generated: {}", report_file.display()));
    println!();
    style::line(Level::Error, "INCIDENT RESPONSE NOTE:");
    style::line(Level::Warn, "- Instance is now isolated for forensic analysis");
    style::line(Level::Warn, "- Consider creating EBS snapshots for evidence preservation");
    style::line(Level::Warn, "- To restore connectivity, restore original security groups from the backup file");

    println!();
    if prompt::confirm(input, "Do you want to create an EBS snapshot for evidence preservation? (y/N): ")? {
        println!();
        style::line(Level::Detail, "Creating EBS snapshot...");
        snapshot(input, api, config, Some(instance_id))?;
    }
    Ok(())
}

/// `nimbus forensics snapshot [ID]` - snapshot every attached volume with
/// evidence tags and a SHA-256 custody digest per snapshot.
pub fn snapshot<R: BufRead>(
    input: &mut R,
    api: &dyn Ec2Api,
    config: &Config,
    id: Option<String>,
) -> OpsResult<()> {
    style::line(Level::Info, "EBS Snapshot Creation for Evidence Preservation");
    style::separator(50);
    println!();

    let Some(instance_id) = resolve_id(input, id, || active_instances(api), "snapshot")? else {
        return Ok(());
    };

    style::line(Level::Warn, "Retrieving instance information...");
    let instance = api.describe_instance(&instance_id)?;

    if instance.volumes.is_empty() {
        style::line(Level::Warn, &format!("No EBS volumes found attached to instance {instance_id}"));
        return Ok(());
    }

    style::line(
        Level::Success,
        &format!("Found {} EBS volume(s) attached to instance:", instance.volumes.len()),
    );
    for (volume_id, device) in &instance.volumes {
        println!("  - Volume: {volume_id} (Device: {device})");
    }

    println!();
    style::line(Level::Error, "EVIDENCE DOCUMENTATION:");
    let case_number =
        prompt::read_line(input, "Enter case/incident number (optional, press Enter to skip): ")?;
    let case_number = case_number.trim().to_string();
    let reason = prompt::read_line_or(
        input,
        "Enter reason for evidence preservation: ",
        "Digital forensics evidence collection",
    )?;

    let stamp = Local::now().format("%Y-%m-%d-%H%M%S");
    let operator = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "Unknown".to_string());
    let mut snapshots: Vec<(SnapshotInfo, String, String)> = Vec::new();

    println!();
    style::line(Level::Warn, "Creating snapshots...");

    for (volume_id, device) in &instance.volumes {
        let mut description = format!("EVIDENCE-SNAPSHOT-{instance_id}-{device}-{stamp}");
        if !case_number.is_empty() {
            description = format!("CASE-{case_number}-{description}");
        }

        style::line(Level::Warn, &format!("  Creating snapshot for volume {volume_id} ({device})..."));
        let snap = api.create_snapshot(volume_id, &description)?;

        let mut tags = vec![
            ("Name".to_string(), format!("Evidence-{instance_id}-{device}")),
            ("SourceInstance".to_string(), instance_id.clone()),
            ("SourceVolume".to_string(), volume_id.clone()),
            ("EvidenceType".to_string(), "DigitalForensics".to_string()),
            ("CreatedBy".to_string(), operator.clone()),
            ("CreationReason".to_string(), reason.clone()),
        ];
        if !case_number.is_empty() {
            tags.push(("CaseNumber".to_string(), case_number.clone()));
        }
        api.tag_resource(&snap.id, &tags)?;

        let digest = custody_digest(&snap.id);
        style::line(Level::Success, &format!("  ✓ Snapshot created: {}", snap.id));
        println!("    SHA256: {digest}");

        snapshots.push((snap, volume_id.clone(), device.clone()));
    }

    let mut details: Details = vec![
        (
            "Case Number".to_string(),
            if case_number.is_empty() { "Not specified".to_string() } else { case_number.clone() },
        ),
        ("Preservation Reason".to_string(), reason),
        ("Source Instance Type".to_string(), instance.instance_type.clone()),
        ("Source Instance State".to_string(), instance.state.clone()),
        ("Source Instance AZ".to_string(), instance.availability_zone.clone()),
        ("Total Volumes Processed".to_string(), instance.volumes.len().to_string()),
        ("Snapshots Created".to_string(), snapshots.len().to_string()),
    ];
    for (i, (snap, volume_id, device)) in snapshots.iter().enumerate() {
        let n = i + 1;
        details.push((format!("Snapshot {n} ID"), snap.id.clone()));
        details.push((format!("Snapshot {n} Source Volume"), volume_id.clone()));
        details.push((format!("Snapshot {n} Device"), device.clone()));
        details.push((format!("Snapshot {n} SHA256"), custody_digest(&snap.id)));
    }

    let report_dir = report::resolve_output_dir(input, &config.output_dir())?;
    let report_file =
        report::write_report(&report_dir, &instance_id, "EBS_SNAPSHOT_CREATION", &details)?;

    println!();
    style::line(Level::Success, "✓ Evidence preservation completed successfully!");
    style::line(Level::Success, &format!("✓ Created {} EBS snapshot(s)", snapshots.len()));
    style::line(Level::Success, &format!("✓ Evidence report generated: {}", report_file.display()));
    println!();
    style::line(Level::Error, "SNAPSHOT DETAILS FOR CHAIN OF CUSTODY:");
    style::separator(60);
    for (snap, volume_id, device) in &snapshots {
        println!("Snapshot ID: {}", snap.id);
        println!("Source Volume: {volume_id}");
        println!("Device: {device}");
        println!("Created: {}", snap.start_time);
        style::separator(30);
    }
    Ok(())
}

/// `nimbus forensics snapshot-delete [SNAP-ID]` - irreversible; double
/// confirmation, mandatory reason, audit report before the delete call.
pub fn snapshot_delete<R: BufRead>(
    input: &mut R,
    api: &dyn Ec2Api,
    config: &Config,
    id: Option<String>,
) -> OpsResult<()> {
    style::line(Level::Error, "EBS Snapshot Deletion");
    style::separator(50);
    println!();

    let candidates =
        || Ok(api.list_own_snapshots()?.iter().map(SnapshotInfo::descriptor).collect());
    let Some(snapshot_id) = resolve_id(input, id, candidates, "delete")? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("Verifying snapshot {snapshot_id}..."));
    let snap = api.describe_snapshot(&snapshot_id)?;

    style::line(Level::Warn, "Snapshot Details:");
    println!("  ID: {}", snap.id);
    println!("  Description: {}", snap.description);
    println!("  Size: {}GB", snap.volume_size_gb);
    println!("  Created: {}", snap.start_time);
    println!("  State: {}", snap.state);

    println!();
    style::line(Level::Error, "⚠️  CRITICAL WARNING ⚠️");
    style::line(Level::Error, "You are about to DELETE digital evidence!");
    style::line(Level::Error, "This action is IRREVERSIBLE and may impact legal proceedings.");
    style::line(Level::Error, "Ensure you have proper authorization and documentation.");
    println!();

    let reason = prompt::read_line(input, "Enter reason for snapshot deletion (required): ")?;
    let reason = reason.trim().to_string();
    if reason.is_empty() {
        return Err(OpsError::Provider {
            detail: "deletion reason is required for audit purposes".to_string(),
        });
    }

    if !prompt::confirm_double(input, "DELETE")? {
        return Err(OpsError::ConfirmationDeclined);
    }

    let details: Details = vec![
        ("Deleted Snapshot ID".to_string(), snap.id.clone()),
        ("Snapshot Description".to_string(), snap.description.clone()),
        ("Snapshot Size".to_string(), format!("{}GB", snap.volume_size_gb)),
        ("Snapshot Creation Time".to_string(), snap.start_time.clone()),
        ("Deletion Reason".to_string(), reason),
        ("Deletion Authorization".to_string(), "Confirmed by operator".to_string()),
    ];
    // Audit log first; the deletion must never outrun its paper trail.
    let report_dir = report::resolve_output_dir(input, &config.output_dir())?;
    let audit_file =
        report::write_report(&report_dir, "DELETED-SNAPSHOT", "SNAPSHOT_DELETION", &details)?;

    style::line(Level::Warn, &format!("Deleting snapshot {snapshot_id}..."));
    api.delete_snapshot(&snapshot_id)?;

    println!();
    style::line(Level::Success, &format!("✓ Snapshot {snapshot_id} has been successfully deleted"));
    style::line(Level::Success, &format!("✓ Deletion audit log generated: {}", audit_file.display()));
    println!();
    style::line(Level::Error, "AUDIT TRAIL REMINDER:");
    style::line(Level::Warn, "- Snapshot deletion has been logged with timestamp and reason");
    style::line(Level::Warn, "- Preserve the audit log for compliance and legal purposes");
    Ok(())
}

/// `nimbus forensics buckets` - collect per-bucket metadata into a
/// timestamped JSON document. Per-attribute failures are captured inline as
/// `{"_error": ...}` instead of aborting the sweep.
pub fn buckets<R: BufRead>(input: &mut R, api: &dyn S3Api, config: &Config) -> OpsResult<()> {
    println!("=== S3 Forensic Evidence Collector ===");

    let include_objects =
        prompt::confirm(input, "Include object count and total size? (y/N): ")?;
    let output_dir = report::resolve_output_dir(input, &config.output_dir())?;

    println!();
    style::line(Level::Info, "Retrieving bucket list...");
    let buckets = api.list_buckets()?;
    if buckets.is_empty() {
        style::line(Level::Warn, "No buckets found in this account");
        return Ok(());
    }

    let mut evidence = Vec::new();
    for bucket in &buckets {
        style::line(Level::Detail, &format!("Processing: {}", bucket.name));
        evidence.push(collect_bucket_info(api, &bucket.name, &bucket.created, include_objects)?);
    }

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let output_file = output_dir.join(format!("s3_bucket_evidence_{stamp}.json"));
    let body = serde_json::to_string_pretty(&Value::Array(evidence)).map_err(|e| {
        OpsError::Provider { detail: format!("failed to serialize evidence: {e}") }
    })?;
    fs::write(&output_file, body).map_err(|source| OpsError::LocalIo {
        context: format!("failed to write {}", output_file.display()),
        source,
    })?;

    println!();
    style::line(Level::Success, &format!("✓ Evidence saved to: {}", output_file.display()));
    Ok(())
}

/// Metadata document for one bucket, attribute failures captured inline.
fn collect_bucket_info(
    api: &dyn S3Api,
    name: &str,
    created: &str,
    include_objects: bool,
) -> OpsResult<Value> {
    let mut info = Map::new();
    info.insert("bucket_name".to_string(), json!(name));
    info.insert("creation_date".to_string(), json!(created));

    for attribute in BUCKET_ATTRIBUTES {
        let key = attribute.replace('-', "_");
        match api.bucket_attribute(name, attribute) {
            Ok(value) => info.insert(key, value),
            Err(e) => info.insert(key, json!({"_error": e.to_string()})),
        };
    }

    if include_objects {
        match api.list_objects(name) {
            Ok(objects) => {
                let total: u64 = objects.iter().map(|o| o.size_bytes).sum();
                info.insert("object_count".to_string(), json!(objects.len()));
                info.insert("total_size_bytes".to_string(), json!(total));
            }
            Err(e) => {
                info.insert("object_stats".to_string(), json!({"_error": e.to_string()}));
            }
        }
    }

    Ok(Value::Object(info))
}

/// Selection candidates: every instance that is not terminated.
fn active_instances(api: &dyn Ec2Api) -> OpsResult<Vec<ResourceDescriptor>> {
    Ok(api
        .list_instances(None)?
        .into_iter()
        .filter(|i| i.state != "terminated")
        .map(|i| i.descriptor())
        .collect())
}

/// SHA-256 over the snapshot id, recorded in the custody trail so the
/// analyst can match console output to the report later.
fn custody_digest(snapshot_id: &str) -> String {
    format!("{:x}", Sha256::digest(snapshot_id.as_bytes()))
}

/// Find or create the quarantine security group (no ingress, no egress).
fn ensure_quarantine_group(api: &dyn Ec2Api) -> OpsResult<String> {
    style::line(Level::Warn, "Checking for quarantine security group...");

    if let Some(group_id) = api.find_security_group(QUARANTINE_SG_NAME)? {
        style::line(Level::Success, &format!("Using existing quarantine security group: {group_id}"));
        return Ok(group_id);
    }

    style::line(Level::Warn, "Creating quarantine security group...");
    let vpc_id = api.default_vpc()?;
    let group_id = api.create_security_group(QUARANTINE_SG_NAME, QUARANTINE_SG_DESCRIPTION, &vpc_id)?;
    style::line(Level::Success, &format!("Created quarantine security group: {group_id}"));

    // The default egress rule may already be gone; that is not a failure.
    if let Err(e) = api.revoke_all_egress(&group_id) {
        debug!(error = %e, "egress revoke skipped");
    }

    style::line(
        Level::Success,
        "Quarantine security group configured (no inbound/outbound traffic allowed)",
    );
    Ok(group_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{BucketInfo, InstanceInfo, LaunchSpec, ObjectInfo};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::path::Path;

    #[derive(Default)]
    struct FakeForensicsEc2 {
        instances: Vec<InstanceInfo>,
        snapshots: Vec<SnapshotInfo>,
        existing_quarantine: Option<String>,
        replaced_groups: RefCell<Vec<(String, Vec<String>)>>,
        created_snapshots: RefCell<Vec<String>>,
        deleted_snapshots: RefCell<Vec<String>>,
        tagged: RefCell<Vec<String>>,
    }

    impl Ec2Api for FakeForensicsEc2 {
        fn list_instances(&self, _: Option<&str>) -> OpsResult<Vec<InstanceInfo>> {
            Ok(self.instances.clone())
        }
        fn describe_instance(&self, id: &str) -> OpsResult<InstanceInfo> {
            self.instances
                .iter()
                .find(|i| i.id == id)
                .cloned()
                .ok_or_else(|| OpsError::NotFound { kind: "instance", id: id.to_string() })
        }
        fn latest_amazon_linux_ami(&self) -> OpsResult<String> {
            unimplemented!()
        }
        fn launch_instance(&self, _: &LaunchSpec) -> OpsResult<String> {
            unimplemented!()
        }
        fn wait_instance_running(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn start_instance(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn stop_instance(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn terminate_instance(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn find_security_group(&self, _: &str) -> OpsResult<Option<String>> {
            Ok(self.existing_quarantine.clone())
        }
        fn default_vpc(&self) -> OpsResult<String> {
            Ok("vpc-default".to_string())
        }
        fn create_security_group(&self, _: &str, _: &str, _: &str) -> OpsResult<String> {
            Ok("sg-quarantine-new".to_string())
        }
        fn revoke_all_egress(&self, _: &str) -> OpsResult<()> {
            Ok(())
        }
        fn replace_instance_security_groups(&self, id: &str, groups: &[String]) -> OpsResult<()> {
            self.replaced_groups.borrow_mut().push((id.to_string(), groups.to_vec()));
            Ok(())
        }
        fn create_snapshot(&self, volume_id: &str, description: &str) -> OpsResult<SnapshotInfo> {
            self.created_snapshots.borrow_mut().push(volume_id.to_string());
            Ok(SnapshotInfo {
                id: format!("snap-{volume_id}"),
                description: description.to_string(),
                state: "pending".to_string(),
                start_time: "2026-03-01T00:00:00Z".to_string(),
                ..Default::default()
            })
        }
        fn tag_resource(&self, resource_id: &str, _: &[(String, String)]) -> OpsResult<()> {
            self.tagged.borrow_mut().push(resource_id.to_string());
            Ok(())
        }
        fn list_own_snapshots(&self) -> OpsResult<Vec<SnapshotInfo>> {
            Ok(self.snapshots.clone())
        }
        fn describe_snapshot(&self, id: &str) -> OpsResult<SnapshotInfo> {
            self.snapshots
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| OpsError::NotFound { kind: "snapshot", id: id.to_string() })
        }
        fn delete_snapshot(&self, id: &str) -> OpsResult<()> {
            self.deleted_snapshots.borrow_mut().push(id.to_string());
            Ok(())
        }
    }

    fn instance_with_volumes() -> InstanceInfo {
        InstanceInfo {
            id: "i-compromised".to_string(),
            instance_type: "t3.medium".to_string(),
            state: "running".to_string(),
            availability_zone: "us-east-1a".to_string(),
            launch_time: "2026-01-15T08:00:00Z".to_string(),
            security_groups: vec![
                ("sg-web".to_string(), "web".to_string()),
                ("sg-ssh".to_string(), "ssh".to_string()),
            ],
            volumes: vec![
                ("vol-root".to_string(), "/dev/xvda".to_string()),
                ("vol-data".to_string(), "/dev/xvdf".to_string()),
            ],
            ..Default::default()
        }
    }

    fn snapshot_info(id: &str) -> SnapshotInfo {
        SnapshotInfo {
            id: id.to_string(),
            description: "EVIDENCE".to_string(),
            state: "completed".to_string(),
            volume_size_gb: 8,
            start_time: "2026-02-01T00:00:00Z".to_string(),
            ..Default::default()
        }
    }

    fn config_with_output(dir: &Path) -> Config {
        let mut config = Config::default();
        config.general.output_dir = Some(dir.display().to_string());
        config
    }

    #[test]
    fn isolate_swaps_groups_and_reports() {
        let out = tempfile::tempdir().unwrap();
        let api = FakeForensicsEc2 {
            instances: vec![instance_with_volumes()],
            existing_quarantine: Some("sg-quarantine".to_string()),
            ..Default::default()
        };
        // select 1, confirm y, report dir default, decline snapshot
        let mut input = Cursor::new("1\ny\n\nn\n");
        isolate(&mut input, &api, &config_with_output(out.path()), None).unwrap();

        let replaced = api.replaced_groups.borrow();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].1, vec!["sg-quarantine".to_string()]);

        let report_exists = fs::read_dir(out.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|e| e.file_name().to_string_lossy().starts_with("evidence-report-i-compromised"));
        assert!(report_exists, "evidence report should land in the output dir");
    }

    #[test]
    fn isolate_declined_leaves_groups_alone() {
        let api = FakeForensicsEc2 {
            instances: vec![instance_with_volumes()],
            existing_quarantine: Some("sg-quarantine".to_string()),
            ..Default::default()
        };
        let mut input = Cursor::new("1\nn\n");
        let err = isolate(&mut input, &api, &Config::default(), None).unwrap_err();
        assert!(matches!(err, OpsError::ConfirmationDeclined));
        assert!(api.replaced_groups.borrow().is_empty());
    }

    #[test]
    fn snapshot_covers_every_volume() {
        let out = tempfile::tempdir().unwrap();
        let api = FakeForensicsEc2 { instances: vec![instance_with_volumes()], ..Default::default() };
        // case number, reason, report dir default
        let mut input = Cursor::new("CASE-42\nransomware triage\n\n");
        snapshot(&mut input, &api, &config_with_output(out.path()), Some("i-compromised".to_string()))
            .unwrap();

        assert_eq!(*api.created_snapshots.borrow(), vec!["vol-root".to_string(), "vol-data".to_string()]);
        assert_eq!(api.tagged.borrow().len(), 2);
    }

    #[test]
    fn snapshot_delete_lowercase_literal_aborts_before_second_prompt() {
        let api = FakeForensicsEc2 { snapshots: vec![snapshot_info("snap-1")], ..Default::default() };
        // reason, then wrong-case literal; no second answer supplied on purpose
        let mut input = Cursor::new("1\ncleanup\ndelete\n");
        let err =
            snapshot_delete(&mut input, &api, &Config::default(), None).unwrap_err();
        assert!(matches!(err, OpsError::ConfirmationDeclined));
        assert!(api.deleted_snapshots.borrow().is_empty());
    }

    #[test]
    fn snapshot_delete_requires_reason() {
        let api = FakeForensicsEc2 { snapshots: vec![snapshot_info("snap-1")], ..Default::default() };
        let mut input = Cursor::new("1\n\n");
        let err = snapshot_delete(&mut input, &api, &Config::default(), None).unwrap_err();
        assert!(matches!(err, OpsError::Provider { .. }));
        assert!(api.deleted_snapshots.borrow().is_empty());
    }

    #[test]
    fn snapshot_delete_full_flow_writes_audit_then_deletes() {
        let out = tempfile::tempdir().unwrap();
        let api = FakeForensicsEc2 { snapshots: vec![snapshot_info("snap-1")], ..Default::default() };
        // select, reason, DELETE, yes, report dir default
        let mut input = Cursor::new("1\nauthorized disposal\nDELETE\nyes\n\n");
        snapshot_delete(&mut input, &api, &config_with_output(out.path()), None).unwrap();

        assert_eq!(*api.deleted_snapshots.borrow(), vec!["snap-1".to_string()]);
        let audit = fs::read_dir(out.path())
            .unwrap()
            .filter_map(Result::ok)
            .find(|e| e.file_name().to_string_lossy().contains("DELETED-SNAPSHOT"))
            .expect("audit report written");
        let body = fs::read_to_string(audit.path()).unwrap();
        assert!(body.contains("Deletion Reason: authorized disposal"));
    }

    struct FakeEvidenceS3 {
        buckets: Vec<BucketInfo>,
        fail_attribute: &'static str,
    }

    impl S3Api for FakeEvidenceS3 {
        fn list_buckets(&self) -> OpsResult<Vec<BucketInfo>> {
            Ok(self.buckets.clone())
        }
        fn bucket_exists(&self, _: &str) -> OpsResult<bool> {
            Ok(true)
        }
        fn create_bucket(&self, _: &str, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn enable_versioning(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn block_public_access(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn empty_bucket(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn delete_bucket(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn list_objects(&self, _: &str) -> OpsResult<Vec<ObjectInfo>> {
            Ok(vec![ObjectInfo { key: "a".to_string(), size_bytes: 10 }])
        }
        fn upload_object(&self, _: &str, _: &Path, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn download_object(&self, _: &str, _: &str, _: &Path) -> OpsResult<()> {
            unimplemented!()
        }
        fn bucket_location(&self, _: &str) -> OpsResult<String> {
            Ok("us-east-1".to_string())
        }
        fn bucket_versioning(&self, _: &str) -> OpsResult<String> {
            Ok("Disabled".to_string())
        }
        fn bucket_attribute(&self, _: &str, attribute: &str) -> OpsResult<Value> {
            if attribute == self.fail_attribute {
                Err(OpsError::PermissionDenied { detail: "AccessDenied".to_string() })
            } else {
                Ok(json!({"attribute": attribute}))
            }
        }
    }

    #[test]
    fn bucket_evidence_captures_per_call_errors_inline() {
        let out = tempfile::tempdir().unwrap();
        let api = FakeEvidenceS3 {
            buckets: vec![BucketInfo {
                name: "case-data".to_string(),
                created: "2026-01-01T00:00:00Z".to_string(),
            }],
            fail_attribute: "policy",
        };
        // include objects y, report dir default
        let mut input = Cursor::new("y\n\n");
        buckets(&mut input, &api, &config_with_output(out.path())).unwrap();

        let file = fs::read_dir(out.path())
            .unwrap()
            .filter_map(Result::ok)
            .find(|e| e.file_name().to_string_lossy().starts_with("s3_bucket_evidence_"))
            .expect("evidence file written");
        let parsed: Value = serde_json::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
        let bucket = &parsed[0];
        assert_eq!(bucket["bucket_name"], "case-data");
        assert!(bucket["policy"]["_error"].as_str().unwrap().contains("permission denied"));
        assert_eq!(bucket["object_count"], 1);
        assert_eq!(bucket["total_size_bytes"], 10);
    }

    #[test]
    fn bucket_evidence_with_zero_buckets_is_ok() {
        let api = FakeEvidenceS3 { buckets: vec![], fail_attribute: "" };
        let mut input = Cursor::new("n\n\n");
        let out = tempfile::tempdir().unwrap();
        buckets(&mut input, &api, &config_with_output(out.path())).unwrap();
    }

    #[test]
    fn custody_digest_is_stable_hex() {
        let digest = custody_digest("snap-1");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, custody_digest("snap-1"));
        assert_ne!(digest, custody_digest("snap-2"));
    }
}

//! EC2 instance lifecycle commands.

use std::io::BufRead;

use crate::error::{OpsError, OpsResult};
use crate::ops::resolve_id;
use crate::prompt;
use crate::providers::{Ec2Api, InstanceInfo, LaunchSpec};
use crate::style::{self, Level};

/// `nimbus ec2 list` - table of all instances.
pub fn list(api: &dyn Ec2Api) -> OpsResult<()> {
    style::line(Level::Info, "Listing EC2 Instances...");
    println!();

    let instances = api.list_instances(None)?;
    if instances.is_empty() {
        style::line(Level::Warn, "No EC2 instances found");
        return Ok(());
    }

    style::line(
        Level::Success,
        &format!(
            "{:<20} {:<12} {:<12} {:<15} {:<15} {}",
            "Instance ID", "Type", "State", "Public IP", "Private IP", "Name"
        ),
    );
    style::separator(100);

    for inst in &instances {
        let row = format!(
            "{:<20} {:<12} {:<12} {:<15} {:<15} {}",
            inst.id,
            inst.instance_type,
            inst.state,
            inst.public_ip.as_deref().unwrap_or("N/A"),
            inst.private_ip.as_deref().unwrap_or("N/A"),
            inst.name.as_deref().unwrap_or("N/A"),
        );
        println!("{}", style::state_row(&inst.state, &row));
    }

    Ok(())
}

/// `nimbus ec2 create` - interactive launch.
pub fn create<R: BufRead>(input: &mut R, api: &dyn Ec2Api) -> OpsResult<()> {
    style::line(Level::Info, "Create New EC2 Instance");
    println!();

    let ami_id = {
        let typed = prompt::read_line(
            input,
            "Enter AMI ID (press Enter for Amazon Linux 2023 in current region): ",
        )?;
        if typed.trim().is_empty() {
            println!("Getting latest Amazon Linux 2023 AMI...");
            let ami = api.latest_amazon_linux_ami()?;
            println!("Using AMI: {ami}");
            ami
        } else {
            typed.trim().to_string()
        }
    };

    let instance_type = prompt::read_line_or(input, "Enter instance type (default: t2.micro): ", "t2.micro")?;
    let key_name = optional(prompt::read_line(input, "Enter key pair name (optional): ")?);
    let security_group = optional(prompt::read_line(input, "Enter security group ID (optional): ")?);
    let subnet_id = optional(prompt::read_line(input, "Enter subnet ID (optional): ")?);
    let name_tag = optional(prompt::read_line(input, "Enter instance name tag: ")?);

    let spec = LaunchSpec { ami_id, instance_type, key_name, security_group, subnet_id, name_tag };

    println!();
    style::line(Level::Warn, "Creating instance...");

    let instance_id = api.launch_instance(&spec)?;
    style::line(Level::Success, "✓ Instance created successfully!");
    println!("Instance ID: {instance_id}");
    println!();
    println!("Waiting for instance to start...");

    api.wait_instance_running(&instance_id)?;
    style::line(Level::Success, "✓ Instance is now running");

    let detail = api.describe_instance(&instance_id)?;
    if let Some(ip) = detail.public_ip {
        println!("Public IP: {ip}");
    }

    Ok(())
}

/// `nimbus ec2 terminate [ID]`.
pub fn terminate<R: BufRead>(input: &mut R, api: &dyn Ec2Api, id: Option<String>) -> OpsResult<()> {
    let candidates = || {
        Ok(non_terminated(api.list_instances(None)?).iter().map(InstanceInfo::descriptor).collect())
    };
    let Some(instance_id) = resolve_id(input, id, candidates, "terminate")? else {
        return Ok(());
    };

    // A typed literal id is only validated here, by the provider.
    api.describe_instance(&instance_id)?;

    style::line(Level::Warn, &format!("WARNING: This will terminate instance {instance_id}"));
    if !prompt::confirm(input, "Are you sure? (yes/no): ")? {
        return Err(OpsError::ConfirmationDeclined);
    }

    println!("Terminating instance...");
    api.terminate_instance(&instance_id)?;
    style::line(Level::Success, &format!("✓ Instance {instance_id} is being terminated"));
    Ok(())
}

/// `nimbus ec2 start [ID]` - only stopped instances are offered.
pub fn start<R: BufRead>(input: &mut R, api: &dyn Ec2Api, id: Option<String>) -> OpsResult<()> {
    let candidates =
        || Ok(api.list_instances(Some("stopped"))?.iter().map(InstanceInfo::descriptor).collect());
    let Some(instance_id) = resolve_id(input, id, candidates, "start")? else {
        return Ok(());
    };

    println!("Starting instance {instance_id}...");
    match api.start_instance(&instance_id) {
        Ok(()) => {}
        Err(OpsError::AlreadyInState { detail }) => {
            style::line(Level::Warn, &format!("Instance {instance_id} needs no start ({detail})"));
            return Ok(());
        }
        Err(e) => return Err(e),
    }
    style::line(Level::Success, &format!("✓ Instance {instance_id} is starting"));
    println!("Waiting for instance to be running...");
    api.wait_instance_running(&instance_id)?;
    style::line(Level::Success, "✓ Instance is now running");
    Ok(())
}

/// `nimbus ec2 stop [ID]` - only running instances are offered.
pub fn stop<R: BufRead>(input: &mut R, api: &dyn Ec2Api, id: Option<String>) -> OpsResult<()> {
    let candidates =
        || Ok(api.list_instances(Some("running"))?.iter().map(InstanceInfo::descriptor).collect());
    let Some(instance_id) = resolve_id(input, id, candidates, "stop")? else {
        return Ok(());
    };

    println!("Stopping instance {instance_id}...");
    match api.stop_instance(&instance_id) {
        Ok(()) => {}
        Err(OpsError::AlreadyInState { detail }) => {
            style::line(Level::Warn, &format!("Instance {instance_id} needs no stop ({detail})"));
            return Ok(());
        }
        Err(e) => return Err(e),
    }
    style::line(Level::Success, &format!("✓ Instance {instance_id} is stopping"));
    Ok(())
}

fn non_terminated(instances: Vec<InstanceInfo>) -> Vec<InstanceInfo> {
    instances.into_iter().filter(|i| i.state != "terminated").collect()
}

fn optional(answer: String) -> Option<String> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SnapshotInfo;
    use std::cell::RefCell;
    use std::io::Cursor;

    /// Fake EC2 API recording lifecycle calls.
    #[derive(Default)]
    struct FakeEc2 {
        instances: Vec<InstanceInfo>,
        terminated: RefCell<Vec<String>>,
        started: RefCell<Vec<String>>,
        stopped: RefCell<Vec<String>>,
    }

    fn instance(id: &str, state: &str) -> InstanceInfo {
        InstanceInfo {
            id: id.to_string(),
            instance_type: "t2.micro".to_string(),
            state: state.to_string(),
            name: Some(format!("name-{id}")),
            ..Default::default()
        }
    }

    impl Ec2Api for FakeEc2 {
        fn list_instances(&self, state_filter: Option<&str>) -> OpsResult<Vec<InstanceInfo>> {
            Ok(self
                .instances
                .iter()
                .filter(|i| state_filter.map_or(true, |s| i.state == s))
                .cloned()
                .collect())
        }

        fn describe_instance(&self, id: &str) -> OpsResult<InstanceInfo> {
            self.instances
                .iter()
                .find(|i| i.id == id)
                .cloned()
                .ok_or_else(|| OpsError::NotFound { kind: "instance", id: id.to_string() })
        }

        fn latest_amazon_linux_ami(&self) -> OpsResult<String> {
            Ok("ami-al2023".to_string())
        }

        fn launch_instance(&self, _spec: &LaunchSpec) -> OpsResult<String> {
            Ok("i-new".to_string())
        }

        fn wait_instance_running(&self, _id: &str) -> OpsResult<()> {
            Ok(())
        }

        fn start_instance(&self, id: &str) -> OpsResult<()> {
            self.started.borrow_mut().push(id.to_string());
            Ok(())
        }

        fn stop_instance(&self, id: &str) -> OpsResult<()> {
            self.stopped.borrow_mut().push(id.to_string());
            Ok(())
        }

        fn terminate_instance(&self, id: &str) -> OpsResult<()> {
            self.terminated.borrow_mut().push(id.to_string());
            Ok(())
        }

        fn find_security_group(&self, _name: &str) -> OpsResult<Option<String>> {
            unimplemented!("not used by lifecycle tests")
        }
        fn default_vpc(&self) -> OpsResult<String> {
            unimplemented!()
        }
        fn create_security_group(&self, _: &str, _: &str, _: &str) -> OpsResult<String> {
            unimplemented!()
        }
        fn revoke_all_egress(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
        fn replace_instance_security_groups(&self, _: &str, _: &[String]) -> OpsResult<()> {
            unimplemented!()
        }
        fn create_snapshot(&self, _: &str, _: &str) -> OpsResult<SnapshotInfo> {
            unimplemented!()
        }
        fn tag_resource(&self, _: &str, _: &[(String, String)]) -> OpsResult<()> {
            unimplemented!()
        }
        fn list_own_snapshots(&self) -> OpsResult<Vec<SnapshotInfo>> {
            unimplemented!()
        }
        fn describe_snapshot(&self, _: &str) -> OpsResult<SnapshotInfo> {
            unimplemented!()
        }
        fn delete_snapshot(&self, _: &str) -> OpsResult<()> {
            unimplemented!()
        }
    }

    #[test]
    fn terminate_with_yes_issues_exactly_one_call() {
        let api = FakeEc2 { instances: vec![instance("i-1", "running")], ..Default::default() };
        let mut input = Cursor::new("1\nyes\n");
        terminate(&mut input, &api, None).unwrap();
        assert_eq!(*api.terminated.borrow(), vec!["i-1".to_string()]);
    }

    #[test]
    fn terminate_declined_issues_no_call() {
        let api = FakeEc2 { instances: vec![instance("i-1", "running")], ..Default::default() };
        let mut input = Cursor::new("1\nno\n");
        let err = terminate(&mut input, &api, None).unwrap_err();
        assert!(matches!(err, OpsError::ConfirmationDeclined));
        assert!(api.terminated.borrow().is_empty());
    }

    #[test]
    fn terminate_out_of_range_issues_no_call() {
        let api = FakeEc2 { instances: vec![instance("i-1", "running")], ..Default::default() };
        let mut input = Cursor::new("7\n");
        let err = terminate(&mut input, &api, None).unwrap_err();
        assert!(matches!(err, OpsError::InvalidSelection { .. }));
        assert!(api.terminated.borrow().is_empty());
    }

    #[test]
    fn terminate_cancelled_when_no_instances() {
        let api = FakeEc2::default();
        let mut input = Cursor::new("");
        terminate(&mut input, &api, None).unwrap();
        assert!(api.terminated.borrow().is_empty());
    }

    #[test]
    fn terminate_unknown_literal_id_is_not_found() {
        let api = FakeEc2 { instances: vec![instance("i-1", "running")], ..Default::default() };
        let mut input = Cursor::new("i-bogus\n");
        let err = terminate(&mut input, &api, None).unwrap_err();
        assert!(matches!(err, OpsError::NotFound { .. }));
        assert!(api.terminated.borrow().is_empty());
    }

    #[test]
    fn start_offers_only_stopped_instances() {
        let api = FakeEc2 {
            instances: vec![instance("i-run", "running"), instance("i-stop", "stopped")],
            ..Default::default()
        };
        // Index 1 must resolve to the only stopped instance.
        let mut input = Cursor::new("1\n");
        start(&mut input, &api, None).unwrap();
        assert_eq!(*api.started.borrow(), vec!["i-stop".to_string()]);
    }

    #[test]
    fn stop_with_explicit_id_skips_selection() {
        let api = FakeEc2 { instances: vec![instance("i-run", "running")], ..Default::default() };
        let mut input = Cursor::new("");
        stop(&mut input, &api, Some("i-run".to_string())).unwrap();
        assert_eq!(*api.stopped.borrow(), vec!["i-run".to_string()]);
    }

    #[test]
    fn list_handles_zero_instances() {
        let api = FakeEc2::default();
        list(&api).unwrap();
    }
}

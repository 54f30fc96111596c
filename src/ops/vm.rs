//! Azure VM lifecycle commands.
//!
//! Azure VMs are addressed by name + resource group, so selection lists
//! carry the group in the display name and handlers re-resolve the group
//! for explicitly named VMs.

use std::io::BufRead;

use chrono::Local;

use crate::cli_args;
use crate::error::{OpsError, OpsResult};
use crate::prompt::{self, Selection};
use crate::providers::{ResourceDescriptor, VmApi, VmInfo};
use crate::style::{self, Level};

const SIZES: [(&str, &str); 4] = [
    ("Standard_B1s", "1 vCPU, 1 GB RAM  (Lowest cost)"),
    ("Standard_B1ms", "1 vCPU, 2 GB RAM"),
    ("Standard_B2s", "2 vCPU, 4 GB RAM"),
    ("Standard_D2s_v3", "2 vCPU, 8 GB RAM"),
];

const IMAGES: [(&str, &str); 5] = [
    ("Ubuntu2204", "Ubuntu 22.04 LTS"),
    ("Ubuntu2404", "Ubuntu 24.04 LTS"),
    ("Debian11", "Debian 11"),
    ("Win2022Datacenter", "Windows Server 2022"),
    ("Win2019Datacenter", "Windows Server 2019"),
];

/// Resource kinds swept by the post-delete cleanup, in deletion order.
const ASSOCIATED_KINDS: [(&str, &str); 5] = [
    ("nic", "Network Interfaces"),
    ("public-ip", "Public IP addresses"),
    ("nsg", "Network Security Groups"),
    ("disk", "Disks"),
    ("vnet", "Virtual Networks"),
];

/// `nimbus vm list` - table with live power state per VM.
pub fn list(api: &dyn VmApi) -> OpsResult<()> {
    style::line(Level::Info, "Listing Azure VMs...");
    println!();

    let vms = api.list_vms()?;
    if vms.is_empty() {
        style::line(Level::Warn, "No VMs found in current subscription");
        return Ok(());
    }

    style::line(
        Level::Detail,
        &format!("{:<20} {:<20} {:<15} {:<18} {}", "VM Name", "Resource Group", "Location", "Size", "State"),
    );
    style::separator(88);

    for vm in &vms {
        let power = api.power_state(&vm.name, &vm.resource_group)?;
        let row = format!(
            "{:<20} {:<20} {:<15} {:<18} {}",
            vm.name, vm.resource_group, vm.location, vm.size, power
        );
        println!("{}", style::state_row(&power, &row));
    }
    Ok(())
}

/// `nimbus vm create` - guided create with size/image menus.
pub fn create<R: BufRead>(input: &mut R, api: &dyn VmApi) -> OpsResult<()> {
    style::line(Level::Info, "Create New Azure VM");
    println!();

    let default_name = format!("azure-vm-{}", Local::now().format("%Y%m%d%H%M%S"));
    let vm_name =
        prompt::read_line_or(input, &format!("Enter VM name (default: {default_name}): "), &default_name)?;

    // Resource group: numbered pick, free name, or default.
    println!();
    style::line(Level::Detail, "Available Resource Groups:");
    let groups = api.list_resource_groups()?;
    if groups.is_empty() {
        println!("  No resource groups found");
    } else {
        for (i, (name, location)) in groups.iter().enumerate() {
            println!("  {}. {name} ({location})", i + 1);
        }
    }
    println!();
    let rg_answer =
        prompt::read_line(input, "Enter resource group name or number (default: rg-forensics): ")?;
    let rg_name = resolve_group_answer(rg_answer.trim(), &groups);

    let location = if api.resource_group_exists(&rg_name)? {
        api.resource_group_location(&rg_name)?
    } else {
        style::line(Level::Warn, "Resource group does not exist. Creating...");
        let location =
            prompt::read_line_or(input, "Enter location (default: northcentralus): ", "northcentralus")?;
        api.create_resource_group(&rg_name, &location)?;
        style::line(Level::Success, "✓ Resource group created");
        location
    };

    let vm_size = menu_pick(input, "Select VM Size:", &SIZES, "Choose VM size [1-4] (default: 1): ")?;
    let image = menu_pick(input, "Select Image:", &IMAGES, "Choose image [1-5] (default: 1): ")?;

    println!();
    let admin_user =
        prompt::read_line_or(input, "Enter admin username (default: azureuser): ", "azureuser")?;

    println!();
    style::line(Level::Detail, "Authentication Method:");
    println!("  1. SSH key (Linux VMs)");
    println!("  2. Password");
    println!();
    let auth_method =
        prompt::read_line_or(input, "Choose authentication method [1-2] (default: 1): ", "1")?;

    let mut args = cli_args![
        "--name",
        vm_name,
        "--resource-group",
        rg_name,
        "--location",
        location,
        "--size",
        vm_size,
        "--image",
        image,
        "--admin-username",
        admin_user
    ];

    if auth_method == "2" {
        let password = prompt::read_line(input, "Enter admin password: ")?;
        args.push("--admin-password".to_string());
        args.push(password);
    } else {
        args.push("--generate-ssh-keys".to_string());
    }

    println!();
    if !prompt::confirm(input, "Assign public IP? (y/N): ")? {
        args.push("--public-ip-address".to_string());
        args.push(String::new());
    }

    println!();
    style::line(Level::Warn, "Creating VM... (this may take a few minutes)");
    style::line(Level::Info, &format!("[INFO] VM: {vm_name} | Size: {vm_size} | Image: {image} | Location: {location}"));
    println!();

    api.create_vm(&args)?;

    println!();
    style::line(Level::Success, "✓ VM created successfully!");
    println!();
    style::line(Level::Detail, "VM Details:");
    api.show_vm_details(&vm_name, &rg_name)?;
    Ok(())
}

/// `nimbus vm delete [NAME]` - delete plus optional associated-resource
/// sweep.
pub fn delete<R: BufRead>(input: &mut R, api: &dyn VmApi, name: Option<String>) -> OpsResult<()> {
    let Some(vm) = pick_vm(input, api, name, "delete", None)? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("VM found in resource group: {}", vm.resource_group));
    println!();
    if !prompt::confirm(input, &format!("Are you sure you want to delete VM '{}'? (y/N): ", vm.name))? {
        return Err(OpsError::ConfirmationDeclined);
    }

    println!();
    style::line(Level::Warn, "Deleting VM and associated resources...");
    api.delete_vm(&vm.name, &vm.resource_group)?;
    style::line(Level::Success, "✓ VM deleted successfully");

    if !prompt::confirm(input, "Delete associated NICs and disks? (y/n): ")? {
        return Ok(());
    }

    style::line(Level::Warn, "Cleaning up all associated resources...");
    println!();
    for (kind, label) in ASSOCIATED_KINDS {
        style::line(Level::Info, &format!("[INFO] Deleting {label}..."));
        let names = match api.list_associated(kind, &vm.resource_group, &vm.name) {
            Ok(names) => names,
            Err(e) => {
                style::line(Level::Error, &format!("    ✗ Failed to list {label}: {e}"));
                continue;
            }
        };
        for resource in names {
            style::line(Level::Warn, &format!("  Deleting {kind}: {resource}"));
            match api.delete_associated(kind, &vm.resource_group, &resource) {
                Ok(()) => style::line(Level::Success, &format!("    ✓ Deleted: {resource}")),
                Err(e) => style::line(Level::Error, &format!("    ✗ Failed to delete {resource}: {e}")),
            }
        }
    }

    println!();
    style::line(Level::Success, "✓ All resources cleanup completed");
    Ok(())
}

/// `nimbus vm start [NAME]` - only stopped/deallocated VMs are offered.
pub fn start<R: BufRead>(input: &mut R, api: &dyn VmApi, name: Option<String>) -> OpsResult<()> {
    let Some(vm) = pick_vm(input, api, name, "start", Some(&["stopped", "deallocated"]))? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("Starting VM: {}", vm.name));
    api.start_vm(&vm.name, &vm.resource_group)?;
    style::line(Level::Success, "✓ VM started successfully");
    Ok(())
}

/// `nimbus vm stop [NAME]` - deallocates; only running VMs are offered.
pub fn stop<R: BufRead>(input: &mut R, api: &dyn VmApi, name: Option<String>) -> OpsResult<()> {
    let Some(vm) = pick_vm(input, api, name, "stop", Some(&["running"]))? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("Stopping and deallocating VM: {}", vm.name));
    api.deallocate_vm(&vm.name, &vm.resource_group)?;
    style::line(Level::Success, "✓ VM stopped and deallocated successfully");
    Ok(())
}

/// Resolve a VM from an explicit name or an interactive pick, optionally
/// filtered to VMs whose power state contains one of `state_needles`.
fn pick_vm<R: BufRead>(
    input: &mut R,
    api: &dyn VmApi,
    supplied: Option<String>,
    purpose: &str,
    state_needles: Option<&[&str]>,
) -> OpsResult<Option<VmInfo>> {
    if let Some(name) = supplied {
        return match api.find_vm(&name)? {
            Some(vm) => Ok(Some(vm)),
            None => Err(OpsError::NotFound { kind: "vm", id: name }),
        };
    }

    let vms = api.list_vms()?;
    let mut filtered = Vec::new();
    for vm in vms {
        let power = api.power_state(&vm.name, &vm.resource_group)?;
        let keep = match state_needles {
            Some(needles) => {
                let lower = power.to_ascii_lowercase();
                needles.iter().any(|n| lower.contains(n))
            }
            None => true,
        };
        if keep {
            filtered.push((vm, power));
        }
    }

    let candidates: Vec<_> = filtered
        .iter()
        .map(|(vm, power)| ResourceDescriptor {
            id: vm.name.clone(),
            name: format!("{} - {}", vm.resource_group, vm.location),
            state: power.clone(),
        })
        .collect();

    match prompt::select(input, &candidates, purpose)? {
        Selection::Id(name) => {
            // A typed literal VM name still needs its resource group.
            match filtered.into_iter().map(|(vm, _)| vm).find(|vm| vm.name == name) {
                Some(vm) => Ok(Some(vm)),
                None => match api.find_vm(&name)? {
                    Some(vm) => Ok(Some(vm)),
                    None => Err(OpsError::NotFound { kind: "vm", id: name }),
                },
            }
        }
        Selection::Cancelled => Ok(None),
    }
}

fn resolve_group_answer(answer: &str, groups: &[(String, String)]) -> String {
    if answer.is_empty() {
        return "rg-forensics".to_string();
    }
    if answer.chars().all(|c| c.is_ascii_digit()) && !groups.is_empty() {
        if let Ok(index) = answer.parse::<usize>() {
            if (1..=groups.len()).contains(&index) {
                return groups[index - 1].0.clone();
            }
        }
        style::line(Level::Warn, "Invalid resource group number. Using default: rg-forensics");
        return "rg-forensics".to_string();
    }
    answer.to_string()
}

fn menu_pick<R: BufRead>(
    input: &mut R,
    header: &str,
    options: &[(&str, &str)],
    question: &str,
) -> OpsResult<String> {
    println!();
    style::line(Level::Detail, header);
    for (i, (value, description)) in options.iter().enumerate() {
        println!("  {}. {:<18} - {description}", i + 1, value);
    }
    println!();
    let answer = prompt::read_line_or(input, question, "1")?;
    let index = answer.parse::<usize>().unwrap_or(1);
    let picked = options.get(index.saturating_sub(1)).unwrap_or(&options[0]);
    Ok(picked.0.to_string())
}

//! Azure Storage Account commands.

use std::io::BufRead;

use crate::error::{OpsError, OpsResult};
use crate::prompt::{self, Selection};
use crate::providers::{ResourceDescriptor, StorageApi};
use crate::style::{self, Level};

const LOCATIONS: [&str; 5] = ["eastus", "centralus", "westus", "eastus2", "southcentralus"];
const SKUS: [&str; 5] =
    ["Standard_LRS", "Standard_GRS", "Standard_RAGRS", "Standard_ZRS", "Premium_LRS"];
const KINDS: [&str; 5] = ["StorageV2", "Storage", "BlobStorage", "FileStorage", "BlockBlobStorage"];

/// `nimbus storage list`.
pub fn list(api: &dyn StorageApi) -> OpsResult<()> {
    style::line(Level::Warn, "Fetching Storage Accounts from all Resource Groups...");
    let accounts = api.list_accounts()?;
    if accounts.is_empty() {
        style::line(Level::Warn, "No Storage Accounts found");
        return Ok(());
    }

    style::line(Level::Success, "Storage Accounts found:");
    println!("{:<5} {:<40} {}", "ID", "Storage Account", "Resource Group");
    style::separator(63);
    for (i, account) in accounts.iter().enumerate() {
        println!("{:<5} {:<40} {}", i + 1, account.name, account.resource_group);
    }
    println!();
    Ok(())
}

/// `nimbus storage create` - guided create with role assignment for the
/// signed-in user.
pub fn create<R: BufRead>(input: &mut R, api: &dyn StorageApi) -> OpsResult<()> {
    style::line(Level::Success, "Create new Storage Account");

    // Resource group pick, with "0" creating a new one.
    style::line(Level::Warn, "Fetching Resource Groups...");
    let groups = api.list_group_names()?;
    for (i, group) in groups.iter().enumerate() {
        println!("  {}. {group}", i + 1);
    }
    println!("  0. Create NEW Resource Group");

    let rg_answer = prompt::read_line(input, "Choose a Resource Group option: ")?;
    let resource_group = if rg_answer.trim() == "0" {
        let name = prompt::read_line(input, "Enter new Resource Group name: ")?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(OpsError::Provider { detail: "resource group name is required".to_string() });
        }
        let location =
            prompt::read_line_or(input, "Location for new Resource Group (ENTER for eastus): ", "eastus")?;
        style::line(Level::Warn, "Creating Resource Group...");
        api.create_group(&name, &location)?;
        name
    } else {
        let index: usize = rg_answer
            .trim()
            .parse()
            .map_err(|_| OpsError::InvalidSelection { input: rg_answer.clone(), max: groups.len() })?;
        groups
            .get(index.saturating_sub(1))
            .cloned()
            .ok_or(OpsError::InvalidSelection { input: rg_answer.clone(), max: groups.len() })?
    };

    let name = prompt::read_line(input, "Storage Account name (lowercase, 3-24 chars): ")?;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(OpsError::Provider { detail: "storage account name is required".to_string() });
    }

    let location = pick_option(input, &LOCATIONS, "eastus")?;
    let sku = pick_option(input, &SKUS, "Standard_LRS")?;
    let kind = pick_option(input, &KINDS, "StorageV2")?;

    style::line(Level::Warn, "Creating Storage Account with Azure AD authentication enabled...");
    api.create_account(&name, &resource_group, &location, &sku, &kind)?;
    style::line(Level::Success, "Storage Account created successfully!");

    style::line(Level::Warn, "Assigning 'Storage Blob Data Owner' role to the signed-in user...");
    let user_id = api.signed_in_user_id()?;
    let subscription = api.subscription_id()?;
    let scope = format!(
        "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{name}"
    );
    api.assign_blob_owner_role(&user_id, &scope)?;
    style::line(
        Level::Success,
        "Role assignment completed! You now have permission to upload using --auth-mode login.",
    );
    Ok(())
}

/// `nimbus storage delete [NAME]`.
pub fn delete<R: BufRead>(input: &mut R, api: &dyn StorageApi, name: Option<String>) -> OpsResult<()> {
    let (account_name, resource_group) = match name {
        Some(name) => {
            let group = api.account_resource_group(&name)?;
            (name, group)
        }
        None => {
            let accounts = api.list_accounts()?;
            let candidates: Vec<_> = accounts
                .iter()
                .map(|a| ResourceDescriptor {
                    id: a.name.clone(),
                    name: a.resource_group.clone(),
                    state: String::new(),
                })
                .collect();
            match prompt::select(input, &candidates, "delete")? {
                Selection::Id(name) => match accounts.into_iter().find(|a| a.name == name) {
                    Some(account) => (account.name, account.resource_group),
                    None => {
                        let group = api.account_resource_group(&name)?;
                        (name, group)
                    }
                },
                Selection::Cancelled => return Ok(()),
            }
        }
    };

    style::line(Level::Error, "Are you sure you want to delete:");
    println!("  Storage Account: {}", style::paint(Level::Warn, &account_name));
    println!("  Resource Group:  {}", style::paint(Level::Warn, &resource_group));
    if !prompt::confirm(input, "Confirm deletion? (y/N): ")? {
        return Err(OpsError::ConfirmationDeclined);
    }

    style::line(Level::Warn, "Deleting Storage Account...");
    api.delete_account(&account_name, &resource_group)?;
    style::line(Level::Success, "Storage Account deleted successfully!");
    Ok(())
}

/// Numbered pick over a fixed option list, defaulting on Enter; a typed
/// value matching an option is accepted directly.
fn pick_option<R: BufRead>(input: &mut R, options: &[&str], default: &str) -> OpsResult<String> {
    for (i, option) in options.iter().enumerate() {
        if *option == default {
            println!("  {}", style::paint(Level::Info, &format!("{}) {option} (default)", i + 1)));
        } else {
            println!("  {}", style::paint(Level::Info, &format!("{}) {option}", i + 1)));
        }
    }
    let answer = prompt::read_line(input, &format!("Choose an option (ENTER for default: {default}): "))?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(default.to_string());
    }
    if let Ok(index) = answer.parse::<usize>() {
        if (1..=options.len()).contains(&index) {
            return Ok(options[index - 1].to_string());
        }
    }
    if let Some(option) = options.iter().find(|o| **o == answer) {
        return Ok((*option).to_string());
    }
    Ok(default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StorageAccountInfo;
    use std::cell::RefCell;
    use std::io::Cursor;

    #[derive(Default)]
    struct FakeStorage {
        accounts: Vec<StorageAccountInfo>,
        deleted: RefCell<Vec<(String, String)>>,
        created: RefCell<Vec<String>>,
        roles: RefCell<Vec<String>>,
    }

    impl StorageApi for FakeStorage {
        fn list_accounts(&self) -> OpsResult<Vec<StorageAccountInfo>> {
            Ok(self.accounts.clone())
        }
        fn list_group_names(&self) -> OpsResult<Vec<String>> {
            let mut groups: Vec<String> =
                self.accounts.iter().map(|a| a.resource_group.clone()).collect();
            groups.sort();
            groups.dedup();
            Ok(groups)
        }
        fn create_group(&self, _: &str, _: &str) -> OpsResult<()> {
            Ok(())
        }
        fn account_resource_group(&self, name: &str) -> OpsResult<String> {
            self.accounts
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.resource_group.clone())
                .ok_or_else(|| OpsError::NotFound { kind: "storage account", id: name.to_string() })
        }
        fn create_account(&self, name: &str, _: &str, _: &str, _: &str, _: &str) -> OpsResult<()> {
            self.created.borrow_mut().push(name.to_string());
            Ok(())
        }
        fn delete_account(&self, name: &str, group: &str) -> OpsResult<()> {
            self.deleted.borrow_mut().push((name.to_string(), group.to_string()));
            Ok(())
        }
        fn signed_in_user_id(&self) -> OpsResult<String> {
            Ok("user-guid".to_string())
        }
        fn subscription_id(&self) -> OpsResult<String> {
            Ok("sub-guid".to_string())
        }
        fn assign_blob_owner_role(&self, _: &str, scope: &str) -> OpsResult<()> {
            self.roles.borrow_mut().push(scope.to_string());
            Ok(())
        }
    }

    fn account(name: &str, group: &str) -> StorageAccountInfo {
        StorageAccountInfo { name: name.to_string(), resource_group: group.to_string() }
    }

    #[test]
    fn delete_resolves_group_from_selection() {
        let api =
            FakeStorage { accounts: vec![account("evidencestore", "rg-dfir")], ..Default::default() };
        let mut input = Cursor::new("1\ny\n");
        delete(&mut input, &api, None).unwrap();
        assert_eq!(*api.deleted.borrow(), vec![("evidencestore".to_string(), "rg-dfir".to_string())]);
    }

    #[test]
    fn delete_named_account_looks_up_group() {
        let api =
            FakeStorage { accounts: vec![account("evidencestore", "rg-dfir")], ..Default::default() };
        let mut input = Cursor::new("y\n");
        delete(&mut input, &api, Some("evidencestore".to_string())).unwrap();
        assert_eq!(api.deleted.borrow()[0].1, "rg-dfir");
    }

    #[test]
    fn create_assigns_role_with_full_scope() {
        let api = FakeStorage { accounts: vec![account("old", "rg-dfir")], ..Default::default() };
        // group 1, name, location default, sku default, kind default
        let mut input = Cursor::new("1\nnewstore\n\n\n\n");
        create(&mut input, &api).unwrap();
        assert_eq!(*api.created.borrow(), vec!["newstore".to_string()]);
        let scope = &api.roles.borrow()[0];
        assert!(scope.contains("/subscriptions/sub-guid/"));
        assert!(scope.ends_with("storageAccounts/newstore"));
    }

    #[test]
    fn pick_option_accepts_number_name_or_default() {
        let mut input = Cursor::new("2\n");
        assert_eq!(pick_option(&mut input, &LOCATIONS, "eastus").unwrap(), "centralus");
        let mut input = Cursor::new("westus\n");
        assert_eq!(pick_option(&mut input, &LOCATIONS, "eastus").unwrap(), "westus");
        let mut input = Cursor::new("\n");
        assert_eq!(pick_option(&mut input, &LOCATIONS, "eastus").unwrap(), "eastus");
        let mut input = Cursor::new("bogus\n");
        assert_eq!(pick_option(&mut input, &LOCATIONS, "eastus").unwrap(), "eastus");
    }
}

//! Azure Blob container commands.
//!
//! Containers are addressed by bare name; every operation first resolves the
//! owning storage account by enumerating the accounts the caller can read.

use std::io::BufRead;
use std::path::PathBuf;

use chrono::Local;

use crate::archive;
use crate::config::{expand_home, Config};
use crate::error::{OpsError, OpsResult};
use crate::prompt;
use crate::providers::BlobApi;
use crate::style::{self, Level};

/// `nimbus blob list` - all containers across all storage accounts.
pub fn list(api: &dyn BlobApi) -> OpsResult<()> {
    let containers = all_containers(api)?;
    if containers.is_empty() {
        style::line(Level::Warn, "No Blob Containers found in any Storage Account");
        return Ok(());
    }

    println!("{:<3} {:<30} {:<30}", "#", "Container", "Account");
    for (i, (container, account)) in containers.iter().enumerate() {
        println!("{:<3} {:<30} {:<30}", i + 1, container, account);
    }
    Ok(())
}

/// `nimbus blob upload <FILES..> <CONTAINER>` - continues on per-file
/// failure.
pub fn upload(api: &dyn BlobApi, files: &[String], container: &str) -> OpsResult<()> {
    let account = resolve_account(api, container)?;

    let mut success_count = 0usize;
    let mut fail_count = 0usize;

    for file in files {
        let path = expand_home(file);
        if !path.is_file() {
            style::line(Level::Error, &format!("File not found: {file}"));
            fail_count += 1;
            continue;
        }
        let blob_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.clone());

        println!("Uploading {file} as blob '{blob_name}' to container '{container}' in account '{account}'...");
        match api.upload_blob(&account, container, &path, &blob_name) {
            Ok(()) => {
                style::line(Level::Success, &format!("Upload complete: {blob_name}"));
                success_count += 1;
            }
            Err(e) => {
                style::line(Level::Error, &format!("Upload failed for {file}: {e}"));
                fail_count += 1;
            }
        }
    }

    println!();
    style::line(Level::Success, &format!("Successfully uploaded: {success_count}"));
    if fail_count > 0 {
        style::line(Level::Error, &format!("Failed: {fail_count}"));
    }
    Ok(())
}

/// `nimbus blob download <CONTAINER> [BLOB]` - Enter at the blob prompt
/// downloads everything.
pub fn download<R: BufRead>(
    input: &mut R,
    api: &dyn BlobApi,
    container: &str,
    blob: Option<String>,
    config: &Config,
) -> OpsResult<()> {
    let account = resolve_account(api, container)?;
    let blobs = api.list_blobs(&account, container)?;
    if blobs.is_empty() {
        style::line(Level::Warn, "No blobs found");
        return Ok(());
    }

    let selected = match blob {
        Some(blob) => vec![blob],
        None => {
            println!("Available blobs:");
            for (i, name) in blobs.iter().enumerate() {
                println!("  {}. {name}", i + 1);
            }
            let answer = prompt::read_line(input, "Choose blob (ENTER = all): ")?;
            let answer = answer.trim();
            if answer.is_empty() {
                blobs.clone()
            } else if let Ok(index) = answer.parse::<usize>() {
                match blobs.get(index.saturating_sub(1)) {
                    Some(name) if index >= 1 => vec![name.clone()],
                    _ => {
                        return Err(OpsError::InvalidSelection {
                            input: answer.to_string(),
                            max: blobs.len(),
                        })
                    }
                }
            } else {
                vec![answer.to_string()]
            }
        }
    };

    for name in selected {
        let default_path = config.output_dir().join(&name);
        let answer = prompt::read_line(
            input,
            &format!("Download '{name}' to {}? (ENTER to confirm, or type path): ", default_path.display()),
        )?;
        let dest: PathBuf =
            if answer.trim().is_empty() { default_path } else { expand_home(answer.trim()) };

        match api.download_blob(&account, container, &name, &dest) {
            Ok(()) => style::line(Level::Success, &format!("Download complete: {}", dest.display())),
            Err(e) => style::line(Level::Error, &format!("Download failed for {name}: {e}")),
        }
    }
    Ok(())
}

/// `nimbus blob dump <CONTAINER>` - batch-download and zip.
pub fn dump<R: BufRead>(
    input: &mut R,
    api: &dyn BlobApi,
    container: &str,
    config: &Config,
) -> OpsResult<()> {
    let account = resolve_account(api, container)?;

    let staging = tempfile::tempdir().map_err(|source| OpsError::LocalIo {
        context: "failed to create staging directory".to_string(),
        source,
    })?;

    println!("Downloading all blobs from '{container}'...");
    api.download_batch(&account, container, staging.path())?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let zip_name = format!("{container}_{stamp}.zip");
    let default_zip = config.output_dir().join(&zip_name);
    let answer = prompt::read_line(
        input,
        &format!("Save zip to {}? (ENTER to confirm, or type path): ", default_zip.display()),
    )?;
    let zip_path: PathBuf =
        if answer.trim().is_empty() { default_zip } else { expand_home(answer.trim()) };

    println!("Zipping files to {}...", zip_path.display());
    archive::zip_directory(staging.path(), &zip_path)?;
    style::line(Level::Success, &format!("Dump complete: {}", zip_path.display()));
    Ok(())
}

/// `nimbus blob info <CONTAINER>`.
pub fn info(api: &dyn BlobApi, container: &str) -> OpsResult<()> {
    let account = resolve_account(api, container)?;
    let value = api.show_container(&account, container)?;
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    Ok(())
}

/// (container, account) pairs across every readable storage account.
fn all_containers(api: &dyn BlobApi) -> OpsResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for account in api.list_account_names()? {
        for container in api.list_containers(&account)? {
            out.push((container, account.clone()));
        }
    }
    Ok(out)
}

/// Find the storage account owning `container`.
fn resolve_account(api: &dyn BlobApi, container: &str) -> OpsResult<String> {
    all_containers(api)?
        .into_iter()
        .find(|(c, _)| c == container)
        .map(|(_, account)| account)
        .ok_or_else(|| OpsError::NotFound { kind: "blob container", id: container.to_string() })
}

//! S3 bucket and object commands.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;

use crate::archive;
use crate::config::{expand_home, Config};
use crate::error::{OpsError, OpsResult};
use crate::prompt::{self, Selection};
use crate::providers::{ResourceDescriptor, S3Api};
use crate::style::{self, Level};

/// Bucket naming rule: 3-63 chars, lowercase letters/digits/hyphens/periods,
/// alphanumeric at both ends.
static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid regex"));

/// `nimbus s3 list`.
pub fn list(api: &dyn S3Api) -> OpsResult<()> {
    style::line(Level::Info, "Listing S3 Buckets...");
    println!();

    let buckets = api.list_buckets()?;
    if buckets.is_empty() {
        style::line(Level::Warn, "No S3 buckets found");
        return Ok(());
    }

    style::line(Level::Success, &format!("{:<40} {}", "Bucket Name", "Creation Date"));
    style::separator(80);
    for bucket in &buckets {
        style::line(Level::Success, &format!("{:<40} {}", bucket.name, bucket.created));
    }
    println!();
    style::line(Level::Success, &format!("Total buckets: {}", buckets.len()));
    Ok(())
}

/// `nimbus s3 create` - interactive, with versioning and public-access
/// block offers.
pub fn create<R: BufRead>(input: &mut R, api: &dyn S3Api, config: &Config) -> OpsResult<()> {
    style::line(Level::Info, "Create New S3 Bucket");
    println!();

    let name =
        prompt::read_line(input, "Enter bucket name (must be globally unique, lowercase, no spaces): ")?;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(OpsError::Provider { detail: "bucket name is required".to_string() });
    }
    if !BUCKET_NAME.is_match(&name) {
        style::line(Level::Error, "Error: Invalid bucket name");
        println!("Bucket names must:");
        println!("  - Be 3-63 characters long");
        println!("  - Start and end with lowercase letter or number");
        println!("  - Contain only lowercase letters, numbers, hyphens, and periods");
        return Err(OpsError::Provider { detail: format!("invalid bucket name '{name}'") });
    }

    let region = prompt::read_line_or(
        input,
        &format!("Enter region (default: {}): ", config.aws.region),
        &config.aws.region,
    )?;

    println!();
    style::line(Level::Warn, &format!("Creating bucket '{name}' in region '{region}'..."));
    api.create_bucket(&name, &region)?;
    style::line(Level::Success, &format!("✓ Bucket '{name}' created successfully!"));

    if prompt::confirm(input, "Enable versioning? (y/N): ")? {
        api.enable_versioning(&name)?;
        style::line(Level::Success, "✓ Versioning enabled");
    }

    // Default-affirmative: anything but an explicit "n" blocks public access.
    let answer = prompt::read_line(input, "Block all public access? (recommended) (Y/n): ")?;
    if !answer.trim().eq_ignore_ascii_case("n") {
        api.block_public_access(&name)?;
        style::line(Level::Success, "✓ Public access blocked");
    }

    Ok(())
}

/// `nimbus s3 delete [NAME]` - empties the bucket, then deletes it.
pub fn delete<R: BufRead>(input: &mut R, api: &dyn S3Api, name: Option<String>) -> OpsResult<()> {
    let Some(bucket) = pick_bucket(input, api, name, "delete")? else {
        return Ok(());
    };

    style::line(Level::Warn, &format!("WARNING: This will permanently delete bucket '{bucket}'"));
    if !prompt::confirm(input, "Are you sure? (yes/no): ")? {
        return Err(OpsError::ConfirmationDeclined);
    }

    println!("Emptying bucket...");
    api.empty_bucket(&bucket)?;
    println!("Deleting bucket...");
    api.delete_bucket(&bucket)?;
    style::line(Level::Success, &format!("✓ Bucket '{bucket}' deleted successfully"));
    Ok(())
}

/// `nimbus s3 upload <FILES..> [BUCKET]` - continues on per-file failure
/// and reports a tally.
pub fn upload<R: BufRead>(
    input: &mut R,
    api: &dyn S3Api,
    files: &[String],
    bucket: Option<String>,
) -> OpsResult<()> {
    if files.is_empty() {
        return Err(OpsError::Provider { detail: "no files specified".to_string() });
    }

    let Some(bucket) = pick_bucket(input, api, bucket, "upload to")? else {
        return Ok(());
    };

    style::line(Level::Info, &format!("Uploading files to bucket: {bucket}"));
    println!();

    let mut success_count = 0usize;
    let mut fail_count = 0usize;

    for file in files {
        let path = expand_home(file);
        let Some(key) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            fail_count += 1;
            continue;
        };
        if !path.is_file() {
            style::line(Level::Error, &format!("File not found: {file}"));
            fail_count += 1;
            continue;
        }

        print!("Uploading {key}... ");
        match api.upload_object(&bucket, &path, &key) {
            Ok(()) => {
                style::line(Level::Success, "✓");
                success_count += 1;
            }
            Err(e) => {
                style::line(Level::Error, &format!("✗ ({e})"));
                fail_count += 1;
            }
        }
    }

    println!();
    style::separator(40);
    style::line(Level::Success, &format!("Successfully uploaded: {success_count}"));
    if fail_count > 0 {
        style::line(Level::Error, &format!("Failed: {fail_count}"));
    }
    Ok(())
}

/// `nimbus s3 download [BUCKET] [KEY] [DEST]`.
pub fn download<R: BufRead>(
    input: &mut R,
    api: &dyn S3Api,
    bucket: Option<String>,
    key: Option<String>,
    dest: Option<String>,
    config: &Config,
) -> OpsResult<()> {
    let Some(bucket) = pick_bucket(input, api, bucket, "download from")? else {
        return Ok(());
    };

    let key = match key {
        Some(key) => key,
        None => {
            let objects = api.list_objects(&bucket)?;
            if objects.is_empty() {
                style::line(Level::Warn, "No files found in bucket");
                return Ok(());
            }
            let candidates: Vec<_> = objects
                .iter()
                .map(|o| ResourceDescriptor {
                    id: o.key.clone(),
                    name: format!("{} bytes", o.size_bytes),
                    state: String::new(),
                })
                .collect();
            match prompt::select(input, &candidates, "download")? {
                Selection::Id(key) => key,
                Selection::Cancelled => return Ok(()),
            }
        }
    };

    let dest = match dest {
        Some(dest) => expand_home(&dest),
        None => {
            let default = config.output_dir().join(&key);
            let answer =
                prompt::read_line(input, &format!("Download to {}? (Y/n): ", default.display()))?;
            if answer.trim().eq_ignore_ascii_case("n") {
                expand_home(prompt::read_line(input, "Enter download path: ")?.trim())
            } else {
                default
            }
        }
    };

    println!();
    style::line(Level::Warn, &format!("Downloading '{key}' from bucket '{bucket}'..."));

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| OpsError::LocalIo {
                context: format!("failed to create {}", parent.display()),
                source,
            })?;
        }
    }
    api.download_object(&bucket, &key, &dest)?;

    println!();
    style::line(Level::Success, "✓ File downloaded successfully!");
    println!("Saved to: {}", dest.display());
    println!("File size: {:.2} MB", archive::size_mb(&dest));
    Ok(())
}

/// `nimbus s3 dump [BUCKET]` - stage every object, pack a zip.
pub fn dump<R: BufRead>(
    input: &mut R,
    api: &dyn S3Api,
    bucket: Option<String>,
    config: &Config,
) -> OpsResult<()> {
    let Some(bucket) = pick_bucket(input, api, bucket, "dump")? else {
        return Ok(());
    };

    let objects = api.list_objects(&bucket)?;
    if objects.is_empty() {
        style::line(Level::Warn, &format!("Bucket '{bucket}' is empty"));
        return Ok(());
    }
    style::line(Level::Info, &format!("Bucket '{bucket}' contains {} files", objects.len()));

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let zip_name = format!("{bucket}_{stamp}.zip");
    let default_zip = config.output_dir().join(&zip_name);

    println!();
    let answer = prompt::read_line(input, &format!("Save zip to {}? (Y/n): ", default_zip.display()))?;
    let zip_path: PathBuf = if answer.trim().eq_ignore_ascii_case("n") {
        expand_home(prompt::read_line(input, "Enter zip file path: ")?.trim())
    } else {
        default_zip
    };

    let staging = tempfile::tempdir().map_err(|source| OpsError::LocalIo {
        context: "failed to create staging directory".to_string(),
        source,
    })?;

    println!();
    style::line(Level::Warn, "Downloading files from bucket...");
    let mut downloaded = 0usize;
    for object in &objects {
        let local = staging.path().join(&object.key);
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OpsError::LocalIo {
                context: format!("failed to create {}", parent.display()),
                source,
            })?;
        }
        api.download_object(&bucket, &object.key, &local)?;
        downloaded += 1;
    }
    style::line(Level::Success, "✓ Files downloaded");
    println!("Downloaded {downloaded} files");

    println!();
    style::line(Level::Warn, "Creating zip archive...");
    let archived = archive::zip_directory(staging.path(), &zip_path)?;
    style::line(Level::Success, "✓ Zip archive created");

    println!();
    style::separator(40);
    style::line(Level::Success, &format!("Zip file: {}", zip_path.display()));
    style::line(Level::Success, &format!("Size: {:.2} MB", archive::size_mb(&zip_path)));
    style::line(Level::Success, &format!("Files: {archived}"));
    style::separator(40);
    println!();
    style::line(Level::Success, "Dump complete!");
    Ok(())
}

/// `nimbus s3 info [NAME]`.
pub fn info<R: BufRead>(input: &mut R, api: &dyn S3Api, name: Option<String>) -> OpsResult<()> {
    let bucket = match name {
        Some(name) => name,
        None => {
            let typed = prompt::read_line(input, "Enter bucket name: ")?;
            let typed = typed.trim().to_string();
            if typed.is_empty() {
                return Err(OpsError::Provider { detail: "bucket name is required".to_string() });
            }
            typed
        }
    };

    if !api.bucket_exists(&bucket)? {
        return Err(OpsError::NotFound { kind: "bucket", id: bucket });
    }

    style::line(Level::Info, &format!("Bucket Information: {bucket}"));
    style::separator(40);
    println!("Region: {}", api.bucket_location(&bucket)?);
    println!("Versioning: {}", api.bucket_versioning(&bucket)?);

    let objects = api.list_objects(&bucket)?;
    if objects.is_empty() {
        println!("Objects: 0");
    } else {
        let total: u64 = objects.iter().map(|o| o.size_bytes).sum();
        println!("Objects: {}", objects.len());
        println!("Total Size: {:.2} MB", total as f64 / (1024.0 * 1024.0));
    }
    Ok(())
}

/// Split `nimbus s3 upload` arguments: when the trailing argument names an
/// existing bucket, it is the destination and the rest are files; otherwise
/// everything is a file and the bucket is picked interactively.
pub fn split_upload_args(
    api: &dyn S3Api,
    mut args: Vec<String>,
) -> OpsResult<(Vec<String>, Option<String>)> {
    if args.len() < 2 {
        return Ok((args, None));
    }
    let last = args.last().cloned().unwrap_or_default();
    match api.bucket_exists(&last) {
        Ok(true) => {
            args.pop();
            Ok((args, Some(last)))
        }
        // Not a bucket (or unknowable): treat it as a file.
        Ok(false) | Err(_) => Ok((args, None)),
    }
}

/// Resolve a bucket name from an argument or an interactive pick.
fn pick_bucket<R: BufRead>(
    input: &mut R,
    api: &dyn S3Api,
    supplied: Option<String>,
    purpose: &str,
) -> OpsResult<Option<String>> {
    if let Some(name) = supplied {
        return Ok(Some(name));
    }

    let buckets = api.list_buckets()?;
    let candidates: Vec<_> = buckets
        .iter()
        .map(|b| ResourceDescriptor {
            id: b.name.clone(),
            name: b.created.clone(),
            state: String::new(),
        })
        .collect();

    match prompt::select(input, &candidates, purpose)? {
        Selection::Id(name) => Ok(Some(name)),
        Selection::Cancelled => Ok(None),
    }
}

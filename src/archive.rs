//! Zip archiving for bucket and container dumps.
//!
//! `dump` stages every object into a temp directory, then packs the tree
//! into a single deflate-compressed archive at a path the operator confirmed.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{OpsError, OpsResult};

/// Pack `source_dir` recursively into a zip archive at `dest`. Entry names
/// are relative to `source_dir`. Returns the number of files archived.
pub fn zip_directory(source_dir: &Path, dest: &Path) -> OpsResult<usize> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| OpsError::LocalIo {
                context: format!("failed to create {}", parent.display()),
                source,
            })?;
        }
    }

    let file = File::create(dest).map_err(|source| OpsError::LocalIo {
        context: format!("failed to create {}", dest.display()),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(source_dir, &mut files).map_err(|source| OpsError::LocalIo {
        context: format!("failed to walk {}", source_dir.display()),
        source,
    })?;
    files.sort();

    for path in &files {
        let name = path
            .strip_prefix(source_dir)
            .map_err(|_| OpsError::Provider { detail: "archive entry escaped staging dir".to_string() })?
            .to_string_lossy()
            .replace('\\', "/");

        writer.start_file(name, options).map_err(|e| OpsError::Provider {
            detail: format!("zip write failed: {e}"),
        })?;
        let mut entry = File::open(path).map_err(|source| OpsError::LocalIo {
            context: format!("failed to read {}", path.display()),
            source,
        })?;
        io::copy(&mut entry, &mut writer).map_err(|source| OpsError::LocalIo {
            context: format!("failed to archive {}", path.display()),
            source,
        })?;
    }

    writer
        .finish()
        .map_err(|e| OpsError::Provider { detail: format!("zip finalize failed: {e}") })?
        .flush()
        .map_err(|source| OpsError::LocalIo { context: "failed to flush archive".to_string(), source })?;

    Ok(files.len())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Size of a file in megabytes, for the post-dump summary.
#[must_use]
pub fn size_mb(path: &Path) -> f64 {
    fs::metadata(path).map(|m| m.len() as f64 / (1024.0 * 1024.0)).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archives_nested_tree() {
        let staging = tempfile::tempdir().unwrap();
        fs::create_dir_all(staging.path().join("logs")).unwrap();
        fs::write(staging.path().join("root.txt"), b"root").unwrap();
        fs::write(staging.path().join("logs/app.log"), b"log line").unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("bucket_20260101_000000.zip");
        let count = zip_directory(staging.path(), &dest).unwrap();
        assert_eq!(count, 2);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["logs/app.log", "root.txt"]);

        let mut content = String::new();
        archive.by_name("logs/app.log").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "log line");
    }

    #[test]
    fn empty_tree_archives_zero_files() {
        let staging = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("empty.zip");
        assert_eq!(zip_directory(staging.path(), &dest).unwrap(), 0);
        assert!(dest.exists());
    }
}

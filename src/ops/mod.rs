//! Command handlers, one module per resource family.
//!
//! Every handler walks the same workflow: enumerate → select (when the id
//! was not on the command line) → confirm (when destructive) → execute →
//! report. Handlers receive their provider capability as a trait object and
//! operator input as a `BufRead`, so tests drive them end-to-end with fakes
//! and cursors.

pub mod blob;
pub mod db;
pub mod ec2;
pub mod forensics;
pub mod rds;
pub mod s3;
pub mod storage;
pub mod vm;

use std::io::BufRead;

use crate::error::OpsResult;
use crate::prompt::{self, Selection};
use crate::providers::ResourceDescriptor;

/// Resolve a resource id: taken from the command line when present,
/// otherwise selected interactively from a freshly enumerated candidate
/// list. The listing call only happens when a prompt is actually needed.
/// `None` means the operator cancelled and the handler should return
/// without side effects.
pub fn resolve_id<R: BufRead>(
    input: &mut R,
    supplied: Option<String>,
    candidates: impl FnOnce() -> OpsResult<Vec<ResourceDescriptor>>,
    purpose: &str,
) -> OpsResult<Option<String>> {
    if let Some(id) = supplied {
        return Ok(Some(id));
    }
    match prompt::select(input, &candidates()?, purpose)? {
        Selection::Id(id) => Ok(Some(id)),
        Selection::Cancelled => Ok(None),
    }
}

//! Interactive selection and confirmation.
//!
//! Nearly every command funnels through the same workflow: render a numbered
//! list of resources, let the operator pick one (or type an id directly),
//! then gate anything destructive behind a typed confirmation. The functions
//! here read from any `BufRead` so tests drive them with a `Cursor`.
//!
//! Selection contract:
//! - empty candidate list: report none found, return [`Selection::Cancelled`]
//!   without prompting
//! - empty input, `q`, or `0`: [`Selection::Cancelled`]
//! - digits within `1..=len`: the candidate at that 1-based index
//! - digits out of range: [`OpsError::InvalidSelection`], no re-prompt
//! - anything else: treated as a literal resource id, passed through
//!   unvalidated (the provider reports not-found later)
//!
//! Indices are rebuilt from a fresh listing on every invocation and never
//! persisted, so a stale number from a previous run can never resolve.

use std::io::{self, BufRead, Write};

use crate::error::{OpsError, OpsResult};
use crate::providers::ResourceDescriptor;
use crate::style::{self, Level};

/// Outcome of an interactive selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A resource id, either picked by number or typed verbatim.
    Id(String),
    /// The operator backed out; the caller returns without side effects.
    Cancelled,
}

/// Render a numbered candidate list and resolve one line of operator input.
///
/// `purpose` names the action ("isolate", "terminate") in the list header
/// and the prompt.
///
/// # Errors
///
/// Returns [`OpsError::InvalidSelection`] for an out-of-range number and
/// [`OpsError::LocalIo`] if stdin is closed mid-prompt.
pub fn select<R: BufRead>(
    input: &mut R,
    candidates: &[ResourceDescriptor],
    purpose: &str,
) -> OpsResult<Selection> {
    if candidates.is_empty() {
        style::line(Level::Warn, &format!("No resources available to {purpose}"));
        return Ok(Selection::Cancelled);
    }

    println!();
    style::line(Level::Detail, &format!("Available resources to {purpose}:"));
    style::separator(40);
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "{}. {} | {} | {}",
            i + 1,
            style::paint(Level::Detail, &candidate.id),
            candidate.name,
            style::state(&candidate.state),
        );
    }
    println!();

    let answer = read_line(
        input,
        &format!("Select resource to {purpose} (1-{}) or 'q' to quit: ", candidates.len()),
    )?;

    resolve(&answer, candidates)
}

/// Resolve a raw answer against the candidate list. Split out of [`select`]
/// so the contract is testable without terminal rendering.
pub fn resolve(answer: &str, candidates: &[ResourceDescriptor]) -> OpsResult<Selection> {
    let answer = answer.trim();

    if answer.is_empty() || answer.eq_ignore_ascii_case("q") || answer == "0" {
        style::line(Level::Warn, "Operation cancelled");
        return Ok(Selection::Cancelled);
    }

    if answer.chars().all(|c| c.is_ascii_digit()) {
        let index: usize = answer
            .parse()
            .map_err(|_| OpsError::InvalidSelection { input: answer.to_string(), max: candidates.len() })?;
        if (1..=candidates.len()).contains(&index) {
            let picked = &candidates[index - 1];
            style::line(
                Level::Detail,
                &format!("Selected: {} ({})", picked.id, picked.name),
            );
            return Ok(Selection::Id(picked.id.clone()));
        }
        return Err(OpsError::InvalidSelection { input: answer.to_string(), max: candidates.len() });
    }

    // Non-digit input is a literal id typed by the operator. The provider
    // discovers invalidity via its own not-found error.
    Ok(Selection::Id(answer.to_string()))
}

/// Single-strength confirmation: case-insensitive `y`/`yes` affirms,
/// anything else declines. Never performs the action itself.
pub fn confirm<R: BufRead>(input: &mut R, prompt: &str) -> OpsResult<bool> {
    let answer = read_line(input, prompt)?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Double-strength confirmation for irreversible operations.
///
/// Step one requires `literal` typed with exact case; any deviation aborts
/// before step two is shown. Step two is a case-insensitive `yes`.
pub fn confirm_double<R: BufRead>(input: &mut R, literal: &str) -> OpsResult<bool> {
    let first = read_line(input, &format!("Type '{literal}' to confirm: "))?;
    if first.trim() != literal {
        style::line(Level::Warn, "Operation cancelled - confirmation text did not match");
        return Ok(false);
    }

    let second = read_line(input, "Are you absolutely sure? This cannot be undone! (yes/no): ")?;
    if !second.trim().eq_ignore_ascii_case("yes") {
        style::line(Level::Warn, "Operation cancelled");
        return Ok(false);
    }

    Ok(true)
}

/// Prompt for one line of free text, returning the trimmed answer.
pub fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> OpsResult<String> {
    print!("{prompt}");
    io::stdout().flush().map_err(|source| OpsError::LocalIo {
        context: "failed to flush prompt".to_string(),
        source,
    })?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(|source| OpsError::LocalIo {
        context: "failed to read input".to_string(),
        source,
    })?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompt with a default used when the operator just presses Enter.
pub fn read_line_or<R: BufRead>(input: &mut R, prompt: &str, default: &str) -> OpsResult<String> {
    let answer = read_line(input, prompt)?;
    if answer.trim().is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn candidates(n: usize) -> Vec<ResourceDescriptor> {
        (1..=n)
            .map(|i| ResourceDescriptor {
                id: format!("i-{i:04}"),
                name: format!("host-{i}"),
                state: "running".to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_candidates_cancel_without_prompting() {
        // No input at all: select must not read from the cursor.
        let mut input = Cursor::new("");
        let result = select(&mut input, &[], "terminate").unwrap();
        assert_eq!(result, Selection::Cancelled);
    }

    #[test]
    fn in_range_digit_resolves_one_based() {
        let list = candidates(3);
        assert_eq!(resolve("2", &list).unwrap(), Selection::Id("i-0002".to_string()));
        assert_eq!(resolve("1", &list).unwrap(), Selection::Id("i-0001".to_string()));
        assert_eq!(resolve("3", &list).unwrap(), Selection::Id("i-0003".to_string()));
    }

    #[test]
    fn out_of_range_digit_is_invalid_selection() {
        let list = candidates(3);
        let err = resolve("4", &list).unwrap_err();
        assert!(matches!(err, OpsError::InvalidSelection { max: 3, .. }));
        let err = resolve("99", &list).unwrap_err();
        assert!(matches!(err, OpsError::InvalidSelection { .. }));
    }

    #[test]
    fn cancel_tokens_cancel() {
        let list = candidates(2);
        assert_eq!(resolve("q", &list).unwrap(), Selection::Cancelled);
        assert_eq!(resolve("Q", &list).unwrap(), Selection::Cancelled);
        assert_eq!(resolve("0", &list).unwrap(), Selection::Cancelled);
        assert_eq!(resolve("", &list).unwrap(), Selection::Cancelled);
        assert_eq!(resolve("  ", &list).unwrap(), Selection::Cancelled);
    }

    #[test]
    fn literal_id_passes_through_unvalidated() {
        let list = candidates(2);
        assert_eq!(
            resolve("i-deadbeef", &list).unwrap(),
            Selection::Id("i-deadbeef".to_string())
        );
    }

    #[test]
    fn single_confirm_accepts_yes_variants() {
        for answer in ["y\n", "Y\n", "yes\n", "YES\n", "Yes\n"] {
            let mut input = Cursor::new(answer);
            assert!(confirm(&mut input, "? ").unwrap(), "{answer:?} should affirm");
        }
        for answer in ["n\n", "no\n", "\n", "maybe\n", "yep\n"] {
            let mut input = Cursor::new(answer);
            assert!(!confirm(&mut input, "? ").unwrap(), "{answer:?} should decline");
        }
    }

    #[test]
    fn double_confirm_requires_exact_case_literal() {
        // Lowercase at step one aborts; step two's "yes" is never consumed.
        let mut input = Cursor::new("delete\nyes\n");
        assert!(!confirm_double(&mut input, "DELETE").unwrap());
        let mut leftover = String::new();
        input.read_line(&mut leftover).unwrap();
        assert_eq!(leftover, "yes\n");
    }

    #[test]
    fn double_confirm_requires_second_yes() {
        let mut input = Cursor::new("DELETE\nno\n");
        assert!(!confirm_double(&mut input, "DELETE").unwrap());

        let mut input = Cursor::new("DELETE\nyes\n");
        assert!(confirm_double(&mut input, "DELETE").unwrap());

        let mut input = Cursor::new("DELETE\nYES\n");
        assert!(confirm_double(&mut input, "DELETE").unwrap());
    }

    #[test]
    fn read_line_or_falls_back_to_default() {
        let mut input = Cursor::new("\n");
        assert_eq!(read_line_or(&mut input, "? ", "t2.micro").unwrap(), "t2.micro");

        let mut input = Cursor::new("m5.large\n");
        assert_eq!(read_line_or(&mut input, "? ", "t2.micro").unwrap(), "m5.large");
    }
}

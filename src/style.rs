//! Terminal styling for operator-facing output.
//!
//! All user-visible status lines go through [`paint`], which maps a semantic
//! [`Level`] onto a `colored` style. Callers never pick raw colors; the
//! mapping lives in one place and respects the global color override set at
//! startup (colors are disabled when stderr is not a terminal).

use colored::{ColoredString, Colorize};

/// Semantic meaning of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Section headers, progress narration.
    Info,
    /// Completed actions, healthy states.
    Success,
    /// Cancellations, empty results, soft failures.
    Warn,
    /// Hard failures and destructive-action warnings.
    Error,
    /// Secondary detail (identifiers, paths).
    Detail,
}

/// Style `text` according to `level`.
#[must_use]
pub fn paint(level: Level, text: &str) -> ColoredString {
    match level {
        Level::Info => text.blue(),
        Level::Success => text.green(),
        Level::Warn => text.yellow(),
        Level::Error => text.red(),
        Level::Detail => text.cyan(),
    }
}

/// Print a painted line to stdout.
pub fn line(level: Level, text: &str) {
    println!("{}", paint(level, text));
}

/// Print the `====` banner the managers open with.
pub fn banner(title: &str) {
    println!("{}", paint(Level::Info, "=========================================="));
    println!("{title}");
    println!("{}", paint(Level::Info, "=========================================="));
}

/// Print a dashed separator of the given width.
pub fn separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Style a resource state name: running/ready green, stopped/deallocated
/// yellow, error states red, everything else unstyled.
#[must_use]
pub fn state(text: &str) -> ColoredString {
    let lower = text.to_ascii_lowercase();
    if lower.contains("running") || lower.contains("ready") || lower.contains("completed") {
        text.green()
    } else if lower.contains("stopped") || lower.contains("deallocated") {
        text.yellow()
    } else if lower.contains("error") || lower.contains("failed") {
        text.red()
    } else {
        text.normal()
    }
}

/// Style an entire table row by the resource's state.
#[must_use]
pub fn state_row(state_name: &str, row: &str) -> ColoredString {
    let lower = state_name.to_ascii_lowercase();
    if lower.contains("running") || lower.contains("ready") {
        row.green()
    } else if lower.contains("stopped") || lower.contains("deallocated") {
        row.yellow()
    } else {
        row.normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_is_pure() {
        // Same input, same output; no hidden state between calls.
        let a = paint(Level::Warn, "careful").to_string();
        let b = paint(Level::Warn, "careful").to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn state_maps_known_names() {
        colored::control::set_override(true);
        assert_eq!(state("running").to_string(), "running".green().to_string());
        assert_eq!(state("stopped").to_string(), "stopped".yellow().to_string());
        assert_eq!(state("VM deallocated").to_string(), "VM deallocated".yellow().to_string());
        assert_eq!(state("error").to_string(), "error".red().to_string());
        colored::control::unset_override();
    }
}

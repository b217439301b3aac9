//! Append-only record of saved entry edits in `<case>/.ofti/edits.log`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ofti_types::EntryPath;

use crate::case::relative_display;

const MAX_VALUE_CHARS: usize = 120;

#[must_use]
pub fn edit_log_path(case_dir: &Path) -> PathBuf {
    case_dir.join(".ofti").join("edits.log")
}

/// Collapses whitespace to single spaces and caps the length.
fn compact(value: &str) -> String {
    let joined = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        return "<empty>".to_string();
    }
    if joined.chars().count() <= MAX_VALUE_CHARS {
        return joined;
    }
    let mut clipped: String = joined.chars().take(MAX_VALUE_CHARS - 3).collect();
    clipped.push_str("...");
    clipped
}

#[must_use]
pub fn format_edit_line(
    at: DateTime<Local>,
    rel: &str,
    key: &EntryPath,
    old: &str,
    new: &str,
) -> String {
    format!(
        "{} {rel} {key}: {} -> {}",
        at.to_rfc3339(),
        compact(old),
        compact(new)
    )
}

pub fn record_edit(
    case_dir: &Path,
    file: &Path,
    key: &EntryPath,
    old: &str,
    new: &str,
) -> io::Result<()> {
    let path = edit_log_path(case_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = format_edit_line(Local::now(), &relative_display(case_dir, file), key, old, new);
    let mut log = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(log, "{line}")
}

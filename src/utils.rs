//! Utility functions for text cleanup, truncation, scheduling and file system checks.
//!
//! - Whitespace normalization and character-safe truncation of article text
//! - First-letter capitalization used by the simplifier
//! - Daily run-time parsing and the "is a pass due" check for the scheduler
//! - File system validation for the store location

use crate::errors::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `s` at `max` characters, appending `marker` when something was cut.
///
/// Text of at most `max` characters is returned unchanged, without marker.
/// Counting is done in characters so Romanian diacritics are never split.
pub fn truncate_content(s: &str, max: usize, marker: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], marker),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the bytes that were dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}…(+{} bytes)", &s[..byte_idx], s.len() - byte_idx),
    }
}

/// Capitalize the first character of a string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(upcase("școala"), "Școala");
/// assert_eq!(upcase(""), "");
/// ```
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Replace the legacy cedilla forms of `ș` and `ț` with the comma-below ones.
///
/// Older pages still use `ş`/`ţ`; keyword tables are written with `ș`/`ț`.
pub fn fold_cedillas(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'ş' => 'ș',
            'ţ' => 'ț',
            'Ş' => 'Ș',
            'Ţ' => 'Ț',
            other => other,
        })
        .collect()
}

/// Parse a daily run time given as `HH:MM`.
pub fn parse_daily_time(s: &str) -> std::result::Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M")
}

/// Whether the scheduled daily pass should run now.
///
/// A pass is due once the local time has reached `at`, unless a pass was
/// already started on the same calendar day.
pub fn pass_is_due(now: NaiveDateTime, at: NaiveTime, last_run: Option<NaiveDate>) -> bool {
    now.time() >= at && last_run != Some(now.date())
}

/// Ensure the directory holding `file_path` exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %file_path))]
pub async fn ensure_writable_parent(file_path: &str) -> Result<()> {
    let dir = match Path::new(file_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    let probe_path = dir.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!(dir = %dir.display(), "Store directory is writable");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

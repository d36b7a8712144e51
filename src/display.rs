//! Colored console notices for forwarder events.
//!
//! The diagnostic log file receives the same events through `tracing`;
//! these helpers only mirror the important ones on stdout.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::codec::Record;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated line echoes.
const DEFAULT_MAX_LEN: usize = 160;

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Format the `[PARSED]` notice body for a delivered record.
#[must_use]
pub fn format_parsed(line_number: u64, record: &Record) -> String {
    format!(
        "Line {line_number} : host={}, {}, time={}",
        record.host,
        record.field_set(),
        record.timestamp_ns
    )
}

/// Print that a file was opened for reading.
pub fn print_open(path: &Path) {
    println!(
        "{} {} Processing file: {}",
        timestamp().dimmed(),
        "[OPEN]".blue().bold(),
        path.display().cyan()
    );
    let _ = io::stdout().flush();
}

/// Print a delivered record.
pub fn print_parsed(line_number: u64, record: &Record) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[PARSED]".green().bold(),
        format_parsed(line_number, record)
    );
    let _ = io::stdout().flush();
}

/// Print a skipped candidate line.
pub fn print_skip(line_number: u64, line: &str) {
    println!(
        "{} {} Line {line_number} : {}",
        timestamp().dimmed(),
        "[SKIP]".yellow().bold(),
        truncate(line, DEFAULT_MAX_LEN).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print an informational message.
pub fn print_info(message: &str) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[INFO]".cyan().bold(),
        message
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        message
    );
    let _ = io::stdout().flush();
}

/// Print the error that stopped the forwarder.
pub fn print_fatal(message: &str) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "[FATAL]".red().bold(),
        message.red()
    );
}

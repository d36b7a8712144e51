//! Log file discovery.
//!
//! Lists `*.txt` files in a directory ordered by modification time and
//! answers which file follows a given one.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::WatcherError;

/// Extension of files the forwarder follows.
const LOG_EXTENSION: &str = "txt";

/// A log file observed during one directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Path of the file.
    pub path: PathBuf,
    /// Modification time at scan time.
    pub modified: SystemTime,
}

/// List `*.txt` files in `dir`, oldest first.
///
/// Ties on modification time are broken by file name. Entries that vanish
/// between listing and `stat` are skipped. Nothing is cached: every call
/// re-reads the directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_txt_files(dir: &Path) -> Result<Vec<LogFile>, WatcherError> {
    let entries = std::fs::read_dir(dir).map_err(|e| WatcherError::from_io(dir, e))?;

    let mut files: Vec<LogFile> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == LOG_EXTENSION)
        })
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().ok()?;
            Some(LogFile {
                path: entry.path(),
                modified,
            })
        })
        .collect();

    files.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
    });

    Ok(files)
}

/// Return the file that follows `current` in `files`.
///
/// Returns `None` when `current` is the last entry. If `current` is not in
/// the listing (moved away, for instance) the last file is returned as the
/// best-effort continuation point.
#[must_use]
pub fn find_next_file(current: &Path, files: &[LogFile]) -> Option<PathBuf> {
    match files.iter().position(|f| f.path == current) {
        Some(idx) => files.get(idx + 1).map(|f| f.path.clone()),
        None => files.last().map(|f| f.path.clone()),
    }
}

//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while listing or reading log files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// File to open does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied accessing file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Path has no parent directory to scan.
    #[error("No parent directory for {0}")]
    NoParent(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Classify an `io::Error` raised while touching `path`.
    pub(crate) fn from_io(path: &std::path::Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(e),
        }
    }
}

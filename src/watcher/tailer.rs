//! Incremental line reader for a growing text file.
//!
//! Keeps the file handle open between reads so that data appended while the
//! engine waits is picked up from the current position.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::error::WatcherError;

/// A single line read from the current file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based line number within the file.
    pub number: u64,
    /// Line content, lossily decoded and trimmed.
    pub text: String,
}

/// Line reader that owns the open handle and the read cursor.
///
/// A trailing fragment without a newline is held back until the rest of the
/// line arrives, so a record being written at EOF is never split in two.
#[derive(Debug)]
pub struct LineTailer {
    /// Path of the open file.
    path: PathBuf,
    /// Buffered reader over the open handle.
    reader: BufReader<File>,
    /// Number of complete lines handed out.
    line_number: u64,
    /// Bytes of an unterminated line seen at EOF.
    pending: Vec<u8>,
}

impl LineTailer {
    /// Open `path` with the cursor at the start of the file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` / `PermissionDenied` / `NotAFile` for the obvious
    /// cases and `Io` for anything else.
    pub async fn open(path: &Path) -> Result<Self, WatcherError> {
        let file = File::open(path)
            .await
            .map_err(|e| WatcherError::from_io(path, e))?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(WatcherError::NotAFile(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line_number: 0,
            pending: Vec::new(),
        })
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines handed out so far.
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next complete line.
    ///
    /// Returns `Ok(None)` at EOF. Calling again after the file has grown
    /// continues from the same position.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    pub async fn next_line(&mut self) -> Result<Option<RawLine>, WatcherError> {
        let bytes_read = self.reader.read_until(b'\n', &mut self.pending).await?;
        if bytes_read == 0 {
            return Ok(None);
        }

        if self.pending.last() == Some(&b'\n') {
            Ok(Some(self.take_pending()))
        } else {
            tracing::trace!(
                path = %self.path.display(),
                bytes = self.pending.len(),
                "Holding back unterminated line"
            );
            Ok(None)
        }
    }

    /// Hand out a held-back fragment as the file's final line.
    ///
    /// Used when the file is about to be abandoned for a newer one.
    pub fn take_partial(&mut self) -> Option<RawLine> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_pending())
        }
    }

    fn take_pending(&mut self) -> RawLine {
        self.line_number += 1;
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        RawLine {
            number: self.line_number,
            text,
        }
    }
}

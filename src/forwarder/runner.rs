//! Forwarder runner: the poll / wait / rotate loop.
//!
//! Connects the line tailer, the record codec and the point sink. The loop
//! only returns on cancellation or on a fatal error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::codec::{CodecError, ParseOutcome, RecordSchema, SkipReason};
use crate::config::ForwarderConfig;
use crate::display;
use crate::forwarder::{ForwarderStats, TailState, TailStateMachine};
use crate::sender::{PointSink, SendError};
use crate::watcher::{find_next_file, list_txt_files, LineTailer, LogFile, RawLine, WatcherError};

/// Error type for forwarder operations. Every variant stops the process.
#[derive(thiserror::Error, Debug)]
pub enum ForwarderError {
    /// Start path is missing or not a regular file.
    #[error("Start file '{0}' does not exist or is not a regular file")]
    InvalidStartFile(PathBuf),
    /// Candidate line passed the column check but could not be decoded.
    #[error("Parse failed on line {line_number} of {path}: {line} | Reason: {source}")]
    Malformed {
        path: PathBuf,
        line_number: u64,
        line: String,
        source: CodecError,
    },
    /// Record could not be delivered.
    #[error("Delivery failed for line {line_number} of {path}: {source}")]
    Delivery {
        path: PathBuf,
        line_number: u64,
        source: SendError,
    },
    /// Reading the current file failed.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

/// Whether the loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineFlow {
    Continue,
    Cancelled,
}

/// Resolve the start file argument.
///
/// Expands a leading `~`, canonicalizes the path and checks that it is a
/// regular file.
///
/// # Errors
///
/// Returns `ForwarderError::InvalidStartFile` otherwise.
pub fn resolve_start_file(path: &Path) -> Result<PathBuf, ForwarderError> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    };

    let resolved = expanded
        .canonicalize()
        .map_err(|_| ForwarderError::InvalidStartFile(path.to_path_buf()))?;

    if resolved.is_file() {
        Ok(resolved)
    } else {
        Err(ForwarderError::InvalidStartFile(resolved))
    }
}

/// Choose the file to rotate to, never returning one already left behind.
///
/// Starts from the plain successor of `current` and walks forward past
/// visited files (an old file whose mtime was bumped by a late write sorts
/// after newer ones).
fn pick_successor(
    current: &Path,
    files: &[LogFile],
    visited: &HashSet<PathBuf>,
) -> Option<PathBuf> {
    let next = find_next_file(current, files)?;
    if !visited.contains(&next) {
        return Some(next);
    }

    let start = files.iter().position(|f| f.path == next)?;
    files[start..]
        .iter()
        .map(|f| &f.path)
        .find(|p| !visited.contains(*p) && p.as_path() != current)
        .cloned()
}

/// Tails the `*.txt` files of one directory and forwards each record.
pub struct Forwarder<S> {
    schema: RecordSchema,
    sink: S,
    wait_interval: Duration,
    cancel: CancellationToken,
    state: TailStateMachine,
    visited: HashSet<PathBuf>,
}

impl<S: PointSink> Forwarder<S> {
    /// Create a forwarder from configuration and a sink.
    #[must_use]
    pub fn new(config: &ForwarderConfig, sink: S) -> Self {
        Self {
            schema: RecordSchema::from_config(config),
            sink,
            wait_interval: config.wait_interval(),
            cancel: CancellationToken::new(),
            state: TailStateMachine::new(),
            visited: HashSet::new(),
        }
    }

    /// Override the wait interval.
    #[must_use]
    pub fn with_wait_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = wait_interval;
        self
    }

    /// Set a cancellation token for graceful shutdown.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the loop when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn stats(&self) -> ForwarderStats {
        self.state.stats()
    }

    /// Tail from the start of `start_file` until cancelled.
    ///
    /// Returns the run statistics after a clean cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed candidate line, a failed delivery, or
    /// a read error on the current file. The cursor is not persisted, so a
    /// restart begins again at the top of the start file.
    pub async fn run(&mut self, start_file: &Path) -> Result<ForwarderStats, ForwarderError> {
        let result = self.run_loop(start_file).await;
        if let Err(ForwarderError::Watcher(e)) = &result {
            tracing::error!(error = %e, "Read failed");
        }
        let stats = self.stats();
        tracing::info!(
            lines_read = stats.lines_read,
            records_sent = stats.records_sent,
            lines_skipped = stats.lines_skipped,
            files_opened = stats.files_opened,
            "Forwarder stopped"
        );
        result.map(|()| stats)
    }

    async fn run_loop(&mut self, start_file: &Path) -> Result<(), ForwarderError> {
        // Listing entries are `directory.join(name)`; keep the cursor path comparable.
        let start_file = if start_file.is_absolute() {
            start_file.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(WatcherError::Io)?
                .join(start_file)
        };
        let directory = start_file
            .parent()
            .ok_or_else(|| WatcherError::NoParent(start_file.clone()))?
            .to_path_buf();

        let mut tailer = self.open(&start_file).await?;
        self.state.transition(TailState::Reading);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Forwarder cancelled");
                return Ok(());
            }

            match self.state.state() {
                TailState::Reading => match tailer.next_line().await? {
                    Some(line) => {
                        if self.handle_line(tailer.path(), line).await? == LineFlow::Cancelled {
                            return Ok(());
                        }
                    }
                    None => self.state.transition(TailState::Waiting),
                },
                TailState::Waiting => {
                    if !self.wait().await {
                        tracing::info!("Forwarder cancelled while waiting");
                        return Ok(());
                    }
                    match tailer.next_line().await? {
                        Some(line) => {
                            if self.handle_line(tailer.path(), line).await? == LineFlow::Cancelled
                            {
                                return Ok(());
                            }
                            self.state.transition(TailState::Reading);
                        }
                        None => self.state.transition(TailState::Rotating),
                    }
                }
                TailState::Rotating => {
                    let Some(next) = self.find_successor(&directory, tailer.path()) else {
                        self.state.transition(TailState::Waiting);
                        continue;
                    };

                    // Finish the old file before touching its successor.
                    if self.drain(&mut tailer).await? == LineFlow::Cancelled {
                        return Ok(());
                    }

                    let next_tailer = match LineTailer::open(&next).await {
                        Ok(t) => t,
                        Err(e @ (WatcherError::NotFound(_) | WatcherError::NotAFile(_))) => {
                            tracing::warn!(
                                path = %next.display(),
                                error = %e,
                                "Next file vanished before it could be opened"
                            );
                            self.state.transition(TailState::Waiting);
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    };

                    tracing::info!(
                        from = %tailer.path().display(),
                        to = %next.display(),
                        lines = tailer.line_number(),
                        "Rotating to next file"
                    );
                    self.visited.insert(tailer.path().to_path_buf());
                    tailer = next_tailer;
                    self.announce_open(tailer.path());
                    self.state.transition(TailState::Reading);
                }
            }
        }
    }

    /// Open the start file.
    async fn open(&mut self, path: &Path) -> Result<LineTailer, WatcherError> {
        let tailer = LineTailer::open(path).await?;
        self.announce_open(path);
        Ok(tailer)
    }

    fn announce_open(&mut self, path: &Path) {
        self.state.record_file_opened();
        tracing::info!(path = %path.display(), "Processing file");
        display::print_open(path);
    }

    /// Sleep for the wait interval. Returns `false` if cancelled first.
    async fn wait(&self) -> bool {
        tokio::select! {
            biased;

            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(self.wait_interval) => true,
        }
    }

    /// Re-scan the directory for the file after `current`.
    fn find_successor(&self, directory: &Path, current: &Path) -> Option<PathBuf> {
        let files = match list_txt_files(directory) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    dir = %directory.display(),
                    error = %e,
                    "Directory scan failed, staying on current file"
                );
                return None;
            }
        };

        pick_successor(current, &files, &self.visited)
    }

    /// Read whatever is left in the file about to be abandoned.
    async fn drain(&mut self, tailer: &mut LineTailer) -> Result<LineFlow, ForwarderError> {
        let path = tailer.path().to_path_buf();

        while let Some(line) = tailer.next_line().await? {
            if self.handle_line(&path, line).await? == LineFlow::Cancelled {
                return Ok(LineFlow::Cancelled);
            }
        }

        if let Some(line) = tailer.take_partial() {
            tracing::debug!(
                path = %path.display(),
                line_number = line.number,
                "Processing unterminated final line"
            );
            return self.handle_line(&path, line).await;
        }

        Ok(LineFlow::Continue)
    }

    /// Filter, parse and deliver one line.
    async fn handle_line(&mut self, path: &Path, line: RawLine) -> Result<LineFlow, ForwarderError> {
        self.state.record_line();

        if !self.schema.is_candidate(&line.text) {
            return Ok(LineFlow::Continue);
        }

        let record = match self.schema.parse(&line.text) {
            ParseOutcome::Record(record) => record,
            ParseOutcome::Skip(SkipReason::NotCandidate) => return Ok(LineFlow::Continue),
            ParseOutcome::Skip(SkipReason::FieldCount { expected, found }) => {
                self.state.record_skip();
                tracing::info!(
                    path = %path.display(),
                    line_number = line.number,
                    line = %line.text,
                    expected,
                    found,
                    "Skipping line with unexpected field count"
                );
                display::print_skip(line.number, &line.text);
                return Ok(LineFlow::Continue);
            }
            ParseOutcome::Malformed(source) => {
                tracing::error!(
                    path = %path.display(),
                    line_number = line.number,
                    line = %line.text,
                    error = %source,
                    "Parse failed"
                );
                return Err(ForwarderError::Malformed {
                    path: path.to_path_buf(),
                    line_number: line.number,
                    line: line.text,
                    source,
                });
            }
        };

        let line_protocol = record.to_line_protocol();
        let result = tokio::select! {
            biased;

            () = self.cancel.cancelled() => {
                tracing::info!(line_number = line.number, "Cancelled during delivery");
                return Ok(LineFlow::Cancelled);
            }
            result = self.sink.send(&line_protocol) => result,
        };

        match result {
            Ok(()) => {
                self.state.record_sent();
                tracing::info!(
                    path = %path.display(),
                    line_number = line.number,
                    line = %line.text,
                    "Parsed"
                );
                display::print_parsed(line.number, &record);
                Ok(LineFlow::Continue)
            }
            Err(source) => {
                tracing::error!(
                    path = %path.display(),
                    line_number = line.number,
                    line = %line.text,
                    error = %source,
                    "Delivery failed"
                );
                Err(ForwarderError::Delivery {
                    path: path.to_path_buf(),
                    line_number: line.number,
                    source,
                })
            }
        }
    }
}

//! Watcher module for rotating `*.txt` log files.
//!
//! Provides directory discovery and incremental line reading.

mod discovery;
mod error;
mod tailer;

pub use discovery::{find_next_file, list_txt_files, LogFile};
pub use error::WatcherError;
pub use tailer::{LineTailer, RawLine};

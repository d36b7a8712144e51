//! Tailing state machine.

/// Current phase of the tailing loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailState {
    /// Reading lines until EOF.
    #[default]
    Reading,
    /// At EOF; sleeping before one more read.
    Waiting,
    /// Still at EOF after the wait; looking for the next file.
    Rotating,
}

/// State machine for tracking tailing progress.
#[derive(Debug, Clone)]
pub struct TailStateMachine {
    state: TailState,
    stats: ForwarderStats,
}

impl Default for TailStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TailStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TailState::Reading,
            stats: ForwarderStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn transition(&mut self, new_state: TailState) {
        if self.state != new_state {
            tracing::trace!(from = ?self.state, to = ?new_state, "State transition");
        }
        self.state = new_state;
    }

    pub fn record_line(&mut self) {
        self.stats.lines_read = self.stats.lines_read.saturating_add(1);
    }

    pub fn record_sent(&mut self) {
        self.stats.records_sent = self.stats.records_sent.saturating_add(1);
    }

    pub fn record_skip(&mut self) {
        self.stats.lines_skipped = self.stats.lines_skipped.saturating_add(1);
    }

    pub fn record_file_opened(&mut self) {
        self.stats.files_opened = self.stats.files_opened.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }
}

/// Run statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    /// Lines read across all files.
    pub lines_read: u64,
    /// Records delivered.
    pub records_sent: u64,
    /// Candidate lines skipped for a wrong column count.
    pub lines_skipped: u64,
    /// Files opened, the start file included.
    pub files_opened: u64,
}

//! Run statistics
//!
//! Counters are updated under the checkpoint lock and logged at every
//! checkpoint; [`RunSummary`] is what a finished run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate per-record outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Records that emitted rows
    pub processed: usize,
    /// Emitted records whose caption was regenerated
    pub recaptioned: usize,
    /// Records dropped on a fetch / decode error
    pub failed: usize,
    /// Records with no usable audio
    pub skipped: usize,
}

impl RunCounters {
    /// Records that reached a terminal state
    pub fn completed(&self) -> usize {
        self.processed + self.failed + self.skipped
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} processed ({} recaptioned), {} failed, {} skipped",
            self.processed, self.recaptioned, self.failed, self.skipped
        )
    }
}

/// Final report of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub counters: RunCounters,
    /// Rows in the final dataset snapshot
    pub rows_written: usize,
    /// Periodic snapshots written during the run (final write excluded)
    pub checkpoints_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

//! Shared row accumulator with periodic snapshots
//!
//! The accumulator is the only state shared between in-flight records. The
//! lock covers "append the outcome and decide whether a snapshot is due";
//! the snapshot itself is written on the blocking pool after the lock is
//! released.

use super::statistics::RunCounters;
use crate::dataset::DatasetWriter;
use crate::error::DatasetError;
use crate::models::OutputRow;
use std::sync::Mutex;
use tracing::{info, warn};

/// Terminal result of one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Emitted {
        rows: Vec<OutputRow>,
        recaptioned: bool,
    },
    Skipped,
    Failed,
}

#[derive(Debug, Default)]
struct Accumulator {
    rows: Vec<OutputRow>,
    counters: RunCounters,
    checkpoints_written: usize,
}

pub struct CheckpointState {
    inner: Mutex<Accumulator>,
    writer: DatasetWriter,
    interval: usize,
}

impl CheckpointState {
    /// Snapshot to `writer` every `interval` completed records
    pub fn new(writer: DatasetWriter, interval: usize) -> Self {
        Self {
            inner: Mutex::new(Accumulator::default()),
            writer,
            interval: interval.max(1),
        }
    }

    /// Fold one record outcome in, writing a snapshot when one is due
    ///
    /// The snapshot is written on the blocking pool. A failed snapshot is
    /// logged and the run continues; the next checkpoint (or the final
    /// write) replaces it.
    pub async fn record(&self, outcome: RecordOutcome) {
        let snapshot = {
            let mut acc = self.lock();
            match outcome {
                RecordOutcome::Emitted { rows, recaptioned } => {
                    acc.counters.processed += 1;
                    if recaptioned {
                        acc.counters.recaptioned += 1;
                    }
                    acc.rows.extend(rows);
                }
                RecordOutcome::Skipped => acc.counters.skipped += 1,
                RecordOutcome::Failed => acc.counters.failed += 1,
            }

            if acc.counters.completed() % self.interval == 0 {
                acc.checkpoints_written += 1;
                Some((acc.rows.clone(), acc.counters))
            } else {
                None
            }
        };

        let Some((rows, counters)) = snapshot else {
            return;
        };

        let row_count = rows.len();
        match write_off_executor(self.writer.clone(), rows).await {
            Ok(()) => info!(
                path = %self.writer.path().display(),
                rows = row_count,
                processed = counters.processed,
                recaptioned = counters.recaptioned,
                failed = counters.failed,
                skipped = counters.skipped,
                "Checkpoint written"
            ),
            Err(e) => warn!(
                path = %self.writer.path().display(),
                error = %e,
                "Checkpoint write failed, continuing"
            ),
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.lock().counters
    }

    /// Write the final snapshot and hand back the accumulated state
    ///
    /// Returns the rows, counters and number of periodic checkpoints.
    pub async fn finish(self) -> Result<(Vec<OutputRow>, RunCounters, usize), DatasetError> {
        let acc = self
            .inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let writer = self.writer;
        let (writer, acc) = tokio::task::spawn_blocking(move || {
            writer.write_all(&acc.rows).map(|()| (writer, acc))
        })
        .await
        .map_err(|e| DatasetError::Io(std::io::Error::other(e)))??;

        info!(
            path = %writer.path().display(),
            rows = acc.rows.len(),
            "Final dataset written"
        );
        Ok((acc.rows, acc.counters, acc.checkpoints_written))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Accumulator> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn write_off_executor(
    writer: DatasetWriter,
    rows: Vec<OutputRow>,
) -> Result<(), DatasetError> {
    tokio::task::spawn_blocking(move || writer.write_all(&rows))
        .await
        .map_err(|e| DatasetError::Io(std::io::Error::other(e)))?
}

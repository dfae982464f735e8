//! Concurrent ingestion pipeline
//!
//! Each record is handled end-to-end by one in-flight future:
//! acquire audio → decide on the existing caption → regenerate if needed →
//! emit one row per asset. At most `concurrency` records are in flight;
//! completion order is unordered. Outcomes are folded into a
//! [`CheckpointState`] as they complete.

use super::checkpoint::{CheckpointState, RecordOutcome};
use super::statistics::RunSummary;
use crate::config::IngestConfig;
use crate::dataset::DatasetWriter;
use crate::error::DatasetError;
use crate::models::{Caption, CaptionSource, OutputRow, Record, RecordProgress, RecordState};
use crate::services::{
    fallback_caption, sanitize, AudioNormalizer, CaptionDecisionEngine, CaptioningClient,
    PromptContext,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct IngestPipeline {
    config: Arc<IngestConfig>,
    normalizer: AudioNormalizer,
    decision: CaptionDecisionEngine,
    captioner: CaptioningClient,
    writer: DatasetWriter,
}

impl IngestPipeline {
    pub fn new(
        config: Arc<IngestConfig>,
        normalizer: AudioNormalizer,
        decision: CaptionDecisionEngine,
        captioner: CaptioningClient,
        writer: DatasetWriter,
    ) -> Self {
        Self {
            config,
            normalizer,
            decision,
            captioner,
            writer,
        }
    }

    /// Process every record and write the final dataset
    ///
    /// Per-record failures never abort the run; only the final dataset
    /// write can fail.
    pub async fn run(&self, records: Vec<Record>) -> Result<RunSummary, DatasetError> {
        let started_at = Utc::now();
        let total_records = records.len();
        let concurrency = self.config.concurrency.max(1);

        info!(
            total_records,
            concurrency,
            checkpoint_interval = self.config.checkpoint_interval,
            output = %self.writer.path().display(),
            "Starting ingestion run"
        );

        let checkpoint = CheckpointState::new(self.writer.clone(), self.config.checkpoint_interval);
        let completed = Arc::new(AtomicUsize::new(0));

        let outcomes = stream::iter(records.iter())
            .map(|record| {
                let completed = Arc::clone(&completed);
                async move {
                    let outcome = self.process_record(record).await;
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 || done == total_records {
                        debug!(completed = done, total = total_records, "Ingestion progress");
                    }
                    outcome
                }
            })
            .buffer_unordered(concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        while let Some(outcome) = outcomes.next().await {
            checkpoint.record(outcome).await;
        }

        let (rows, counters, checkpoints_written) = checkpoint.finish().await?;
        let summary = RunSummary {
            total_records,
            counters,
            rows_written: rows.len(),
            checkpoints_written,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            processed = counters.processed,
            recaptioned = counters.recaptioned,
            failed = counters.failed,
            skipped = counters.skipped,
            rows = summary.rows_written,
            duration_secs = summary.duration_secs(),
            "Ingestion run complete"
        );

        Ok(summary)
    }

    /// Take one record to a terminal state
    pub async fn process_record(&self, record: &Record) -> RecordOutcome {
        let mut progress = RecordProgress::new(record.id);

        progress.transition_to(RecordState::Acquiring);
        let assets = match self.normalizer.acquire(record).await {
            Ok(assets) => assets,
            Err(e) => {
                error!(
                    record_id = record.id,
                    url = %record.url,
                    error = %e,
                    record_failure = e.is_record_failure(),
                    "Audio acquisition failed, dropping record"
                );
                progress.transition_to(RecordState::Failed);
                return RecordOutcome::Failed;
            }
        };

        if assets.is_empty() {
            info!(record_id = record.id, url = %record.url, "No usable audio, skipping record");
            progress.transition_to(RecordState::Skipped);
            return RecordOutcome::Skipped;
        }

        progress.transition_to(RecordState::Deciding);
        let decision = self
            .decision
            .decide(
                &record.label,
                record.description_text().unwrap_or(""),
                record.caption_text().unwrap_or(""),
            )
            .await;

        let caption = if decision.accept {
            match record.caption_text() {
                Some(existing) => Caption::new(existing, CaptionSource::Existing),
                None => Caption::new(record.label.as_str(), CaptionSource::Fallback),
            }
        } else {
            progress.transition_to(RecordState::Captioning);
            self.regenerate(record).await
        };
        progress.transition_to(RecordState::CaptionReady);

        let rows = OutputRow::for_assets(
            &self.config.dataset_name,
            record,
            &assets,
            &caption,
            decision.needs_recaptioning(),
        );
        info!(
            record_id = record.id,
            label = %record.label,
            assets = rows.len(),
            reason = ?decision.reason,
            caption_source = ?caption.source,
            "Record emitted"
        );
        progress.transition_to(RecordState::Emitted);

        RecordOutcome::Emitted {
            rows,
            recaptioned: decision.needs_recaptioning(),
        }
    }

    async fn regenerate(&self, record: &Record) -> Caption {
        let ctx = PromptContext {
            label: &record.label,
            description: record.description_text(),
        };

        match self.captioner.caption(ctx).await {
            Ok(text) => {
                let clean = sanitize(&text, &record.label);
                if clean == text {
                    Caption::new(clean, CaptionSource::Regenerated)
                } else {
                    Caption::new(clean, CaptionSource::Fallback)
                }
            }
            Err(e) => {
                warn!(
                    record_id = record.id,
                    label = %record.label,
                    error = %e,
                    "Caption generation failed, using fallback caption"
                );
                Caption::new(fallback_caption(&record.label), CaptionSource::Fallback)
            }
        }
    }
}

//! Input metadata records and their per-record processing state

use serde::{Deserialize, Serialize};

/// One validated input row describing an audio clip to ingest
///
/// Built by `dataset::input` at the ingestion boundary; never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Position of the row in the input dataset
    pub id: usize,
    /// Species / common name (ground-truth label)
    pub label: String,
    /// Free-text observation notes
    pub description: Option<String>,
    /// Remote audio location
    pub url: String,
    /// Caption shipped with the source row
    pub current_caption: Option<String>,
    /// Prior observation count for `label` (0 when unknown)
    pub species_count: u64,
    /// Scientific name, when the source carries one
    pub scientific_name: Option<String>,
}

impl Record {
    /// Description with surrounding whitespace removed, `None` when blank
    pub fn description_text(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    /// Existing caption with surrounding whitespace removed, `None` when blank
    pub fn caption_text(&self) -> Option<&str> {
        non_blank(self.current_caption.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Per-record workflow state
///
/// Pending → Acquiring → (Skipped | Deciding) → (CaptionReady | Captioning)
/// → Emitted | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordState {
    /// Queued for a worker
    Pending,
    /// Fetching / normalizing audio
    Acquiring,
    /// No usable audio
    Skipped,
    /// Judging the existing caption
    Deciding,
    /// Waiting on the captioning service
    Captioning,
    /// Caption settled, rows not yet emitted
    CaptionReady,
    /// Rows handed to the accumulator
    Emitted,
    /// Fetch or decode error
    Failed,
}

impl RecordState {
    /// Terminal states end a record's processing
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Emitted | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, next),
            (Pending, Acquiring)
                | (Acquiring, Skipped)
                | (Acquiring, Failed)
                | (Acquiring, Deciding)
                | (Deciding, CaptionReady)
                | (Deciding, Captioning)
                | (Captioning, CaptionReady)
                | (CaptionReady, Emitted)
        )
    }
}

/// Tracks one record's walk through [`RecordState`]
#[derive(Debug, Clone)]
pub struct RecordProgress {
    pub record_id: usize,
    pub state: RecordState,
}

impl RecordProgress {
    pub fn new(record_id: usize) -> Self {
        Self {
            record_id,
            state: RecordState::Pending,
        }
    }

    /// Move to `next`, logging the transition
    ///
    /// Illegal transitions are logged and applied anyway; they indicate a
    /// workflow bug, not bad input.
    pub fn transition_to(&mut self, next: RecordState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                record_id = self.record_id,
                from = ?self.state,
                to = ?next,
                "Unexpected record state transition"
            );
        }
        tracing::trace!(record_id = self.record_id, from = ?self.state, to = ?next, "Record state");
        self.state = next;
    }
}

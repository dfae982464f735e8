//! Caption decisions and caption provenance

use serde::{Deserialize, Serialize};

/// Why a caption was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionReason {
    /// No description to ground a new caption in
    NoDescription,
    /// Record has no caption at all
    MissingCaption,
    /// Caption names a location the label does not
    LocationLeak,
    /// Caption does not mention the label
    LabelMismatch,
    /// Caption is usable as is
    OK,
}

/// Outcome of the "needs recaptioning" heuristics. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionDecision {
    pub accept: bool,
    pub reason: DecisionReason,
}

impl CaptionDecision {
    pub fn accept(reason: DecisionReason) -> Self {
        Self {
            accept: true,
            reason,
        }
    }

    pub fn reject(reason: DecisionReason) -> Self {
        Self {
            accept: false,
            reason,
        }
    }

    /// Shorthand for `!accept`, matching the output row flag
    pub fn needs_recaptioning(&self) -> bool {
        !self.accept
    }
}

/// Where a caption's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionSource {
    /// Shipped with the input record
    Existing,
    /// Produced by the captioning service
    Regenerated,
    /// Deterministic label-based text
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub source: CaptionSource,
}

impl Caption {
    pub fn new(text: impl Into<String>, source: CaptionSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

//! Caption Decision Engine
//!
//! Judges whether a record's existing caption can ship as is, and cleans
//! newly generated captions before they reach the dataset.
//!
//! Location filtering and the lexical label check are alternative
//! policies selected by one flag, never combined.

use crate::models::{CaptionDecision, DecisionReason};
use crate::services::location_oracle::LocationOracle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Substrings marking an apologetic or meta-referential generation
const LEAK_MARKERS: [&str; 6] = [
    "sorry",
    "apologize",
    "siento",
    "description",
    "information",
    "caption",
];

/// Which heuristic rule 3/4 of the decision uses
#[derive(Clone)]
pub enum DecisionPolicy {
    /// Reject captions naming a location the label does not
    LocationFilter(Arc<dyn LocationOracle>),
    /// Reject captions that do not contain the label
    Lexical,
}

pub struct CaptionDecisionEngine {
    policy: DecisionPolicy,
}

impl CaptionDecisionEngine {
    pub fn with_location_filter(oracle: Arc<dyn LocationOracle>) -> Self {
        Self {
            policy: DecisionPolicy::LocationFilter(oracle),
        }
    }

    pub fn lexical() -> Self {
        Self {
            policy: DecisionPolicy::Lexical,
        }
    }

    pub fn filters_location(&self) -> bool {
        matches!(self.policy, DecisionPolicy::LocationFilter(_))
    }

    /// Decide whether `existing_caption` is acceptable for `label`
    ///
    /// Rules, in order:
    /// 1. blank description → accept (`NoDescription`)
    /// 2. blank caption → reject (`MissingCaption`)
    /// 3. location policy: caption has a location, label has none → reject
    ///    (`LocationLeak`)
    /// 4. lexical policy: label not a case-insensitive substring → reject
    ///    (`LabelMismatch`)
    /// 5. accept (`OK`)
    pub async fn decide(
        &self,
        label: &str,
        description: &str,
        existing_caption: &str,
    ) -> CaptionDecision {
        if description.trim().is_empty() {
            return CaptionDecision::accept(DecisionReason::NoDescription);
        }

        let caption = existing_caption.trim();
        if caption.is_empty() {
            debug!(label, "Needs recaptioning: no caption");
            return CaptionDecision::reject(DecisionReason::MissingCaption);
        }

        match &self.policy {
            DecisionPolicy::LocationFilter(oracle) => {
                if mentions_location(oracle.as_ref(), caption).await
                    && !mentions_location(oracle.as_ref(), label).await
                {
                    debug!(label, caption, "Needs recaptioning: location leak");
                    return CaptionDecision::reject(DecisionReason::LocationLeak);
                }
            }
            DecisionPolicy::Lexical => {
                if !caption.to_lowercase().contains(&label.to_lowercase()) {
                    debug!(label, caption, "Needs recaptioning: label mismatch");
                    return CaptionDecision::reject(DecisionReason::LabelMismatch);
                }
            }
        }

        CaptionDecision::accept(DecisionReason::OK)
    }
}

/// Oracle failures count as "no location" so a flaky NER service never
/// forces a recaption
async fn mentions_location(oracle: &dyn LocationOracle, text: &str) -> bool {
    match oracle.mentions_location(text).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "Location oracle failed, assuming no location");
            false
        }
    }
}

/// Replace a generated caption with the bare label when it contains a
/// leak marker
pub fn sanitize(caption: &str, label: &str) -> String {
    let lower = caption.to_lowercase();
    if let Some(marker) = LEAK_MARKERS.iter().find(|m| lower.contains(*m)) {
        debug!(marker, caption, "Generated caption rejected");
        return label.to_string();
    }
    caption.to_string()
}

/// Deterministic caption used when generation fails
pub fn fallback_caption(label: &str) -> String {
    format!("The sound of a {}", label)
}

/// Swap the common name for the scientific name, when one is known
pub fn caption_with_scientific_name(
    caption: &str,
    label: &str,
    scientific_name: Option<&str>,
) -> String {
    match scientific_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) if !label.is_empty() => caption.replace(label, name),
        _ => caption.to_string(),
    }
}

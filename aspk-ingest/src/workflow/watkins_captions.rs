//! Watkins metadata captions
//!
//! Reads a Watkins catalogue table (one row per recording, columns
//! `species`, `genus_species`, `signal_type`, `behavior`, `num_animals`,
//! `notes`) and writes it back with a generated `caption` column.

use crate::dataset::CaptionTable;
use crate::error::DatasetError;
use crate::services::{fallback_caption, sanitize, CaptioningClient, WatkinsMetadata};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatkinsCaptionSummary {
    pub total_rows: usize,
    pub captioned: usize,
    /// Rows that got the label-based fallback after the service gave up
    pub fallbacks: usize,
    /// Rows without a species, left untouched
    pub skipped: usize,
}

fn metadata(table: &CaptionTable, index: usize) -> WatkinsMetadata {
    WatkinsMetadata {
        species: table.field(index, "species").trim().to_string(),
        genus_species: table.field(index, "genus_species"),
        signal_type: table.field(index, "signal_type"),
        behavior: table.field(index, "behavior"),
        num_animals: table.field(index, "num_animals"),
        notes: table.field(index, "notes"),
    }
}

/// Caption every row of `input` from its metadata and write to `output`
///
/// `output` must use the same format as `input`. A CSV input without a
/// `caption` column gains one.
pub async fn caption_watkins_dataset(
    input: &Path,
    output: &Path,
    captioner: &CaptioningClient,
) -> Result<WatkinsCaptionSummary, DatasetError> {
    let mut table = CaptionTable::read_adding_caption(input)?;
    let mut summary = WatkinsCaptionSummary {
        total_rows: table.len(),
        ..Default::default()
    };

    for index in 0..summary.total_rows {
        let mut meta = metadata(&table, index);
        if meta.species.is_empty() {
            warn!(row = index, "Watkins row has no species, leaving caption as-is");
            summary.skipped += 1;
            continue;
        }
        meta.genus_species = meta.primary_genus_species();

        let caption = match captioner.caption_watkins(&meta).await {
            Ok(text) => {
                summary.captioned += 1;
                sanitize(&text, &meta.species)
            }
            Err(e) => {
                warn!(
                    row = index,
                    species = %meta.species,
                    error = %e,
                    "Watkins caption failed, using fallback"
                );
                summary.fallbacks += 1;
                fallback_caption(&meta.species)
            }
        };

        debug!(row = index, caption = %caption, "Captioned Watkins row");
        table.set_caption(index, &caption);
    }

    table.write(output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        total_rows = summary.total_rows,
        captioned = summary.captioned,
        fallbacks = summary.fallbacks,
        skipped = summary.skipped,
        "Watkins caption pass complete"
    );

    Ok(summary)
}

//! Watkins recaption pass
//!
//! Walks an existing caption dataset and regenerates captions that carry
//! recording artifacts (coordinates, tape / CD references, hydrophone
//! numbers). Other columns are preserved as-is.

use crate::dataset::CaptionTable;
use crate::error::DatasetError;
use crate::services::{needs_recaption, CaptioningClient};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecaptionSummary {
    pub total_rows: usize,
    pub recaptioned: usize,
}

/// Recaption flagged rows of `input` and write the result to `output`
///
/// `output` must use the same format as `input`. Service failures keep the
/// previous caption.
pub async fn recaption_dataset(
    input: &Path,
    output: &Path,
    captioner: &CaptioningClient,
) -> Result<RecaptionSummary, DatasetError> {
    let mut table = CaptionTable::read(input)?;
    let total_rows = table.len();
    let mut recaptioned = 0;

    for index in 0..total_rows {
        let old = table.caption(index).to_string();
        if !needs_recaption(&old) {
            continue;
        }

        let new = captioner.recaption(&old).await;
        debug!(row = index, old = %old, new = %new, "Recaptioned row");
        table.set_caption(index, &new);
        recaptioned += 1;
    }

    table.write(output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        total_rows,
        recaptioned,
        "Recaption pass complete"
    );

    Ok(RecaptionSummary {
        total_rows,
        recaptioned,
    })
}

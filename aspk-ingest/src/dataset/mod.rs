//! Dataset input / output

pub mod input;
pub mod output;
pub mod table;

pub use input::{filter_applicable, load_records, RawRow, SpeciesCounts, ALLOWED_LICENSES};
pub use output::DatasetWriter;
pub use table::CaptionTable;

use crate::error::DatasetError;
use std::path::Path;

/// On-disk dataset encodings, picked by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    JsonLines,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("jsonl") | Some("ndjson") => Ok(Self::JsonLines),
            _ => Err(DatasetError::Format(path.display().to_string())),
        }
    }
}

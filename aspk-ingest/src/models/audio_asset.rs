//! Materialized local audio segments

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A normalized audio file written by the acquisition step
///
/// Zero, one or many per record (chunking). Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAsset {
    /// Location of the WAV file
    pub path: PathBuf,
    /// Duration of the written audio in milliseconds
    pub duration_ms: u64,
    /// Sample rate of the written audio
    pub sample_rate: u32,
    /// `Record::id` this asset was derived from
    pub source_record_id: usize,
}

impl AudioAsset {
    /// Build an asset from a frame count at `sample_rate`
    pub fn from_frames(
        path: PathBuf,
        frames: u64,
        sample_rate: u32,
        source_record_id: usize,
    ) -> Self {
        let duration_ms = if sample_rate == 0 {
            0
        } else {
            frames * 1000 / sample_rate as u64
        };
        Self {
            path,
            duration_ms,
            sample_rate,
            source_record_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_frames() {
        let asset = AudioAsset::from_frames(PathBuf::from("a.wav"), 480_000, 48_000, 3);
        assert_eq!(asset.duration_ms, 10_000);
        assert_eq!(asset.source_record_id, 3);

        let empty = AudioAsset::from_frames(PathBuf::from("b.wav"), 10, 0, 0);
        assert_eq!(empty.duration_ms, 0);
    }
}

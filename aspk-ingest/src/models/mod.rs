//! Data models for aspk-ingest

pub mod audio_asset;
pub mod caption;
pub mod output_row;
pub mod record;

pub use audio_asset::AudioAsset;
pub use caption::{Caption, CaptionDecision, CaptionSource, DecisionReason};
pub use output_row::OutputRow;
pub use record::{Record, RecordProgress, RecordState};

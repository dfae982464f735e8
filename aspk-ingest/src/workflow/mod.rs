//! Run orchestration
//!
//! - [`IngestPipeline`]: the bounded concurrent record pipeline
//! - [`CheckpointState`]: shared row accumulator with periodic snapshots
//! - [`recaption_dataset`]: the sequential Watkins recaption pass
//! - [`caption_watkins_dataset`]: captions from Watkins catalogue metadata

pub mod checkpoint;
pub mod pipeline;
pub mod recaption;
pub mod statistics;
pub mod watkins_captions;

pub use checkpoint::{CheckpointState, RecordOutcome};
pub use pipeline::IngestPipeline;
pub use recaption::{recaption_dataset, RecaptionSummary};
pub use statistics::{RunCounters, RunSummary};
pub use watkins_captions::{caption_watkins_dataset, WatkinsCaptionSummary};

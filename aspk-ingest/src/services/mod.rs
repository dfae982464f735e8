//! Services for aspk-ingest
//!
//! Acquisition, caption decision and caption generation, each behind a
//! trait seam so the orchestrator can run against in-memory stand-ins.

pub mod asset_store;
pub mod audio_fetcher;
pub mod audio_normalizer;
pub mod caption_decision;
pub mod captioning_client;
pub mod location_oracle;
pub mod openai_service;
pub mod prompt_templates;
pub mod watkins;

pub use asset_store::{AssetStore, LocalAssetStore, MemoryAssetStore};
pub use audio_fetcher::{AudioFetcher, HttpAudioFetcher};
pub use audio_normalizer::{plan_segments, AssetKeys, AudioNormalizer, Segment, SegmentPlan, SegmentPolicy};
pub use caption_decision::{
    caption_with_scientific_name, fallback_caption, sanitize, CaptionDecisionEngine, DecisionPolicy,
};
pub use captioning_client::{
    CaptionService, CaptioningClient, PromptContext, RetryExhausted, RetryPolicy,
};
pub use location_oracle::{LocationOracle, NerLocationOracle};
pub use openai_service::ChatCompletionService;
pub use prompt_templates::{ChatMessage, PromptKind, PromptLibrary};
pub use watkins::{expand_signal_type, needs_recaption, WatkinsMetadata};

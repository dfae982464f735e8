//! Test Helper Utilities
//!
//! Shared fixtures and stubs for aspk-ingest integration tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod stubs;

pub use audio_generator::{generate_wav_bytes, wav_shape, AudioConfig};
pub use stubs::{StubCaptionService, StubFetcher, StubLocationOracle};

use aspk_ingest::models::Record;
use aspk_ingest::services::{
    AssetStore, AudioNormalizer, CaptionService, CaptioningClient, ChatMessage, LocalAssetStore,
    PromptKind, PromptLibrary, RetryPolicy,
};
use aspk_ingest::IngestConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Defaults rooted at `output_dir`, location filtering off
pub fn test_config(output_dir: &Path) -> IngestConfig {
    let mut config = IngestConfig::with_output_dir(output_dir);
    config.filter_location = false;
    config
}

pub fn record(id: usize, label: &str, url: &str) -> Record {
    Record {
        id,
        label: label.to_string(),
        description: None,
        url: url.to_string(),
        current_caption: None,
        species_count: 0,
        scientific_name: None,
    }
}

pub fn normalizer(config: &Arc<IngestConfig>, fetcher: Arc<StubFetcher>) -> AudioNormalizer {
    let store = LocalAssetStore::new(&config.output_dir).expect("asset store");
    normalizer_with_store(config, Arc::new(store), fetcher)
}

pub fn normalizer_with_store(
    config: &Arc<IngestConfig>,
    store: Arc<dyn AssetStore>,
    fetcher: Arc<StubFetcher>,
) -> AudioNormalizer {
    AudioNormalizer::new(Arc::clone(config), store, fetcher)
}

/// Prompt library with one-message templates for every use case
pub fn test_prompts() -> PromptLibrary {
    PromptLibrary::from_templates([
        (
            PromptKind::InitialCaption,
            vec![
                ChatMessage::new("system", "Caption animal sounds."),
                ChatMessage::new("user", "Species: {species}\nNotes: {description}"),
            ],
        ),
        (
            PromptKind::WatkinsCaption,
            vec![ChatMessage::new(
                "user",
                "{species} ({genus_species}) {signal_type} {behavior} {num_animals} {notes}",
            )],
        ),
        (
            PromptKind::Recaption,
            vec![ChatMessage::new("user", "Clean up: {caption}")],
        ),
    ])
}

/// Captioning client with the default 6-attempt policy and no rate limit
pub fn captioning_client(service: Arc<dyn CaptionService>) -> CaptioningClient {
    let retry = RetryPolicy::new(6, Duration::from_secs(1), Duration::from_secs(60));
    CaptioningClient::new(service, Arc::new(test_prompts()), retry)
}

//! aspk-ingest library interface
//!
//! Audio ingestion and captioning for the AnimalSpeak dataset. The binary is
//! a thin CLI over [`build_pipeline`] and [`workflow::recaption_dataset`];
//! integration tests assemble the same components around in-memory stubs.

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::config::{ConfigOverrides, IngestConfig};
pub use crate::error::{IngestError, IngestResult};

use crate::dataset::DatasetWriter;
use crate::services::{
    AudioNormalizer, CaptionDecisionEngine, CaptioningClient, ChatCompletionService,
    HttpAudioFetcher, LocalAssetStore, NerLocationOracle, PromptKind, PromptLibrary, RetryPolicy,
};
use crate::workflow::IngestPipeline;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Captioning client backed by the configured chat-completion endpoint
pub fn build_captioning_client(config: &IngestConfig) -> IngestResult<CaptioningClient> {
    let prompts = PromptLibrary::load(&config.prompts_dir)?;
    for kind in PromptKind::ALL {
        if !prompts.has(kind) {
            warn!(
                template = kind.file_stem(),
                prompts_dir = %config.prompts_dir.display(),
                "Prompt template missing; captions needing it fall back to the label"
            );
        }
    }
    if config.captioning_api_key.is_none() {
        warn!("No captioning API key configured; regenerated captions will fall back");
    }

    let service = ChatCompletionService::new(
        &config.captioning_base_url,
        config.captioning_model.clone(),
        config.captioning_api_key.clone(),
        config.request_timeout,
    )?;
    let retry = RetryPolicy::new(config.max_attempts, config.backoff_min, config.backoff_max);

    Ok(
        CaptioningClient::new(Arc::new(service), Arc::new(prompts), retry)
            .with_rate_limit(config.requests_per_second),
    )
}

/// Decision engine for the configured policy
///
/// Location filtering needs an NER endpoint; without one the lexical check
/// is used instead.
pub fn build_decision_engine(config: &IngestConfig) -> IngestResult<CaptionDecisionEngine> {
    if !config.filter_location {
        return Ok(CaptionDecisionEngine::lexical());
    }

    match &config.location_endpoint {
        Some(endpoint) => {
            let oracle = NerLocationOracle::new(
                endpoint.clone(),
                config.location_api_token.clone(),
                config.location_score_threshold,
                config.request_timeout,
            )?;
            Ok(CaptionDecisionEngine::with_location_filter(Arc::new(oracle)))
        }
        None => {
            warn!("Location filtering enabled but no [location].endpoint set; using lexical check");
            Ok(CaptionDecisionEngine::lexical())
        }
    }
}

/// Production pipeline writing assets under `config.output_dir` and the
/// dataset to `output`
pub fn build_pipeline(config: Arc<IngestConfig>, output: &Path) -> IngestResult<IngestPipeline> {
    let store = LocalAssetStore::new(&config.output_dir)?;
    let fetcher = HttpAudioFetcher::new(config.fetch_timeout)?;
    let normalizer = AudioNormalizer::new(Arc::clone(&config), Arc::new(store), Arc::new(fetcher));
    let decision = build_decision_engine(&config)?;
    let captioner = build_captioning_client(&config)?;
    let writer = DatasetWriter::new(output)?;

    info!(
        output_dir = %config.output_dir.display(),
        dataset = %output.display(),
        location_filter = decision.filters_location(),
        "Pipeline assembled"
    );

    Ok(IngestPipeline::new(config, normalizer, decision, captioner, writer))
}

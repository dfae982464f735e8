//! Run configuration for aspk-ingest
//!
//! Provides the immutable [`IngestConfig`] handed to every component at
//! construction. Values are resolved with CLI → ENV → TOML → default priority:
//! the TOML layer and defaults come from [`aspk_common::config::TomlConfig`],
//! CLI flags arrive as [`ConfigOverrides`].

use aspk_common::config::{resolve_api_key, resolve_output_dir, TomlConfig};
use aspk_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Command-line overrides applied on top of the TOML configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub checkpoint_interval: Option<usize>,
    pub duration_ms: Option<u64>,
    pub max_chunks: Option<usize>,
    pub resample_rate: Option<u32>,
    pub disable_location_filter: bool,
}

/// Fully resolved, immutable configuration for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory receiving normalized audio assets
    pub output_dir: PathBuf,
    /// Value of the `dataset` field of every output row
    pub dataset_name: String,

    // Acquisition
    pub species_count_threshold: u64,
    pub duration_ms: u64,
    pub resample_rate: u32,
    pub max_chunks: usize,
    pub min_trailing_chunk_ms: u64,
    pub max_probe_chunks: usize,
    pub fetch_timeout: Duration,

    // Decision
    pub filter_location: bool,
    pub location_endpoint: Option<String>,
    pub location_api_token: Option<String>,
    pub location_score_threshold: f32,

    // Captioning
    pub captioning_base_url: String,
    pub captioning_model: String,
    pub captioning_api_key: Option<String>,
    pub prompts_dir: PathBuf,
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub requests_per_second: u32,
    pub request_timeout: Duration,

    // Scheduling
    pub concurrency: usize,
    pub checkpoint_interval: usize,
}

impl IngestConfig {
    /// Build a configuration from TOML values plus CLI overrides
    pub fn resolve(toml: &TomlConfig, overrides: &ConfigOverrides) -> Self {
        let output_dir = resolve_output_dir(overrides.output_dir.as_deref(), toml);
        let ingest = &toml.ingest;
        let captioning = &toml.captioning;

        let config = Self {
            output_dir,
            dataset_name: ingest.dataset_name.clone(),
            species_count_threshold: ingest.species_count_threshold,
            duration_ms: overrides.duration_ms.unwrap_or(ingest.duration_ms),
            resample_rate: overrides.resample_rate.unwrap_or(ingest.resample_rate),
            max_chunks: overrides.max_chunks.unwrap_or(ingest.max_chunks),
            min_trailing_chunk_ms: ingest.min_trailing_chunk_ms,
            max_probe_chunks: ingest.max_probe_chunks,
            fetch_timeout: Duration::from_secs(ingest.fetch_timeout_secs),
            filter_location: ingest.filter_location && !overrides.disable_location_filter,
            location_endpoint: toml.location.endpoint.clone(),
            location_api_token: toml.location.api_token.clone(),
            location_score_threshold: toml.location.score_threshold,
            captioning_base_url: captioning.base_url.clone(),
            captioning_model: captioning.model.clone(),
            captioning_api_key: resolve_api_key(toml),
            prompts_dir: captioning.prompts_dir.clone(),
            max_attempts: captioning.max_attempts,
            backoff_min: Duration::from_secs(captioning.backoff_min_secs),
            backoff_max: Duration::from_secs(captioning.backoff_max_secs),
            requests_per_second: captioning.requests_per_second,
            request_timeout: Duration::from_secs(captioning.request_timeout_secs),
            concurrency: overrides.concurrency.unwrap_or(ingest.concurrency),
            checkpoint_interval: overrides
                .checkpoint_interval
                .unwrap_or(ingest.checkpoint_interval),
        };

        info!(
            output_dir = %config.output_dir.display(),
            concurrency = config.concurrency,
            checkpoint_interval = config.checkpoint_interval,
            duration_ms = config.duration_ms,
            resample_rate = config.resample_rate,
            filter_location = config.filter_location,
            "Resolved ingest configuration"
        );

        config
    }

    /// Defaults rooted at `output_dir`, ignoring environment and config files
    pub fn with_output_dir(output_dir: &Path) -> Self {
        let overrides = ConfigOverrides {
            output_dir: Some(output_dir.to_path_buf()),
            ..Default::default()
        };
        let mut config = Self::resolve(&TomlConfig::default(), &overrides);
        config.captioning_api_key = None;
        config
    }

    /// Reject values that would stall or break a run
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 6] = [
            (self.concurrency == 0, "concurrency must be at least 1"),
            (self.duration_ms == 0, "duration_ms must be greater than 0"),
            (self.checkpoint_interval == 0, "checkpoint_interval must be at least 1"),
            (self.resample_rate == 0, "resample_rate must be greater than 0"),
            (self.max_chunks == 0, "max_chunks must be at least 1"),
            (self.max_attempts == 0, "captioning.max_attempts must be at least 1"),
        ];

        for (failed, message) in checks {
            if failed {
                return Err(Error::Config(message.to_string()));
            }
        }

        if self.max_chunks > self.max_probe_chunks {
            return Err(Error::Config(format!(
                "max_chunks ({}) exceeds max_probe_chunks ({}); re-runs would miss chunks",
                self.max_chunks, self.max_probe_chunks
            )));
        }

        if self.backoff_min > self.backoff_max {
            return Err(Error::Config(
                "captioning.backoff_min_secs exceeds backoff_max_secs".to_string(),
            ));
        }

        Ok(())
    }

    /// Target length of one clip or chunk in output-rate frames
    pub fn target_frames(&self) -> usize {
        (self.duration_ms * self.resample_rate as u64 / 1000) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_beat_toml() {
        let mut toml = TomlConfig::default();
        toml.ingest.concurrency = 6;
        toml.ingest.duration_ms = 5_000;

        let overrides = ConfigOverrides {
            output_dir: Some(PathBuf::from("/tmp/aspk-out")),
            concurrency: Some(3),
            disable_location_filter: true,
            ..Default::default()
        };

        let config = IngestConfig::resolve(&toml, &overrides);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.duration_ms, 5_000);
        assert!(!config.filter_location);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/aspk-out"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let base = IngestConfig::with_output_dir(Path::new("/tmp/aspk-out"));
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.checkpoint_interval = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.duration_ms = 0;
        assert!(config.validate().is_err());

        let mut config = base;
        config.resample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_chunks_beyond_resume_range() {
        let mut config = IngestConfig::with_output_dir(Path::new("/tmp/aspk-out"));
        config.max_chunks = 8;
        config.max_probe_chunks = 5;
        assert!(config.validate().is_err());

        config.max_probe_chunks = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_frames() {
        let config = IngestConfig::with_output_dir(Path::new("/tmp/aspk-out"));
        assert_eq!(config.target_frames(), 480_000);
    }
}

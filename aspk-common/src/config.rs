//! Configuration loading and output folder resolution
//!
//! Bootstrap configuration lives in a TOML file. Every section is optional and
//! falls back to compiled defaults, so a missing or partial file never stops
//! an ingestion run from starting.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`ASPK_OUTPUT_DIR`, `OPENAI_API_KEY`)
//! 3. TOML configuration file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the asset output directory
pub const OUTPUT_DIR_ENV: &str = "ASPK_OUTPUT_DIR";

/// Environment variable holding the captioning service API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory receiving normalized audio assets
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Acquisition, decision and scheduling thresholds
    #[serde(default)]
    pub ingest: IngestSection,

    /// Captioning service connection and retry policy
    #[serde(default)]
    pub captioning: CaptioningSection,

    /// Location-mention oracle
    #[serde(default)]
    pub location: LocationSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// `[ingest]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSection {
    /// Labels with more prior observations than this are "well represented"
    #[serde(default = "default_species_count_threshold")]
    pub species_count_threshold: u64,
    /// Target clip / chunk length
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// Output sample rate
    #[serde(default = "default_resample_rate")]
    pub resample_rate: u32,
    /// Maximum chunks produced from one long clip
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// Trailing chunks shorter than this are dropped (unless the only chunk)
    #[serde(default = "default_min_trailing_chunk_ms")]
    pub min_trailing_chunk_ms: u64,
    /// Number of indexed chunk files probed by the resume check
    #[serde(default = "default_max_probe_chunks")]
    pub max_probe_chunks: usize,
    /// Worker pool size
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Completed records between checkpoint writes
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    /// Hard timeout for a single audio download
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Use the location-leak heuristic instead of the lexical label check
    #[serde(default = "default_true")]
    pub filter_location: bool,
    /// Value written to the `dataset` column of every output row
    #[serde(default = "default_dataset_name")]
    pub dataset_name: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            species_count_threshold: default_species_count_threshold(),
            duration_ms: default_duration_ms(),
            resample_rate: default_resample_rate(),
            max_chunks: default_max_chunks(),
            min_trailing_chunk_ms: default_min_trailing_chunk_ms(),
            max_probe_chunks: default_max_probe_chunks(),
            concurrency: default_concurrency(),
            checkpoint_interval: default_checkpoint_interval(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            filter_location: true,
            dataset_name: default_dataset_name(),
        }
    }
}

/// `[captioning]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptioningSection {
    /// Chat-completions compatible base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (prefer the `OPENAI_API_KEY` environment variable)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Directory holding `<use-case>.jsonl` conversation templates
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Lower bound of the randomized exponential backoff
    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: u64,
    /// Upper bound of the randomized exponential backoff
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Client-side request rate ceiling
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// HTTP timeout for one completion request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CaptioningSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            prompts_dir: default_prompts_dir(),
            max_attempts: default_max_attempts(),
            backoff_min_secs: default_backoff_min_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// `[location]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSection {
    /// Token-classification endpoint; location filtering falls back to the
    /// lexical check when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint
    #[serde(default)]
    pub api_token: Option<String>,
    /// Minimum entity score counted as a location mention
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_species_count_threshold() -> u64 {
    30
}
fn default_duration_ms() -> u64 {
    10_000
}
fn default_resample_rate() -> u32 {
    48_000
}
fn default_max_chunks() -> usize {
    4
}
fn default_min_trailing_chunk_ms() -> u64 {
    2_000
}
fn default_max_probe_chunks() -> usize {
    5
}
fn default_concurrency() -> usize {
    2
}
fn default_checkpoint_interval() -> usize {
    100
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_dataset_name() -> String {
    "inaturalist".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}
fn default_max_attempts() -> u32 {
    6
}
fn default_backoff_min_secs() -> u64 {
    1
}
fn default_backoff_max_secs() -> u64 {
    60
}
fn default_requests_per_second() -> u32 {
    3
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_score_threshold() -> f32 {
    0.92
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load TOML configuration, degrading to defaults when the file is missing
///
/// A file that exists but fails to parse is still an error.
pub fn load_toml_config_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let candidate = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };

    match candidate {
        Some(p) if p.exists() => load_toml_config(&p),
        Some(p) => {
            warn!(
                "Config file not found at {}, using built-in defaults",
                p.display()
            );
            Ok(TomlConfig::default())
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Write configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Platform config file location (`~/.config/animalspeak/aspk-ingest.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("animalspeak").join("aspk-ingest.toml"))
}

/// Resolve the asset output directory
///
/// **Priority:** CLI → ENV → TOML → compiled default
pub fn resolve_output_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(OUTPUT_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.output_dir {
        return path.clone();
    }

    default_output_dir()
}

/// OS-dependent default output directory
fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("animalspeak").join("audios"))
        .unwrap_or_else(|| PathBuf::from("./audios"))
}

/// Resolve the captioning API key
///
/// **Priority:** ENV → TOML. Returns `None` when neither holds a usable key.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .captioning
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("API key found in both environment and TOML. Using environment.");
    }

    env_key.or(toml_key)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

//! Audio Acquisition & Normalizer
//!
//! Turns a [`Record`]'s URL into zero or more normalized mono WAV assets.
//!
//! **Resume check:** asset keys are a pure function of the URL and chunk
//! index, so a store that already holds the expected keys short-circuits
//! the download. No separate ledger is kept.
//!
//! **Duration policy** (all lengths in native-rate frames until resampling):
//! - clip ≤ duration: written whole, no padding
//! - clip > duration, well-represented label: first `duration` only
//! - clip > duration, under-represented label: up to `max_chunks` chunks of
//!   `duration`; a short trailing chunk is dropped unless it is the first,
//!   otherwise zero-padded to full length

use crate::config::IngestConfig;
use crate::error::{AcquireError, FetchError};
use crate::models::{AudioAsset, Record};
use crate::services::asset_store::AssetStore;
use crate::services::audio_fetcher::AudioFetcher;
use crate::utils::{decode_audio_bytes, encode_wav_mono, probe_wav, resample_mono};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deterministic store keys derived from an audio URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKeys {
    stem: String,
    segment: String,
    extension: Option<String>,
}

impl AssetKeys {
    /// Derive keys from the URL's final path segment (query string ignored)
    pub fn from_url(url: &str) -> Result<Self, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let segment = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FetchError::InvalidUrl(format!("no file name in {}", url)))?
            .replace('\\', "_");

        let (stem, extension) = match segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_lowercase())),
            _ => (segment.clone(), None),
        };

        if stem == "." || stem == ".." {
            return Err(FetchError::InvalidUrl(format!("no file name in {}", url)));
        }

        Ok(Self {
            stem,
            segment,
            extension,
        })
    }

    /// Single-file output: `<stem>.wav`
    pub fn canonical(&self) -> String {
        format!("{}.wav", self.stem)
    }

    /// Chunked output: `<stem>_<index>.wav`
    pub fn chunk(&self, index: usize) -> String {
        format!("{}_{}.wav", self.stem, index)
    }

    /// Raw download, kept apart from outputs even when the source is WAV
    pub fn raw(&self) -> String {
        format!("{}.download", self.segment)
    }

    /// Source file extension, used as a decoder hint
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}

/// A slice of the decoded clip, in native-rate frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    /// Pad / trim to exactly one duration after resampling
    pub fit_to_duration: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPlan {
    /// Nothing decodable
    Empty,
    /// One output under the canonical key
    Single(Segment),
    /// Indexed outputs, in order
    Chunks(Vec<Segment>),
}

/// Thresholds of the duration policy
#[derive(Debug, Clone, Copy)]
pub struct SegmentPolicy {
    pub species_count_threshold: u64,
    pub duration_ms: u64,
    pub max_chunks: usize,
    pub min_trailing_chunk_ms: u64,
}

impl From<&IngestConfig> for SegmentPolicy {
    fn from(config: &IngestConfig) -> Self {
        Self {
            species_count_threshold: config.species_count_threshold,
            duration_ms: config.duration_ms,
            max_chunks: config.max_chunks,
            min_trailing_chunk_ms: config.min_trailing_chunk_ms,
        }
    }
}

fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

/// Decide how a clip of `total_frames` at `sample_rate` is cut up
pub fn plan_segments(
    total_frames: usize,
    sample_rate: u32,
    species_count: u64,
    policy: &SegmentPolicy,
) -> SegmentPlan {
    if total_frames == 0 {
        return SegmentPlan::Empty;
    }

    let duration = ms_to_frames(policy.duration_ms, sample_rate).max(1);

    if total_frames <= duration {
        return SegmentPlan::Single(Segment {
            start: 0,
            end: total_frames,
            fit_to_duration: false,
        });
    }

    if species_count > policy.species_count_threshold {
        return SegmentPlan::Single(Segment {
            start: 0,
            end: duration,
            fit_to_duration: true,
        });
    }

    let min_trailing = ms_to_frames(policy.min_trailing_chunk_ms, sample_rate);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_frames && chunks.len() < policy.max_chunks {
        let end = (start + duration).min(total_frames);
        if end - start < min_trailing && !chunks.is_empty() {
            break;
        }
        chunks.push(Segment {
            start,
            end,
            fit_to_duration: true,
        });
        start += duration;
    }

    SegmentPlan::Chunks(chunks)
}

/// Fetches, decodes, slices, resamples and stores audio for one record
pub struct AudioNormalizer {
    config: Arc<IngestConfig>,
    store: Arc<dyn AssetStore>,
    fetcher: Arc<dyn AudioFetcher>,
}

impl AudioNormalizer {
    pub fn new(
        config: Arc<IngestConfig>,
        store: Arc<dyn AssetStore>,
        fetcher: Arc<dyn AudioFetcher>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    /// Produce the normalized assets for `record`
    ///
    /// Returns existing assets without any network call when the resume
    /// check finds them. An empty list means no usable audio.
    pub async fn acquire(&self, record: &Record) -> Result<Vec<AudioAsset>, AcquireError> {
        let keys = AssetKeys::from_url(&record.url)?;

        if let Some(existing) = self.existing_assets(record, &keys) {
            debug!(
                record_id = record.id,
                assets = existing.len(),
                "Assets already present, skipping download"
            );
            return Ok(existing);
        }

        // A canonical file that failed the resume check is stale
        let canonical = keys.canonical();
        if self.store.exists(&canonical) {
            self.store.delete(&canonical)?;
        }

        let bytes = self.fetcher.fetch(&record.url).await?;
        let raw_key = keys.raw();
        self.store.put(&raw_key, &bytes)?;

        let store = Arc::clone(&self.store);
        let policy = SegmentPolicy::from(self.config.as_ref());
        let target = OutputFormat {
            sample_rate: self.config.resample_rate,
            fitted_frames: self.config.target_frames(),
        };
        let species_count = record.species_count;
        let record_id = record.id;
        let task_keys = keys.clone();

        let normalized = tokio::task::spawn_blocking(move || {
            normalize(
                bytes,
                &task_keys,
                store.as_ref(),
                &policy,
                target,
                species_count,
                record_id,
            )
        })
        .await
        .map_err(|e| AcquireError::Task(e.to_string()))
        .and_then(|result| result);

        let assets = match normalized {
            Ok(assets) => assets,
            Err(e) => {
                if let Err(delete_err) = self.store.delete(&raw_key) {
                    warn!(
                        key = %raw_key,
                        error = %delete_err,
                        "Failed to remove raw download"
                    );
                }
                return Err(e);
            }
        };

        self.store.delete(&raw_key)?;

        info!(
            record_id = record.id,
            label = %record.label,
            assets = assets.len(),
            "Audio normalized"
        );

        Ok(assets)
    }

    fn existing_assets(&self, record: &Record, keys: &AssetKeys) -> Option<Vec<AudioAsset>> {
        if record.species_count > self.config.species_count_threshold {
            return self
                .load_existing(&keys.canonical(), record.id)
                .map(|asset| vec![asset]);
        }

        // Scan at least as far as a fresh run could have written
        let scan_limit = self.config.max_chunks.max(self.config.max_probe_chunks);
        let chunks: Vec<AudioAsset> = (0..scan_limit)
            .filter_map(|i| self.load_existing(&keys.chunk(i), record.id))
            .collect();
        if !chunks.is_empty() {
            return Some(chunks);
        }

        // Short clips of under-represented labels are written unsuffixed
        self.load_existing(&keys.canonical(), record.id)
            .map(|asset| vec![asset])
    }

    fn load_existing(&self, key: &str, record_id: usize) -> Option<AudioAsset> {
        if !self.store.exists(key) {
            return None;
        }

        let header = self
            .store
            .get(key)
            .map_err(|e| e.to_string())
            .and_then(|bytes| probe_wav(&bytes).map_err(|e| e.to_string()));

        match header {
            Ok((frames, sample_rate)) => Some(AudioAsset::from_frames(
                self.store.path_for(key),
                frames,
                sample_rate,
                record_id,
            )),
            Err(e) => {
                warn!(key, error = %e, "Existing asset unreadable, treating as absent");
                None
            }
        }
    }
}

/// Output rate and the exact length of a fitted clip at that rate
#[derive(Debug, Clone, Copy)]
struct OutputFormat {
    sample_rate: u32,
    fitted_frames: usize,
}

/// Blocking half of acquisition: decode → plan → resample → encode → store
fn normalize(
    bytes: Vec<u8>,
    keys: &AssetKeys,
    store: &dyn AssetStore,
    policy: &SegmentPolicy,
    target: OutputFormat,
    species_count: u64,
    record_id: usize,
) -> Result<Vec<AudioAsset>, AcquireError> {
    let decoded = decode_audio_bytes(bytes, keys.extension())?;
    let plan = plan_segments(
        decoded.samples.len(),
        decoded.sample_rate,
        species_count,
        policy,
    );

    let outputs: Vec<(String, Segment)> = match plan {
        SegmentPlan::Empty => {
            debug!(record_id, "No decodable audio");
            return Ok(Vec::new());
        }
        SegmentPlan::Single(segment) => vec![(keys.canonical(), segment)],
        SegmentPlan::Chunks(segments) => segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| (keys.chunk(i), segment))
            .collect(),
    };

    let mut assets = Vec::with_capacity(outputs.len());
    for (key, segment) in outputs {
        let slice = decoded.samples[segment.start..segment.end].to_vec();
        let mut samples = resample_mono(slice, decoded.sample_rate, target.sample_rate)?;
        if segment.fit_to_duration {
            samples.resize(target.fitted_frames, 0.0);
        }

        let wav = encode_wav_mono(&samples, target.sample_rate)?;
        let path = store.put(&key, &wav)?;
        assets.push(AudioAsset::from_frames(
            path,
            samples.len() as u64,
            target.sample_rate,
            record_id,
        ));
    }

    Ok(assets)
}

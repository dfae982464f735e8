//! Audio acquisition: resume check, chunking policy and failure mapping

mod helpers;

use aspk_ingest::error::AcquireError;
use aspk_ingest::services::MemoryAssetStore;
use helpers::*;
use std::sync::Arc;
use tempfile::TempDir;

const URL: &str = "https://audio.test/sounds/clip.wav";

fn setup(clip: &AudioConfig) -> (TempDir, Arc<aspk_ingest::IngestConfig>, Arc<StubFetcher>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(temp_dir.path()));
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.serve(URL, generate_wav_bytes(clip).unwrap());
    (temp_dir, config, fetcher)
}

#[tokio::test]
async fn test_uncommon_label_splits_into_full_chunks() {
    // DURATION_MS * 3 + 1500
    let clip = AudioConfig::with_duration_ms(31_500);
    let (_temp_dir, config, fetcher) = setup(&clip);
    let normalizer = normalizer(&config, Arc::clone(&fetcher));

    let assets = normalizer.acquire(&record(0, "Gray Seal", URL)).await.unwrap();

    assert_eq!(assets.len(), 3);
    for (i, asset) in assets.iter().enumerate() {
        assert!(asset.path.ends_with(format!("clip_{}.wav", i)));
        assert_eq!(wav_shape(&asset.path).unwrap(), (480_000, 48_000));
        assert_eq!(asset.duration_ms, 10_000);
        assert_eq!(asset.source_record_id, 0);
    }
    assert!(!config.output_dir.join("clip_3.wav").exists());
    assert!(!config.output_dir.join("clip.wav.download").exists());
}

#[tokio::test]
async fn test_common_label_truncates_to_one_clip() {
    let clip = AudioConfig::with_duration_ms(31_500);
    let (_temp_dir, config, fetcher) = setup(&clip);
    let normalizer = normalizer(&config, fetcher);

    let mut gray_seal = record(0, "Gray Seal", URL);
    gray_seal.species_count = 31;
    let assets = normalizer.acquire(&gray_seal).await.unwrap();

    assert_eq!(assets.len(), 1);
    assert!(assets[0].path.ends_with("clip.wav"));
    assert_eq!(wav_shape(&assets[0].path).unwrap(), (480_000, 48_000));
}

#[tokio::test]
async fn test_second_acquire_makes_no_network_call() {
    let clip = AudioConfig::with_duration_ms(31_500);
    let (_temp_dir, config, fetcher) = setup(&clip);
    let store = Arc::new(MemoryAssetStore::new());
    let normalizer = normalizer_with_store(&config, store.clone(), Arc::clone(&fetcher));
    let gray_seal = record(0, "Gray Seal", URL);

    let first = normalizer.acquire(&gray_seal).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(store.keys(), vec!["clip_0.wav", "clip_1.wav", "clip_2.wav"]);

    let second = normalizer.acquire(&gray_seal).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_resume_finds_every_chunk_up_to_max_chunks() {
    let clip = AudioConfig::with_duration_ms(8_500);
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path());
    config.duration_ms = 1_000;
    config.min_trailing_chunk_ms = 500;
    config.max_chunks = 8;
    config.max_probe_chunks = 5;
    let config = Arc::new(config);
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.serve(URL, generate_wav_bytes(&clip).unwrap());
    let normalizer = normalizer(&config, Arc::clone(&fetcher));
    let seal = record(0, "Gray Seal", URL);

    let first = normalizer.acquire(&seal).await.unwrap();
    assert_eq!(first.len(), 8);

    let second = normalizer.acquire(&seal).await.unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_short_clip_is_resampled_and_resumable() {
    let clip = AudioConfig {
        duration_ms: 2_000,
        sample_rate: 16_000,
        ..Default::default()
    };
    let (_temp_dir, config, fetcher) = setup(&clip);
    let normalizer = normalizer(&config, Arc::clone(&fetcher));
    let seal = record(3, "Harp Seal", URL);

    let assets = normalizer.acquire(&seal).await.unwrap();
    assert_eq!(assets.len(), 1);
    assert!(assets[0].path.ends_with("clip.wav"));
    assert_eq!(wav_shape(&assets[0].path).unwrap(), (96_000, 48_000));

    // Unsuffixed short clips are found by the resume check too
    let again = normalizer.acquire(&seal).await.unwrap();
    assert_eq!(again, assets);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_fetch_error_is_record_failure() {
    let (_temp_dir, config, fetcher) = setup(&AudioConfig::default());
    fetcher.fail(URL);
    let normalizer = normalizer(&config, fetcher);

    let err = normalizer
        .acquire(&record(0, "Gray Seal", URL))
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Fetch(_)));
    assert!(err.is_record_failure());
}

#[tokio::test]
async fn test_undecodable_download_is_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(temp_dir.path()));
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.serve(URL, b"<html>not found</html>".to_vec());
    let normalizer = normalizer(&config, fetcher);

    let err = normalizer
        .acquire(&record(0, "Gray Seal", URL))
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Decode(_)));
    assert!(!config.output_dir.join("clip.wav").exists());
    assert!(!config.output_dir.join("clip.wav.download").exists());
}

#[tokio::test]
async fn test_failed_normalization_leaves_no_raw_download() {
    let temp_dir = TempDir::new().unwrap();
    let config = Arc::new(test_config(temp_dir.path()));
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.serve(URL, b"<html>rate limited</html>".to_vec());
    let store = Arc::new(MemoryAssetStore::new());
    let normalizer = normalizer_with_store(&config, store.clone(), fetcher);

    let err = normalizer
        .acquire(&record(0, "Gray Seal", URL))
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Decode(_)));
    assert!(store.keys().is_empty());
}

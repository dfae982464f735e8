//! Audio Test Fixture Generator
//!
//! Synthesizes WAV clips in memory so stub fetchers can serve them

use std::io::Cursor;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency_hz: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2_000,
            sample_rate: 48_000,
            channels: 1,
            frequency_hz: 440.0,
        }
    }
}

impl AudioConfig {
    pub fn with_duration_ms(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> usize {
        (self.duration_ms * self.sample_rate as u64 / 1000) as usize
    }
}

/// Encode a sine tone at 30% amplitude as 16-bit PCM WAV bytes
pub fn generate_wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for i in 0..config.frames() {
            let t = i as f32 / config.sample_rate as f32;
            let sample = (0.3
                * (2.0 * std::f32::consts::PI * config.frequency_hz * t).sin()
                * i16::MAX as f32) as i16;
            for _ in 0..config.channels {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Frames and sample rate of a WAV file on disk
pub fn wav_shape(path: &std::path::Path) -> anyhow::Result<(u32, u32)> {
    let reader = hound::WavReader::open(path)?;
    Ok((reader.duration(), reader.spec().sample_rate))
}

//! Audio Decoding Utilities
//!
//! **Purpose:** Decode downloaded audio bytes to mono f32 PCM samples
//!
//! Uses symphonia for format-agnostic decoding (MP3, FLAC, AAC, WAV, OGG, ...)

use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use thiserror::Error;

/// Decoding failures (corrupt or unsupported input)
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported or unrecognized audio format: {0}")]
    Unsupported(String),

    #[error("No audio track found")]
    NoTrack,

    #[error("Sample rate unknown")]
    UnknownSampleRate,

    #[error("Failed to create decoder: {0}")]
    Codec(String),

    #[error("Error reading packet: {0}")]
    Packet(String),
}

/// Decoded audio result
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
}

impl DecodedAudio {
    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Decode an in-memory audio file to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Probe format using symphonia (extension used as a hint only)
/// 2. Find default audio track and create its decoder
/// 3. Decode all packets, averaging channels to mono
///
/// Packets that fail to decode are skipped; a stream that yields no
/// samples at all comes back with an empty `samples` vector.
pub fn decode_audio_bytes(
    bytes: Vec<u8>,
    extension: Option<&str>,
) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    tracing::debug!(sample_rate, channels = channel_count, "Audio stream info");

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => all_samples.extend(mix_to_mono(&decoded)),
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                tracing::debug!(error = msg, "Skipping undecodable packet");
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        }
    }

    tracing::debug!(
        total_samples = all_samples.len(),
        skipped_packets,
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
    })
}

/// Average all channels of a decoded buffer into mono f32
fn mix_to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => average_channels(&**buf),
        AudioBufferRef::F64(buf) => average_channels(&**buf),
        AudioBufferRef::U8(buf) => average_channels(&**buf),
        AudioBufferRef::U16(buf) => average_channels(&**buf),
        AudioBufferRef::U24(buf) => average_channels(&**buf),
        AudioBufferRef::U32(buf) => average_channels(&**buf),
        AudioBufferRef::S8(buf) => average_channels(&**buf),
        AudioBufferRef::S16(buf) => average_channels(&**buf),
        AudioBufferRef::S24(buf) => average_channels(&**buf),
        AudioBufferRef::S32(buf) => average_channels(&**buf),
    }
}

fn average_channels<S>(buf: &symphonia::core::audio::AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count().max(1);
    let num_frames = buf.frames();
    let mut mono = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        mono.push(sum / num_channels as f32);
    }

    mono
}

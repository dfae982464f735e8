//! Audio utilities for aspk-ingest

pub mod audio_decoder;
pub mod resampler;
pub mod wav_encoder;

pub use audio_decoder::{decode_audio_bytes, DecodeError, DecodedAudio};
pub use resampler::{resample_mono, ResampleError};
pub use wav_encoder::{encode_wav_mono, probe_wav};

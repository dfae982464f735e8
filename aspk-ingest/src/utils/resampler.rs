//! Mono resampling using rubato SincFixedIn

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("Resampling failed: {0}")]
pub struct ResampleError(String);

/// Resample mono PCM samples from `source_rate` to `target_rate`
///
/// Returns the input unchanged when the rates already match. The filter
/// delay is removed and the tail flushed, so the output holds
/// `round(len * target_rate / source_rate)` samples.
///
/// # Algorithm
/// - Sinc interpolation with BlackmanHarris2 window
/// - 256-tap filter, 0.95 cutoff frequency to prevent aliasing
/// - Single pass over the whole input plus one partial flush
pub fn resample_mono(
    samples: Vec<f32>,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }

    let num_frames = samples.len();
    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (num_frames as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, num_frames, 1)
        .map_err(|e| ResampleError(e.to_string()))?;

    let delay = resampler.output_delay();
    let input = vec![samples];

    let mut output = resampler
        .process(&input, None)
        .map_err(|e| ResampleError(e.to_string()))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush until the delayed tail is out
    while output.len() < expected + delay {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| ResampleError(e.to_string()))?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    let mut output: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();
    output.resize(expected, 0.0);

    debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
        num_frames, source_rate, output.len(), target_rate
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, rate: u32, freq: f64) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                let t = i as f64 / rate as f64;
                (0.5 * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect()
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = sine(1000, 48_000, 440.0);
        let output = resample_mono(input.clone(), 48_000, 48_000).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_upsample_length_is_exact() {
        let output = resample_mono(sine(22_050, 22_050, 440.0), 22_050, 48_000).unwrap();
        assert_eq!(output.len(), 48_000);

        // Sinc ringing can overshoot slightly
        assert!(output.iter().all(|s| s.abs() <= 0.6));
    }

    #[test]
    fn test_downsample_length_is_exact() {
        let output = resample_mono(sine(48_000, 48_000, 440.0), 48_000, 44_100).unwrap();
        assert_eq!(output.len(), 44_100);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_mono(Vec::new(), 44_100, 48_000).unwrap().is_empty());
    }
}

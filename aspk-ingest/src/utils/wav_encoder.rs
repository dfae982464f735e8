//! In-memory 16-bit PCM WAV encoding via hound

use std::io::Cursor;

/// Encode mono f32 samples as a 16-bit PCM WAV file
pub fn encode_wav_mono(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Read `(frames, sample_rate)` from a WAV header
pub fn probe_wav(bytes: &[u8]) -> Result<(u64, u32), hound::Error> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    Ok((reader.duration() as u64, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_probe_header() {
        let samples = vec![0.25f32; 4_800];
        let bytes = encode_wav_mono(&samples, 48_000).unwrap();

        let (frames, rate) = probe_wav(&bytes).unwrap();
        assert_eq!(frames, 4_800);
        assert_eq!(rate, 48_000);
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let bytes = encode_wav_mono(&[2.0, -2.0], 8_000).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn test_probe_rejects_non_wav() {
        assert!(probe_wav(b"RIFX....").is_err());
    }
}

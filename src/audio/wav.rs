//! WAV writing with hound
//!
//! Used for the intermediate files handed to the external toolchain.

use crate::error::{Result, StemmixError};
use crate::types::AudioBuffer;
use std::path::Path;

/// Write a buffer as 32-bit float WAV (lossless intermediate)
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let to_output_error = |e: hound::Error| StemmixError::OutputError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_output_error)?;
    for sample in &buffer.samples {
        writer.write_sample(*sample).map_err(to_output_error)?;
    }
    writer.finalize().map_err(to_output_error)?;
    Ok(())
}

/// Write a buffer as 16-bit PCM WAV, clamping to the valid range
#[cfg(test)]
pub(crate) fn write_wav_i16(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let to_output_error = |e: hound::Error| StemmixError::OutputError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_output_error)?;
    for sample in &buffer.samples {
        let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s).map_err(to_output_error)?;
    }
    writer.finalize().map_err(to_output_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode;
    use tempfile::TempDir;

    #[test]
    fn test_float_wav_is_decodable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mix.wav");
        let buffer = AudioBuffer::new(vec![0.25, -0.25, 0.5, -0.5], 22050, 2);

        write_wav(&path, &buffer).unwrap();
        let decoded = decode(&path).unwrap();

        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.samples, buffer.samples);
    }

    #[test]
    fn test_i16_wav_clamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("loud.wav");
        let buffer = AudioBuffer::new(vec![2.0, -2.0], 44100, 1);

        write_wav_i16(&path, &buffer).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, i16::MIN]);
    }
}

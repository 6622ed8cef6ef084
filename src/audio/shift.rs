//! Pitch shifting by playback-rate reinterpretation
//!
//! The buffer is treated as if recorded at `rate * ratio` and converted back
//! to `rate`. Pitch moves by `ratio` and duration scales by `1 / ratio`;
//! there is no time-stretch compensation.

use crate::audio::{decode, resample, wav};
use crate::error::{Result, StemmixError};
use crate::types::AudioBuffer;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Pitch shift backend
pub trait PitchShifter: Send + Sync {
    /// Shift a buffer by `ratio`, returning a new buffer at the original rate
    fn shift(&self, buffer: &AudioBuffer, ratio: f64) -> Result<AudioBuffer>;

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}

/// Shift through the external toolchain (`asetrate` + `aresample`)
pub struct FfmpegShifter {
    ffmpeg: PathBuf,
}

impl FfmpegShifter {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl PitchShifter for FfmpegShifter {
    fn shift(&self, buffer: &AudioBuffer, ratio: f64) -> Result<AudioBuffer> {
        let shifted_rate = shifted_rate(buffer.sample_rate, ratio)?;

        let temp_dir = tempfile::tempdir()?;
        let input = temp_dir.path().join("shift_in.wav");
        let output = temp_dir.path().join("shift_out.wav");
        wav::write_wav(&input, buffer)?;

        let filter = format!("asetrate={},aresample={}", shifted_rate, buffer.sample_rate);
        debug!("Running {} -af {}", self.ffmpeg.display(), filter);

        run_ffmpeg(&self.ffmpeg, |cmd| {
            cmd.arg("-i")
                .arg(&input)
                .args(["-af", filter.as_str(), "-c:a", "pcm_f32le"])
                .arg(&output);
        })?;

        decode(&output)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// In-process shift using the crate's resampler
///
/// Lower fidelity than the external toolchain, but always available.
pub struct InProcessShifter;

impl PitchShifter for InProcessShifter {
    fn shift(&self, buffer: &AudioBuffer, ratio: f64) -> Result<AudioBuffer> {
        let shifted_rate = shifted_rate(buffer.sample_rate, ratio)?;
        let reinterpreted = AudioBuffer::new(buffer.samples.clone(), shifted_rate, buffer.channels);
        Ok(resample::resample_buffer(&reinterpreted, buffer.sample_rate))
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

fn shifted_rate(sample_rate: u32, ratio: f64) -> Result<u32> {
    let rate = (sample_rate as f64 * ratio).round();
    if !ratio.is_finite() || ratio <= 0.0 || rate < 1.0 || rate > u32::MAX as f64 {
        return Err(StemmixError::encoding_unavailable(
            "resampler",
            format!("cannot shift {} Hz audio by ratio {}", sample_rate, ratio),
        ));
    }
    Ok(rate as u32)
}

/// Run ffmpeg quietly, mapping spawn and exit failures to `EncodingUnavailable`
pub(crate) fn run_ffmpeg(ffmpeg: &Path, configure: impl FnOnce(&mut Command)) -> Result<()> {
    let mut cmd = Command::new(ffmpeg);
    cmd.args(["-y", "-hide_banner", "-loglevel", "error"]);
    configure(&mut cmd);

    let output = cmd
        .output()
        .map_err(|e| {
            StemmixError::encoding_unavailable(
                ffmpeg.display().to_string(),
                format!("failed to start: {}", e),
            )
        })?;

    if !output.status.success() {
        return Err(StemmixError::encoding_unavailable(
            ffmpeg.display().to_string(),
            format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(())
}

/// Outcome of applying a pitch shift with fallbacks
#[derive(Debug)]
pub struct ShiftOutcome {
    pub buffer: AudioBuffer,
    /// Backend that produced the buffer, `None` if the shift was skipped
    pub backend: Option<&'static str>,
    pub warnings: Vec<String>,
}

/// Ordered list of pitch shift backends, tried until one succeeds
pub struct ShiftChain {
    backends: Vec<Box<dyn PitchShifter>>,
}

impl ShiftChain {
    pub fn new(backends: Vec<Box<dyn PitchShifter>>) -> Self {
        Self { backends }
    }

    /// External toolchain first when available, in-process otherwise
    pub fn for_toolchain(ffmpeg: &Path, external_toolchain: bool) -> Self {
        let mut backends: Vec<Box<dyn PitchShifter>> = Vec::new();
        if external_toolchain {
            backends.push(Box::new(FfmpegShifter::new(ffmpeg)));
        }
        backends.push(Box::new(InProcessShifter));
        Self::new(backends)
    }

    /// Apply `ratio` to a buffer
    ///
    /// A ratio of exactly 1.0 passes the buffer through untouched. If every
    /// backend fails the unshifted buffer is returned with a warning; a
    /// pitch shift failure never fails the caller.
    pub fn apply(&self, buffer: &AudioBuffer, ratio: f64) -> ShiftOutcome {
        if ratio == 1.0 {
            return ShiftOutcome {
                buffer: buffer.clone(),
                backend: None,
                warnings: Vec::new(),
            };
        }

        let mut warnings = Vec::new();
        for backend in &self.backends {
            match backend.shift(buffer, ratio) {
                Ok(shifted) => {
                    debug!(
                        "Pitch shifted with {}: {:.2}s -> {:.2}s",
                        backend.name(),
                        buffer.duration,
                        shifted.duration
                    );
                    return ShiftOutcome {
                        buffer: shifted,
                        backend: Some(backend.name()),
                        warnings,
                    };
                }
                Err(e) => {
                    let message = if e.is_degradable() {
                        format!("Pitch shift backend {} unavailable: {}", backend.name(), e)
                    } else {
                        format!("Pitch shift with {} failed: {}", backend.name(), e)
                    };
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
        }

        warnings.push("Pitch shift skipped, keeping unshifted mix".to_string());
        ShiftOutcome {
            buffer: buffer.clone(),
            backend: None,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(seconds: f64, sample_rate: u32) -> AudioBuffer {
        let frames = (seconds * sample_rate as f64) as usize;
        let samples = (0..frames)
            .flat_map(|i| {
                let s = (i as f32 * 0.05).sin() * 0.5;
                [s, s]
            })
            .collect();
        AudioBuffer::new(samples, sample_rate, 2)
    }

    struct Failing;

    impl PitchShifter for Failing {
        fn shift(&self, _buffer: &AudioBuffer, _ratio: f64) -> Result<AudioBuffer> {
            Err(StemmixError::encoding_unavailable("ffmpeg", "not installed"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_in_process_shift_scales_duration() {
        let buffer = tone(1.0, 44100);
        let ratio = 392.0 / 261.63;
        let shifted = InProcessShifter.shift(&buffer, ratio).unwrap();

        assert_eq!(shifted.sample_rate, 44100);
        assert_eq!(shifted.channels, 2);
        let expected = 1.0 / ratio;
        assert!(
            (shifted.duration - expected).abs() < 0.01,
            "duration {} expected {}",
            shifted.duration,
            expected
        );
    }

    #[test]
    fn test_in_process_shift_keeps_the_tail() {
        let mut samples = vec![0.0f32; 44100];
        for s in &mut samples[42100..] {
            *s = 0.5;
        }
        let buffer = AudioBuffer::new(samples, 44100, 1);
        let shifted = InProcessShifter.shift(&buffer, 0.5).unwrap();

        // Half the rate stretches the loud tail over the last ~4000 frames
        assert_eq!(shifted.frames(), 88200);
        let tail = &shifted.samples[85000..];
        let mean = tail.iter().map(|s| s.abs()).sum::<f32>() / tail.len() as f32;
        assert!(mean > 0.4, "tail mean {}", mean);
    }

    #[test]
    fn test_unity_ratio_is_pass_through() {
        let buffer = tone(0.5, 44100);
        let chain = ShiftChain::new(vec![Box::new(Failing)]);
        let outcome = chain.apply(&buffer, 1.0);
        assert_eq!(outcome.buffer, buffer);
        assert!(outcome.backend.is_none());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_falls_back_to_next_backend() {
        let buffer = tone(0.5, 44100);
        let chain = ShiftChain::new(vec![Box::new(Failing), Box::new(InProcessShifter)]);
        let outcome = chain.apply(&buffer, 2.0);
        assert_eq!(outcome.backend, Some("in-process"));
        assert_eq!(outcome.warnings.len(), 1);
        assert!((outcome.buffer.duration - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_all_backends_failing_keeps_unshifted() {
        let buffer = tone(0.5, 44100);
        let chain = ShiftChain::new(vec![Box::new(Failing)]);
        let outcome = chain.apply(&buffer, 1.5);
        assert_eq!(outcome.buffer, buffer);
        assert!(outcome.backend.is_none());
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn test_missing_ffmpeg_is_encoding_unavailable() {
        let shifter = FfmpegShifter::new("/nonexistent/ffmpeg");
        let err = shifter.shift(&tone(0.1, 44100), 1.5).unwrap_err();
        assert!(err.is_degradable());
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        assert!(InProcessShifter.shift(&tone(0.1, 44100), 0.0).is_err());
        assert!(InProcessShifter.shift(&tone(0.1, 44100), f64::NAN).is_err());
    }
}

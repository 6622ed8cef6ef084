//! Compressed output encoding

use crate::audio::{shift::run_ffmpeg, wav};
use crate::error::Result;
use crate::types::AudioBuffer;
use std::path::{Path, PathBuf};

/// Constant output bitrate
pub const OUTPUT_BITRATE_KBPS: u32 = 192;

/// Output sample rate
pub const OUTPUT_SAMPLE_RATE: u32 = 44100;

/// Output encoding backend
pub trait Encoder: Send + Sync {
    /// Encode a buffer to `path`, replacing any existing file
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()>;

    /// File extension written by this encoder (without the dot)
    fn extension(&self) -> &'static str;

    /// Get the name of this encoder (for logging)
    fn name(&self) -> &'static str;
}

/// MP3 at 192 kbps CBR, 44.1 kHz, through the external toolchain
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let intermediate = temp_dir.path().join("mix.wav");
        wav::write_wav(&intermediate, buffer)?;

        let bitrate = format!("{}k", OUTPUT_BITRATE_KBPS);
        let sample_rate = OUTPUT_SAMPLE_RATE.to_string();
        run_ffmpeg(&self.ffmpeg, |cmd| {
            cmd.arg("-i")
                .arg(&intermediate)
                .args(["-vn", "-codec:a", "libmp3lame", "-b:a", bitrate.as_str(), "-ar", sample_rate.as_str()])
                .arg(path);
        })
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn name(&self) -> &'static str {
        "ffmpeg/libmp3lame"
    }
}

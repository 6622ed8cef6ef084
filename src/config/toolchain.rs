//! External toolchain paths and startup capability probing
//!
//! Paths are resolved once and passed explicitly to every component that
//! shells out; nothing here is process-wide.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Executables the pipeline may invoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// ffmpeg (pitch shift, output encoding, acquisition transcode)
    pub ffmpeg: PathBuf,
    /// spleeter CLI (separation engine)
    pub spleeter: PathBuf,
    /// yt-dlp (remote media acquisition)
    pub yt_dlp: PathBuf,
}

impl Toolchain {
    /// Build a toolchain, defaulting each tool to its name on PATH
    pub fn new(
        ffmpeg: Option<PathBuf>,
        spleeter: Option<PathBuf>,
        yt_dlp: Option<PathBuf>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            spleeter: spleeter.unwrap_or_else(|| PathBuf::from("spleeter")),
            yt_dlp: yt_dlp.unwrap_or_else(|| PathBuf::from("yt-dlp")),
        }
    }

    /// Detect which tools can actually be run
    pub fn detect(&self) -> Capabilities {
        let external_toolchain = is_runnable(&self.ffmpeg);
        let capabilities = Capabilities {
            external_toolchain,
            separation: is_runnable(&self.spleeter),
            acquisition: external_toolchain && is_runnable(&self.yt_dlp),
        };
        debug!("Detected capabilities: {:?}", capabilities);
        capabilities
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// Optional collaborators available in this run, decided once at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// ffmpeg can be run
    pub external_toolchain: bool,
    /// Remote URLs can be fetched
    pub acquisition: bool,
    /// The separation engine can be run
    pub separation: bool,
}

/// A bare name is looked up on PATH; anything with a directory must exist
fn is_runnable(program: &Path) -> bool {
    if program.components().count() > 1 {
        program.is_file()
    } else {
        which::which(program).is_ok()
    }
}

//! Runtime configuration settings

use super::toolchain::{Capabilities, Toolchain};
use crate::types::{PitchShift, VariantFlags};
use std::path::PathBuf;

/// Fully resolved parameters of one batch run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Folder to scan for MP3 files
    pub folder: Option<PathBuf>,
    /// Explicit input files
    pub files: Vec<PathBuf>,
    /// Remote URLs to acquire before processing
    pub urls: Vec<String>,
    /// Destination root; variants go to `<destination>/<VARIANT>/`
    pub destination: PathBuf,
    /// Temporary separation output, `<work_dir>/<track>/` per track
    pub work_dir: PathBuf,
    /// Where downloaded URL audio is stored
    pub download_dir: PathBuf,
    /// Precomputed stems root, replaces the separation engine when set
    pub stems_from: Option<PathBuf>,
    /// External executables
    pub toolchain: Toolchain,
    /// What the toolchain can do, detected once at startup
    pub capabilities: Capabilities,
    /// Optional variant selection
    pub flags: VariantFlags,
    /// Optional pitch shift
    pub pitch: Option<PitchShift>,
    /// Remove per-track temporary files after writing
    pub cleanup: bool,
    /// Show progress display
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments, probing the toolchain
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let toolchain = Toolchain::new(cli.ffmpeg.clone(), cli.spleeter.clone(), cli.yt_dlp.clone());
        let capabilities = toolchain.detect();

        let pitch = match (&cli.pitch_from, &cli.pitch_to) {
            (Some(from), Some(to)) => Some(PitchShift::new(from.clone(), to.clone())),
            _ => None,
        };

        Self {
            folder: cli.folder.clone(),
            files: cli.file.clone(),
            urls: cli.url.clone(),
            destination: cli.output_folder.clone(),
            work_dir: cli.work_dir.clone().unwrap_or_else(default_work_dir),
            download_dir: cli
                .download_dir
                .clone()
                .unwrap_or_else(|| cli.output_folder.join("downloads")),
            stems_from: cli.stems_from.clone(),
            toolchain,
            capabilities,
            flags: VariantFlags {
                novocals: cli.novocals,
                nodrums: cli.nodrums,
                noother: cli.noother,
                bassonly: cli.bassonly,
            },
            pitch,
            cleanup: !cli.nocleanup,
            show_progress: !cli.quiet,
        }
    }
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("stemmix")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folder: None,
            files: Vec::new(),
            urls: Vec::new(),
            destination: PathBuf::from("./output"),
            work_dir: default_work_dir(),
            download_dir: PathBuf::from("./output/downloads"),
            stems_from: None,
            toolchain: Toolchain::default(),
            capabilities: Capabilities::default(),
            flags: VariantFlags::default(),
            pitch: None,
            cleanup: true,
            show_progress: true,
        }
    }
}

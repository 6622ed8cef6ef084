//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// stemmix - alternate mixes from separated stems
///
/// Separates each track into bass, drums, vocals and other, then writes a
/// "no bass" mix plus any of the optional variants, optionally re-pitched
/// from one note to another.
#[derive(Parser, Debug)]
#[command(name = "stemmix")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  stemmix --folder ~/Music/set -o ./out\n  stemmix --file a.mp3 --file b.mp3 -o ./out --bassonly --pitch-from C --pitch-to D\n  stemmix --url https://youtu.be/VIDEO_ID -o ./out --novocals")]
pub struct Cli {
    /// Folder containing MP3 files to process
    #[arg(long, value_name = "DIR", conflicts_with = "file")]
    pub folder: Option<PathBuf>,

    /// Individual audio file to process (repeatable)
    #[arg(long, value_name = "PATH")]
    pub file: Vec<PathBuf>,

    /// Video URL to download and process (repeatable)
    #[arg(long, value_name = "URL")]
    pub url: Vec<String>,

    /// Output folder; each variant gets its own subfolder
    #[arg(short, long = "output-folder", alias = "output_folder", value_name = "DIR")]
    pub output_folder: PathBuf,

    /// Path to the ffmpeg executable (if not on PATH)
    #[arg(long, value_name = "PATH", env = "STEMMIX_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the spleeter executable (if not on PATH)
    #[arg(long, value_name = "PATH", env = "STEMMIX_SPLEETER")]
    pub spleeter: Option<PathBuf>,

    /// Path to the yt-dlp executable (if not on PATH)
    #[arg(long = "yt-dlp", value_name = "PATH", env = "STEMMIX_YT_DLP")]
    pub yt_dlp: Option<PathBuf>,

    /// Use existing stems from DIR/<track>/{bass,drums,vocals,other}.wav instead of separating
    #[arg(long, value_name = "DIR")]
    pub stems_from: Option<PathBuf>,

    /// Folder for temporary separation output (defaults to <temp>/stemmix)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Folder for downloaded URL audio (defaults to <output>/downloads)
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Keep temporary separation files
    #[arg(long, default_value = "false")]
    pub nocleanup: bool,

    /// Also write bass + drums + other (NOVOCALS)
    #[arg(long, default_value = "false")]
    pub novocals: bool,

    /// Also write bass + vocals + other (NODRUMS)
    #[arg(long, default_value = "false")]
    pub nodrums: bool,

    /// Also write bass + vocals + drums (NOOTHER)
    #[arg(long, default_value = "false")]
    pub noother: bool,

    /// Also write the bass stem alone (BASSONLY)
    #[arg(long, default_value = "false")]
    pub bassonly: bool,

    /// Source note for pitch shifting (C, C#, D, ... B)
    #[arg(long, value_name = "NOTE", requires = "pitch_to")]
    pub pitch_from: Option<String>,

    /// Target note for pitch shifting (C, C#, D, ... B)
    #[arg(long, value_name = "NOTE", requires = "pitch_from")]
    pub pitch_to: Option<String>,

    /// Append-only run log
    #[arg(long, value_name = "PATH", default_value = "stemmix.log")]
    pub log_file: PathBuf,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress display)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// At least one input source was given
    pub fn has_inputs(&self) -> bool {
        self.folder.is_some() || !self.file.is_empty() || !self.url.is_empty()
    }
}

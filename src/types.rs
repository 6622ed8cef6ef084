//! Core data types for stemmix
//!
//! These types represent the domain model and flow through the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 chromatic note names accepted for pitch shifting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    C,
    Cs, // C#
    D,
    Ds, // D#
    E,
    F,
    Fs, // F#
    G,
    Gs, // G#
    A,
    As, // A#
    B,
}

impl Note {
    /// All notes in display order (C through B)
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::Cs,
        Note::D,
        Note::Ds,
        Note::E,
        Note::F,
        Note::Fs,
        Note::G,
        Note::Gs,
        Note::A,
        Note::As,
        Note::B,
    ];

    /// Standard notation (e.g., "C", "F#")
    pub fn name(self) -> &'static str {
        match self {
            Note::C => "C",
            Note::Cs => "C#",
            Note::D => "D",
            Note::Ds => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::Fs => "F#",
            Note::G => "G",
            Note::Gs => "G#",
            Note::A => "A",
            Note::As => "A#",
            Note::B => "B",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = String;

    /// Exact, case-sensitive match on the sharp spelling ("C", "C#", ...)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|n| n.name() == s)
            .ok_or_else(|| format!("'{}' is not a chromatic note name (expected one of C, C#, D, D#, E, F, F#, G, G#, A, A#, B)", s))
    }
}

/// Optional (source, target) pitch shift request
///
/// Notes are kept as given so that an unrecognized name can be reported and
/// degraded to "no shift" instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchShift {
    pub from: String,
    pub to: String,
}

impl PitchShift {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

// =============================================================================
// Stems and variants
// =============================================================================

/// The four roles produced by the separation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StemRole {
    Bass,
    Drums,
    Vocals,
    Other,
}

impl StemRole {
    pub const ALL: [StemRole; 4] = [
        StemRole::Bass,
        StemRole::Drums,
        StemRole::Vocals,
        StemRole::Other,
    ];

    /// Name used by the separation engine for this role's file
    pub fn as_str(self) -> &'static str {
        match self {
            StemRole::Bass => "bass",
            StemRole::Drums => "drums",
            StemRole::Vocals => "vocals",
            StemRole::Other => "other",
        }
    }

    /// File name of this role's stem inside a separation folder
    pub fn file_name(self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl fmt::Display for StemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named recombination of stems, written to its own subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    /// drums + vocals + other (always produced)
    NoBass,
    /// bass alone
    BassOnly,
    /// bass + drums + other
    NoVocals,
    /// bass + vocals + other
    NoDrums,
    /// bass + vocals + drums
    NoOther,
}

impl Variant {
    /// Destination subdirectory name
    pub fn dir_name(self) -> &'static str {
        match self {
            Variant::NoBass => "NOBASS",
            Variant::BassOnly => "BASSONLY",
            Variant::NoVocals => "NOVOCALS",
            Variant::NoDrums => "NODRUMS",
            Variant::NoOther => "NOOTHER",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Output-selection flags for one run. `NOBASS` is not a flag: it is always produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantFlags {
    pub novocals: bool,
    pub nodrums: bool,
    pub noother: bool,
    pub bassonly: bool,
}

impl VariantFlags {
    /// All optional variants enabled
    pub fn all() -> Self {
        Self {
            novocals: true,
            nodrums: true,
            noother: true,
            bassonly: true,
        }
    }

    /// Whether a variant is requested under these flags
    pub fn requests(&self, variant: Variant) -> bool {
        match variant {
            Variant::NoBass => true,
            Variant::BassOnly => self.bassonly,
            Variant::NoVocals => self.novocals,
            Variant::NoDrums => self.nodrums,
            Variant::NoOther => self.noother,
        }
    }
}

/// Paths to separated stem files for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub bass: PathBuf,
    pub drums: PathBuf,
    pub vocals: PathBuf,
    pub other: PathBuf,
}

impl StemPaths {
    /// Conventional layout: `<dir>/{bass,drums,vocals,other}.wav`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            bass: dir.join(StemRole::Bass.file_name()),
            drums: dir.join(StemRole::Drums.file_name()),
            vocals: dir.join(StemRole::Vocals.file_name()),
            other: dir.join(StemRole::Other.file_name()),
        }
    }

    pub fn get(&self, role: StemRole) -> &Path {
        match role {
            StemRole::Bass => &self.bass,
            StemRole::Drums => &self.drums,
            StemRole::Vocals => &self.vocals,
            StemRole::Other => &self.other,
        }
    }
}

// =============================================================================
// Audio buffer
// =============================================================================

/// Decoded audio, interleaved f32 samples normalized to [-1.0, 1.0]
///
/// Never mutated in place by the mixer: padding, overlay and resampling
/// all produce new buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples [L, R, L, R, ...] (or mono)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 or 2)
    pub channels: u16,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            frames as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration,
        }
    }

    /// Silent buffer of `frames` frames
    pub fn silent(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self::new(vec![0.0; frames * channels.max(1) as usize], sample_rate, channels)
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats accepted as pipeline inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

/// Base name of a track (file stem), used for work folders and output files
pub fn track_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

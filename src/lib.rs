//! stemmix - Alternate mixes from separated stems
//!
//! A command-line utility that separates tracks into bass, drums, vocals and
//! other stems, recombines subsets of them into "no bass" (and optionally
//! "no vocals", "no drums", "no other", "bass only") mixes, and can retune
//! the result from one note to another.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing, runtime settings and toolchain probing
//! - `discovery` / `acquisition`: local input files and remote URL downloads
//! - `separation`: stem separation engines (external, with swappable backends)
//! - `audio`: decoding with symphonia, resampling with rubato, pitch shifting
//! - `mix`: the variant table and the pad-and-overlay mixer
//! - `pitch`: note frequencies and shift ratios
//! - `export`: per-variant MP3 output
//! - `pipeline`: background worker, event channel and batch summary
//!
//! # Example
//!
//! ```no_run
//! use stemmix::config::Settings;
//! use stemmix::pipeline::{self, Collaborators, PipelineEvent};
//! use std::path::PathBuf;
//!
//! let settings = Settings::default();
//! let collaborators = Collaborators::from_settings(&settings);
//! let handle = pipeline::spawn(vec![PathBuf::from("song.mp3")], settings, collaborators)
//!     .expect("failed to start worker");
//! for event in handle.events().iter() {
//!     if let PipelineEvent::BatchComplete { succeeded, failed } = event {
//!         println!("{} succeeded, {} failed", succeeded, failed);
//!     }
//! }
//! ```

pub mod acquisition;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod mix;
pub mod pipeline;
pub mod pitch;
pub mod separation;
pub mod types;

// Re-export key types at crate root
pub use error::{Result, StemmixError};
pub use types::{AudioBuffer, Note, PitchShift, StemRole, Variant, VariantFlags};

//! Stem separation engines
//!
//! The separation model itself is external. The pipeline only needs four
//! stem files per track, from one of:
//! - `SpleeterSeparator`: runs the `spleeter` CLI (4-stem model)
//! - `PrecomputedSeparator`: stems already on disk from an earlier run
//! - `UnavailableSeparator`: fallback when no engine was found at startup

use crate::error::{Result, StemmixError};
use crate::types::{track_name, StemPaths, StemRole};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Stem separation backend
pub trait StemSeparator: Send + Sync {
    /// Separate a track into bass, drums, vocals and other
    ///
    /// # Arguments
    /// * `input_path` - Path to the source audio file
    /// * `work_dir` - Root of the temporary working storage; per-track
    ///   artifacts go under `work_dir/<track name>/`
    ///
    /// # Returns
    /// Paths to the stem files. Individual files may be missing; that is
    /// reported per variant by the mixer. No stems at all is an error.
    fn separate(&self, input_path: &Path, work_dir: &Path) -> Result<StemPaths>;

    /// Check if the separator can run
    fn is_available(&self) -> bool;

    /// Get the name of this separator (for logging)
    fn name(&self) -> &'static str;
}

/// Per-track working folder, keyed by the track's base name
pub fn track_work_dir(work_dir: &Path, input_path: &Path) -> PathBuf {
    work_dir.join(track_name(input_path))
}

/// Fail unless at least one of the four stems exists
fn require_any_stem(input_path: &Path, paths: StemPaths) -> Result<StemPaths> {
    let present: Vec<StemRole> = StemRole::ALL
        .into_iter()
        .filter(|role| paths.get(*role).is_file())
        .collect();

    if present.is_empty() {
        return Err(StemmixError::SeparationFailure {
            path: input_path.to_path_buf(),
            reason: format!(
                "no stem files produced in {}",
                paths
                    .bass
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
        });
    }

    if present.len() < StemRole::ALL.len() {
        let missing: Vec<&str> = StemRole::ALL
            .iter()
            .filter(|r| !present.contains(r))
            .map(|r| r.as_str())
            .collect();
        warn!(
            "Missing separated files for {}: {}",
            input_path.display(),
            missing.join(", ")
        );
    }

    Ok(paths)
}

// =============================================================================
// Spleeter
// =============================================================================

/// Runs `spleeter separate -p spleeter:4stems`
pub struct SpleeterSeparator {
    program: PathBuf,
    available: bool,
}

impl SpleeterSeparator {
    /// Model descriptor passed to spleeter
    pub const MODEL: &'static str = "spleeter:4stems";

    pub fn new(program: impl Into<PathBuf>, available: bool) -> Self {
        Self {
            program: program.into(),
            available,
        }
    }
}

impl StemSeparator for SpleeterSeparator {
    fn separate(&self, input_path: &Path, work_dir: &Path) -> Result<StemPaths> {
        if !input_path.is_file() {
            return Err(StemmixError::FileNotFound(input_path.to_path_buf()));
        }

        std::fs::create_dir_all(work_dir).map_err(|e| StemmixError::SeparationFailure {
            path: input_path.to_path_buf(),
            reason: format!("cannot create work folder {}: {}", work_dir.display(), e),
        })?;

        info!("Running spleeter separation on {}", input_path.display());
        let output = Command::new(&self.program)
            .arg("separate")
            .arg("-p")
            .arg(Self::MODEL)
            .arg("-o")
            .arg(work_dir)
            .arg(input_path)
            .output()
            .map_err(|e| StemmixError::SeparationFailure {
                path: input_path.to_path_buf(),
                reason: format!("failed to start {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(StemmixError::SeparationFailure {
                path: input_path.to_path_buf(),
                reason: format!(
                    "spleeter exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let paths = StemPaths::in_dir(&track_work_dir(work_dir, input_path));
        debug!("Spleeter output folder: {}", paths.bass.parent().unwrap_or(work_dir).display());
        require_any_stem(input_path, paths)
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &'static str {
        "spleeter"
    }
}

// =============================================================================
// Precomputed stems
// =============================================================================

/// Reads stems from `<root>/<track name>/{bass,drums,vocals,other}.wav`
///
/// Nothing is written to the work folder, so cleanup never touches these files.
pub struct PrecomputedSeparator {
    root: PathBuf,
}

impl PrecomputedSeparator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StemSeparator for PrecomputedSeparator {
    fn separate(&self, input_path: &Path, _work_dir: &Path) -> Result<StemPaths> {
        let paths = StemPaths::in_dir(&self.root.join(track_name(input_path)));
        require_any_stem(input_path, paths)
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn name(&self) -> &'static str {
        "precomputed"
    }
}

// =============================================================================
// Unavailable
// =============================================================================

/// Placeholder used when no separation engine is available
pub struct UnavailableSeparator;

impl StemSeparator for UnavailableSeparator {
    fn separate(&self, input_path: &Path, _work_dir: &Path) -> Result<StemPaths> {
        Err(StemmixError::SeparationFailure {
            path: input_path.to_path_buf(),
            reason: "no separation engine available".to_string(),
        })
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

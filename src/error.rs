//! Unified error types for stemmix
//!
//! Error strategy:
//! - Per-item errors (acquisition, separation, decode): recoverable, skip and continue
//! - Per-variant errors (missing stem): skip that variant, keep the others
//! - Pitch shift errors: degrade to the fallback method or to no shift
//! - Cleanup errors: warning only, never escalated
//! - Configuration errors: fatal, abort before the batch starts
//!
//! All errors include actionable suggestions where possible.

use crate::types::{StemRole, Variant};
use std::path::PathBuf;
use thiserror::Error;

/// Supported input formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF";

/// Top-level error type for stemmix operations
#[derive(Debug, Error)]
pub enum StemmixError {
    // =========================================================================
    // Collaborator boundary - skip the item, continue batch
    // =========================================================================
    #[error("Failed to acquire '{url}': {reason}")]
    AcquisitionFailure { url: String, reason: String },

    #[error("Stem separation failed for '{path}': {reason}\n  Tip: Check that spleeter is installed (pip install spleeter) or pass --stems-from DIR")]
    SeparationFailure { path: PathBuf, reason: String },

    // =========================================================================
    // Per-variant - skip the variant, produce the others
    // =========================================================================
    #[error("Missing {} stem, cannot produce {}: {reason}", format_roles(.roles), format_variants(.variants))]
    MissingStem {
        roles: Vec<StemRole>,
        variants: Vec<Variant>,
        reason: String,
    },

    // =========================================================================
    // External toolchain - pitch shift degrades, output encoding aborts track
    // =========================================================================
    #[error("{tool} unavailable: {reason}\n  Tip: Install ffmpeg or point --ffmpeg at the executable")]
    EncodingUnavailable { tool: String, reason: String },

    // =========================================================================
    // Warnings - logged, never escalated
    // =========================================================================
    #[error("Failed to clean up temporary files in '{path}': {reason}")]
    CleanupWarning { path: PathBuf, reason: String },

    // =========================================================================
    // Decode / filesystem
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output folder")]
    OutputError { path: PathBuf, reason: String },

    // =========================================================================
    // Fatal
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Pipeline worker stopped unexpectedly: {0}")]
    WorkerPanic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemmix operations
pub type Result<T> = std::result::Result<T, StemmixError>;

fn format_roles(roles: &[StemRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(" + ")
}

fn format_variants(variants: &[Variant]) -> String {
    variants
        .iter()
        .map(|v| v.dir_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl StemmixError {
    /// Returns true if a pitch shift hitting this error may fall back instead of failing
    pub fn is_degradable(&self) -> bool {
        matches!(self, StemmixError::EncodingUnavailable { .. })
    }

    /// Returns true if this error is logged but never changes an outcome
    pub fn is_warning(&self) -> bool {
        matches!(self, StemmixError::CleanupWarning { .. })
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemmixError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an encoding-unavailable error for an external tool
    pub fn encoding_unavailable(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        StemmixError::EncodingUnavailable {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        StemmixError::OutputError { path, reason }
    }
}

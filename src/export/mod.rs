//! Output writing
//!
//! Each produced variant lands at `<destination>/<VARIANT>/<track>.<ext>`.
//! The file name carries no variant suffix; the folder does.

pub mod encoder;

pub use encoder::{Encoder, FfmpegEncoder, OUTPUT_BITRATE_KBPS, OUTPUT_SAMPLE_RATE};

use crate::error::{Result, StemmixError};
use crate::types::{AudioBuffer, Variant};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination path for a variant of a track
pub fn output_path(destination: &Path, variant: Variant, track_name: &str, extension: &str) -> PathBuf {
    destination
        .join(variant.dir_name())
        .join(format!("{}.{}", track_name, extension))
}

/// Encode one variant to its destination, overwriting any existing file
pub fn write_variant(
    encoder: &dyn Encoder,
    buffer: &AudioBuffer,
    variant: Variant,
    track_name: &str,
    destination: &Path,
) -> Result<PathBuf> {
    let variant_dir = destination.join(variant.dir_name());
    std::fs::create_dir_all(&variant_dir)
        .map_err(|e| StemmixError::output_error(&variant_dir, e))?;

    let path = output_path(destination, variant, track_name, encoder.extension());
    debug!(
        "Encoding {} ({:.2}s) with {} -> {}",
        variant,
        buffer.duration,
        encoder.name(),
        path.display()
    );

    encoder.encode(buffer, &path)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

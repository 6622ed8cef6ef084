//! Pitch ratio calculation
//!
//! Converts a (source note, target note) request into the multiplicative
//! playback-rate ratio applied by the resampler.

pub mod frequency;

pub use frequency::reference_frequency;

use crate::types::Note;
use tracing::warn;

/// Note names in display order
pub fn note_names() -> Vec<&'static str> {
    Note::ALL.iter().map(|n| n.name()).collect()
}

/// Check if a note name is one of the 12 recognized chromatic names
pub fn validate_note(name: &str) -> bool {
    name.parse::<Note>().is_ok()
}

/// Ratio between two note names, or the reason it cannot be computed
///
/// Identical names short-circuit to 1.0 before validation.
pub fn try_ratio(from: &str, to: &str) -> Result<f64, String> {
    if from == to {
        return Ok(1.0);
    }

    let (from_note, to_note) = match (from.parse::<Note>(), to.parse::<Note>()) {
        (Ok(f), Ok(t)) => (f, t),
        _ => {
            return Err(format!(
                "Invalid notes '{}' or '{}'. Using no shift.",
                from, to
            ))
        }
    };

    Ok(reference_frequency(to_note) / reference_frequency(from_note))
}

/// Ratio between two note names
///
/// Unrecognized names fall back to 1.0 with a warning; this never fails.
pub fn ratio(from: &str, to: &str) -> f64 {
    try_ratio(from, to).unwrap_or_else(|warning| {
        warn!("{}", warning);
        1.0
    })
}

/// Equivalent shift in semitones (for logging only)
pub fn semitones(ratio: f64) -> f64 {
    12.0 * ratio.log2()
}

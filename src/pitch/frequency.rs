//! Reference frequencies for the 12 chromatic notes
//!
//! One octave only (C4 through B4, A4 = 440 Hz). Ratios between two entries
//! therefore always stay within a single octave span.
//!
//! ```text
//!  C      C#     D      D#     E      F      F#     G      G#     A      A#     B
//!  261.63 277.18 293.66 311.13 329.63 349.23 369.99 392.00 415.30 440.00 466.16 493.88
//! ```

use crate::types::Note;

/// Reference frequency in Hz for a note
pub fn reference_frequency(note: Note) -> f64 {
    match note {
        Note::C => 261.63,
        Note::Cs => 277.18,
        Note::D => 293.66,
        Note::Ds => 311.13,
        Note::E => 329.63,
        Note::F => 349.23,
        Note::Fs => 369.99,
        Note::G => 392.00,
        Note::Gs => 415.30,
        Note::A => 440.00,
        Note::As => 466.16,
        Note::B => 493.88,
    }
}

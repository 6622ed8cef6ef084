//! Audio I/O and signal transforms

pub mod decoder;
pub mod resample;
pub mod shift;
pub mod wav;

pub use decoder::decode;
pub use shift::{FfmpegShifter, InProcessShifter, PitchShifter, ShiftChain, ShiftOutcome};

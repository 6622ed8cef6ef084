//! Configuration and CLI handling

pub mod cli;
pub mod settings;
pub mod toolchain;

pub use cli::Cli;
pub use settings::Settings;
pub use toolchain::{Capabilities, Toolchain};

//! Command-line interface for medisort.

mod commands;
pub mod icons;

pub use commands::{load_settings, run, Cli};

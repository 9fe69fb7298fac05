//! Command-line host for HyperTTS batch runs.
//!
//! Records come from a JSON file, audio is written to a media directory and
//! batch presets are read from the SQLite preset database.

pub mod config;
pub mod error;
pub mod store;

pub use error::CliError;

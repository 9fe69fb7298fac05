//! Persisted batch presets.
//!
//! A preset is a [`BatchConfig`](hypertts_batch::BatchConfig) stored as JSON
//! in the `batch_presets` table under its name. Configurations are validated
//! before they are written, and voices are resolved against the current
//! voice catalog when they are read back.

mod error;
mod store;

#[cfg(test)]
mod tests;

pub use error::PresetError;
pub use store::{
    delete_preset, list_presets, load_preset, load_stored_preset, preset_exists, save_preset,
    PresetInfo,
};

//! Error types for the preset store.

use hypertts_batch::ConfigError;

/// Errors that can occur while saving or loading presets.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// A database operation failed.
    #[error("preset database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The stored JSON could not be written or parsed.
    #[error("preset serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configuration is invalid, or its voices are missing from the
    /// catalog it was loaded against.
    #[error("invalid preset: {0}")]
    Invalid(#[from] ConfigError),

    #[error("preset not found: {0}")]
    NotFound(String),
}

//! Errors that stop the CLI before or while starting a batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no preset configured; set batch.preset or HYPERTTS_PRESET")]
    NoPreset,

    #[error(transparent)]
    Database(#[from] hypertts_db::DbError),

    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),

    #[error(transparent)]
    Preset(#[from] hypertts_presets::PresetError),

    #[error(transparent)]
    Store(#[from] hypertts_batch::StoreError),

    #[error(transparent)]
    Batch(#[from] hypertts_batch::BatchError),

    #[error("batch task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

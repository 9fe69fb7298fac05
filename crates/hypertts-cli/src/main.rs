//! HyperTTS batch runner.
//!
//! Loads a batch preset from the preset database, runs it over every record
//! in the configured JSON record file and writes audio into the media
//! directory. Ctrl+C cancels the run after the record in progress.

use hypertts_batch::{
    BatchEvent, BatchExecutor, BatchOutcome, BatchState, RecordOutcome, RecordStore,
};
use hypertts_cli::config::{self, Config, LoggingConfig};
use hypertts_cli::store::{DirMediaStore, JsonRecordStore};
use hypertts_cli::CliError;
use hypertts_voice::{EspeakProvider, ProviderRegistry};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("HYPERTTS_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("hypertts.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    match run(&config).await {
        Ok(outcome) => {
            tracing::info!(
                run_id = %outcome.run_id,
                state = ?outcome.state,
                succeeded = outcome.succeeded,
                skipped = outcome.skipped,
                failed = outcome.failed_count(),
                untouched = outcome.untouched(),
                "batch finished"
            );
            if outcome.state == BatchState::Completed && outcome.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "batch could not run");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<BatchOutcome, CliError> {
    let preset = config.batch.preset.as_deref().ok_or(CliError::NoPreset)?;

    let pool = hypertts_db::open_preset_db(
        Path::new(&config.database.path),
        config.database.runtime_settings(),
    )?;
    let conn = pool.get()?;

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(EspeakProvider::new(config.espeak.settings())));

    let (catalog, failures) = registry.load_catalog().await;
    for failure in &failures {
        tracing::warn!(error = %failure, "provider voices unavailable");
    }

    let batch_config = hypertts_presets::load_preset(&conn, preset, &catalog)?;
    drop(conn);
    tracing::info!(preset, voices = catalog.voices().len(), "loaded batch preset");
    tracing::debug!("{batch_config}");

    let records = Arc::new(JsonRecordStore::open(&config.batch.records_path)?);
    let media = Arc::new(DirMediaStore::new(&config.batch.media_dir)?);
    let record_ids = records.ids();

    let executor = BatchExecutor::new(
        &batch_config,
        catalog.ids(),
        registry,
        Arc::clone(&records) as Arc<dyn RecordStore>,
        media,
        config.batch.executor_settings(),
    )?;

    let mut handle = executor.start_batch(record_ids);

    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received SIGINT, stopping after the current record");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.events.recv().await {
        match event {
            BatchEvent::Started { run_id, total } => {
                tracing::info!(%run_id, total, "batch started");
            }
            BatchEvent::RecordFinished { record_id, outcome } => match outcome {
                RecordOutcome::Success { audio_reference } => {
                    tracing::debug!(record = %record_id, audio = %audio_reference, "record done");
                }
                RecordOutcome::SkippedNoText => {
                    tracing::debug!(record = %record_id, "record skipped, no text");
                }
                RecordOutcome::Error { .. } => {}
            },
            BatchEvent::Progress { current, total } => {
                tracing::info!(current, total, "progress");
            }
            BatchEvent::Finished(_) => {}
        }
    }

    let outcome = handle.join.await?;
    records.flush()?;
    Ok(outcome)
}

//! CLI configuration loading from file and environment variables.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub espeak: EspeakConfig,

    #[serde(default)]
    pub batch: BatchRunConfig,
}

/// Preset database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hypertts_batch=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Settings for the local espeak-ng provider.
#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    #[serde(default = "default_espeak_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_espeak_timeout_secs")]
    pub timeout_secs: u64,
}

/// What to run and where records and audio live.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRunConfig {
    /// Name of the preset to run. Required to start a batch.
    #[serde(default)]
    pub preset: Option<String>,

    /// JSON file holding the records.
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,

    /// Directory that receives audio files.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    #[serde(default = "default_true")]
    pub priority_fallback: bool,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_db_path() -> String {
    "hypertts.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    hypertts_db::DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    hypertts_db::DbRuntimeSettings::default().pool_max_size
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_espeak_binary() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_espeak_timeout_secs() -> u64 {
    60
}

fn default_records_path() -> PathBuf {
    PathBuf::from("records.json")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    hypertts_batch::DEFAULT_EVENT_CAPACITY
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            binary: default_espeak_binary(),
            timeout_secs: default_espeak_timeout_secs(),
        }
    }
}

impl Default for BatchRunConfig {
    fn default() -> Self {
        Self {
            preset: None,
            records_path: default_records_path(),
            media_dir: default_media_dir(),
            priority_fallback: true,
            event_capacity: default_event_capacity(),
        }
    }
}

impl DatabaseConfig {
    pub fn runtime_settings(&self) -> hypertts_db::DbRuntimeSettings {
        hypertts_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl EspeakConfig {
    pub fn settings(&self) -> hypertts_voice::EspeakSettings {
        hypertts_voice::EspeakSettings {
            binary: self.binary.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl BatchRunConfig {
    pub fn executor_settings(&self) -> hypertts_batch::ExecutorSettings {
        hypertts_batch::ExecutorSettings {
            event_capacity: self.event_capacity,
            priority_fallback: self.priority_fallback,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HYPERTTS_DB_PATH` overrides `database.path`
/// - `HYPERTTS_LOG_LEVEL` overrides `logging.level`
/// - `HYPERTTS_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `HYPERTTS_ESPEAK_BINARY` overrides `espeak.binary`
/// - `HYPERTTS_PRESET` overrides `batch.preset`
/// - `HYPERTTS_RECORDS_PATH` overrides `batch.records_path`
/// - `HYPERTTS_MEDIA_DIR` overrides `batch.media_dir`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(db_path) = var("HYPERTTS_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("HYPERTTS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("HYPERTTS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(binary) = var("HYPERTTS_ESPEAK_BINARY") {
        config.espeak.binary = PathBuf::from(binary);
    }
    if let Some(preset) = var("HYPERTTS_PRESET").filter(|p| !p.trim().is_empty()) {
        config.batch.preset = Some(preset);
    }
    if let Some(records) = var("HYPERTTS_RECORDS_PATH") {
        config.batch.records_path = PathBuf::from(records);
    }
    if let Some(media) = var("HYPERTTS_MEDIA_DIR") {
        config.batch.media_dir = PathBuf::from(media);
    }
}

//! Persistence operations for batch presets.
//!
//! Presets are keyed by configuration name. Saving an existing name
//! replaces its configuration and bumps `updated_at`; `created_at` is kept.

use hypertts_batch::{BatchConfig, StoredBatchConfig};
use hypertts_voice::VoiceCatalog;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PresetError;

/// Summary row returned by [`list_presets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetInfo {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Validates `config` and writes it under its name.
///
/// # Errors
///
/// Returns `PresetError::Invalid` if the configuration does not validate;
/// nothing is written in that case.
pub fn save_preset(conn: &Connection, config: &BatchConfig) -> Result<(), PresetError> {
    let stored = config.to_stored()?;
    let config_json = serde_json::to_string(&stored)?;

    conn.execute(
        "INSERT INTO batch_presets (name, config_json) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET
            config_json = excluded.config_json,
            updated_at = datetime('now')",
        params![stored.name, config_json],
    )?;

    tracing::info!(preset = %stored.name, "batch preset saved");
    Ok(())
}

/// Reads the persisted form of a preset without resolving its voices.
pub fn load_stored_preset(conn: &Connection, name: &str) -> Result<StoredBatchConfig, PresetError> {
    let config_json: Option<String> = conn
        .query_row(
            "SELECT config_json FROM batch_presets WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    let config_json = config_json.ok_or_else(|| PresetError::NotFound(name.to_string()))?;
    Ok(serde_json::from_str(&config_json)?)
}

/// Loads a preset and resolves its voices against `catalog`.
///
/// # Errors
///
/// Returns `PresetError::NotFound` for an unknown name and
/// `PresetError::Invalid` when a stored voice is no longer in the catalog.
pub fn load_preset(
    conn: &Connection,
    name: &str,
    catalog: &VoiceCatalog,
) -> Result<BatchConfig, PresetError> {
    let stored = load_stored_preset(conn, name)?;
    let config = BatchConfig::from_stored(&stored, catalog).inspect_err(|e| {
        tracing::warn!(preset = name, error = %e, "stored preset no longer resolves");
    })?;
    Ok(config)
}

pub fn preset_exists(conn: &Connection, name: &str) -> Result<bool, PresetError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM batch_presets WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Deletes a preset.
///
/// # Errors
///
/// Returns `PresetError::NotFound` if no preset has that name.
pub fn delete_preset(conn: &Connection, name: &str) -> Result<(), PresetError> {
    let deleted = conn.execute("DELETE FROM batch_presets WHERE name = ?1", [name])?;
    if deleted == 0 {
        return Err(PresetError::NotFound(name.to_string()));
    }
    tracing::info!(preset = name, "batch preset deleted");
    Ok(())
}

/// Lists all presets ordered by name.
pub fn list_presets(conn: &Connection) -> Result<Vec<PresetInfo>, PresetError> {
    let mut stmt = conn.prepare(
        "SELECT name, created_at, updated_at FROM batch_presets ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PresetInfo {
            name: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
        })
    })?;

    let mut presets = Vec::new();
    for row in rows {
        presets.push(row?);
    }
    Ok(presets)
}

//! Opening the preset database.
//!
//! Presets are written rarely and by one process, so the pool stays small
//! and connections wait on the writer lock instead of failing with
//! `SQLITE_BUSY`. [`open_preset_db`] hands back a pool whose schema is
//! already migrated.

use crate::migrations::{run_migrations, MigrationError};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Runtime tunables for preset database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits for the writer lock, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections. Ignored for in-memory
    /// databases, which always use a single connection.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 2,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to create database directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open preset database: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Opens (creating if needed) the preset database at `path` and applies
/// pending migrations.
///
/// Missing parent directories are created. [`IN_MEMORY`] gives a database
/// that lives as long as the returned pool.
///
/// # Errors
///
/// Returns `DbError` if the directory cannot be created, the first
/// connection cannot be opened, or a migration fails.
pub fn open_preset_db(path: &Path, settings: DbRuntimeSettings) -> Result<DbPool, DbError> {
    let in_memory = path == Path::new(IN_MEMORY);
    let busy_timeout = Duration::from_millis(settings.busy_timeout_ms);

    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        SqliteConnectionManager::file(path)
    };
    let manager = manager.with_init(move |conn| configure_connection(conn, busy_timeout));

    let builder = Pool::builder();
    let pool = if in_memory {
        // Every in-memory connection is its own database, so keep exactly
        // one alive for the life of the pool.
        builder
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?
    } else {
        builder.max_size(settings.pool_max_size.max(1)).build(manager)?
    };

    let applied = run_migrations(&*pool.get()?)?;
    tracing::info!(
        path = %path.display(),
        applied,
        max_size = pool.max_size(),
        "preset database ready"
    );
    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;

    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        tracing::warn!(journal_mode = %journal_mode, "WAL unavailable for preset database");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
}

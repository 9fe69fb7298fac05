//! Database layer for HyperTTS.
//!
//! [`open_preset_db`] opens the SQLite preset database through an `r2d2`
//! pool and brings its schema up to date. Tables used by other crates (the
//! preset store) are created here, through versioned migrations.
//!
//! Migration files are compiled into the binary with `include_str!`, so the
//! schema always ships with the code that reads it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{open_preset_db, DbError, DbPool, DbRuntimeSettings, IN_MEMORY};

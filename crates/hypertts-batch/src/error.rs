//! Error types for batch configuration and execution.

use hypertts_types::RecordId;
use hypertts_voice::{ProviderError, SelectionError, VoiceError};
use thiserror::Error;

/// A template failed to parse or to render against a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated field reference starting at offset {0}")]
    Unterminated(usize),

    #[error("unmatched '}}' at offset {0}")]
    UnmatchedClose(usize),

    #[error("empty field reference at offset {0}")]
    EmptyField(usize),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("unexpected {tag} at offset {offset}")]
    UnexpectedTag { tag: String, offset: usize },

    #[error("{{#if}} opened at offset {0} is never closed")]
    UnclosedIf(usize),

    #[error("template references undefined field '{0}'")]
    UndefinedField(String),
}

/// The source text of a record could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("source field not found: {0}")]
    FieldNotFound(String),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// A batch configuration is incomplete or invalid.
///
/// Raised by validation before any run starts, and while rebuilding a
/// configuration from its persisted form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("preset name must not be empty")]
    EmptyName,

    #[error("no source has been configured")]
    SourceNotSet,

    #[error("source field must not be empty")]
    EmptySourceField,

    #[error("source template must not be empty")]
    EmptyTemplate,

    #[error("no target has been configured")]
    TargetNotSet,

    #[error("target field must not be empty")]
    EmptyTargetField,

    #[error("invalid source template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid voice selection: {0}")]
    Selection(#[from] SelectionError),

    #[error("invalid voice selection: {0}")]
    Voice(#[from] VoiceError),
}

/// Failures of the host record and media stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("field '{field}' not found on record {record}")]
    FieldNotFound { record: RecordId, field: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Backend(String),
}

/// Errors surfaced by executor setup and single-record operations.
///
/// Batch runs never return this type: per-record failures are recorded in
/// the outcome instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("record {0} has no text to synthesize")]
    NoText(RecordId),
}

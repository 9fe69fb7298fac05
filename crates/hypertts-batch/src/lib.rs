//! Batch text processing for HyperTTS.
//!
//! A [`BatchConfig`] bundles four parts:
//!
//! - [`BatchSource`]: which field (or template over fields) supplies the
//!   text of a record.
//! - [`TextProcessing`]: an ordered chain of text rules applied to that text.
//! - a [`VoiceSelection`](hypertts_voice::VoiceSelection) choosing the voice.
//! - [`BatchTarget`]: which field receives the sound tag, and how existing
//!   content is treated.
//!
//! [`BatchExecutor`] runs a validated configuration over many records with
//! progress events, per-record outcomes and cooperative cancellation.
//! Records and audio files live in the host; the executor reaches them only
//! through [`RecordStore`] and [`MediaStore`].

pub mod config;
pub mod error;
pub mod executor;
pub mod media;
pub mod record;
pub mod source;
pub mod target;
pub mod template;
pub mod text;

pub use config::{BatchConfig, StoredBatchConfig};
pub use error::{BatchError, ConfigError, SourceError, StoreError, TemplateError};
pub use executor::{
    BatchEvent, BatchExecutor, BatchHandle, BatchOutcome, BatchState, CancelToken,
    ExecutorSettings, Preview, RecordOutcome, DEFAULT_EVENT_CAPACITY,
};
pub use media::{audio_filename, sound_tag};
pub use record::{MediaStore, MemoryMediaStore, MemoryRecordStore, RecordFields, RecordStore};
pub use source::{BatchSource, CompiledSource};
pub use target::{BatchTarget, SeparatorPolicy, TextAndSoundTag};
pub use template::{Template, TemplateFormatVersion};
pub use text::{BuiltinRule, ReplaceKind, RuleIssue, TextProcessing, TextProcessor, TextRule};

//! Batch configuration: the named bundle of source, target, voice selection
//! and text processing that a preset persists.

use crate::error::ConfigError;
use crate::source::BatchSource;
use crate::target::BatchTarget;
use crate::text::TextProcessing;
use hypertts_voice::{StoredVoiceSelection, VoiceCatalog, VoiceSelection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A batch configuration being edited or about to run.
///
/// Starts blank from [`BatchConfig::new`]; every part must be set before
/// [`validate`](Self::validate) passes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchConfig {
    pub name: String,
    pub source: Option<BatchSource>,
    pub target: Option<BatchTarget>,
    pub voice_selection: VoiceSelection,
    pub text_processing: TextProcessing,
}

impl BatchConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: BatchSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: BatchTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_voice_selection(mut self, voice_selection: VoiceSelection) -> Self {
        self.voice_selection = voice_selection;
        self
    }

    pub fn with_text_processing(mut self, text_processing: TextProcessing) -> Self {
        self.text_processing = text_processing;
        self
    }

    pub fn source(&self) -> Result<&BatchSource, ConfigError> {
        self.source.as_ref().ok_or(ConfigError::SourceNotSet)
    }

    pub fn target(&self) -> Result<&BatchTarget, ConfigError> {
        self.target.as_ref().ok_or(ConfigError::TargetNotSet)
    }

    /// Checks that the configuration can run.
    ///
    /// Text processing rules never fail validation; broken rules are
    /// reported when the chain is compiled and then skipped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        self.source()?.validate()?;
        self.target()?.validate()?;
        self.voice_selection.validate()?;
        Ok(())
    }

    /// Converts to the persisted form, validating first.
    pub fn to_stored(&self) -> Result<StoredBatchConfig, ConfigError> {
        self.validate()?;
        Ok(StoredBatchConfig {
            name: self.name.clone(),
            source: self.source()?.clone(),
            target: self.target()?.clone(),
            voice_selection: self.voice_selection.to_stored()?,
            text_processing: self.text_processing.clone(),
        })
    }

    /// Rebuilds a configuration, resolving its voices against `catalog`.
    pub fn from_stored(
        stored: &StoredBatchConfig,
        catalog: &VoiceCatalog,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            name: stored.name.clone(),
            source: Some(stored.source.clone()),
            target: Some(stored.target.clone()),
            voice_selection: VoiceSelection::from_stored(&stored.voice_selection, catalog)?,
            text_processing: stored.text_processing.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Display for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unset = "(not set)".to_string();
        writeln!(
            f,
            "Source: {}",
            self.source.as_ref().map_or(unset.clone(), ToString::to_string)
        )?;
        writeln!(
            f,
            "Target: {}",
            self.target.as_ref().map_or(unset, ToString::to_string)
        )?;
        writeln!(f, "Voice Selection: {}", self.voice_selection)?;
        write!(f, "Text Processing: {} rules", self.text_processing.rules.len())
    }
}

/// Persisted form of a [`BatchConfig`].
///
/// Voices are stored by provider and voice key, so loading needs a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBatchConfig {
    pub name: String,
    pub source: BatchSource,
    pub target: BatchTarget,
    pub voice_selection: StoredVoiceSelection,
    #[serde(default)]
    pub text_processing: TextProcessing,
}

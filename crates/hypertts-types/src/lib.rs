//! Shared types for the HyperTTS workspace.
//!
//! This crate provides the identifiers and leaf data types used by every
//! other HyperTTS crate: provider and voice identities, record identifiers,
//! voice gender and language codes, and the [`voice::Voice`] description a
//! provider exposes together with its tunable option schema.
//!
//! No crate in the workspace depends on anything *except* `hypertts-types`
//! for cross-cutting type definitions.

pub mod language;
pub mod voice;

pub use language::{AudioLanguage, ParseAudioLanguageError};
pub use voice::{OptionError, OptionValue, Voice, VoiceOptionSpec};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a synthesis provider (e.g. `"Azure"`, `"ESpeakNg"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Stable identity of a voice across catalog reloads.
///
/// Derived from the provider and the canonical JSON encoding of the
/// provider-specific voice key, so two `Voice` values describing the same
/// provider voice always share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(String);

impl VoiceId {
    /// Builds the id for `voice_key` on `provider`.
    pub fn new(provider: &ProviderId, voice_key: &serde_json::Value) -> Self {
        // serde_json::Map is ordered, so the encoding is canonical.
        Self(format!("{}:{}", provider, voice_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a record (a flashcard note) in the host record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voice gender as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    /// Neutral, unknown, or not reported by the provider.
    Any,
}

impl Gender {
    /// Returns the string label for this gender.
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Any => "Any",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

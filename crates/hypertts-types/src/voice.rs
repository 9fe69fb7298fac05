//! Voice and voice option definitions.
//!
//! A [`Voice`] is what a provider exposes: a display name, a gender, a
//! language, an opaque provider-specific key, and the schema of options
//! (rate, pitch, style, ...) that can be tuned per synthesis request.

use crate::{AudioLanguage, Gender, ProviderId, VoiceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A concrete option value supplied for a voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl OptionValue {
    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Schema for one tunable voice option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceOptionSpec {
    /// A float within `[min, max]`.
    Number { min: f64, max: f64, default: f64 },
    /// An integer within `[min, max]`.
    Integer { min: i64, max: i64, default: i64 },
    /// One of a fixed set of strings.
    List { values: Vec<String>, default: String },
    /// Free-form text.
    Text { default: String },
}

/// Errors raised when an option value does not satisfy its spec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionError {
    #[error("option '{0}' is not supported by this voice")]
    Unknown(String),

    #[error("option '{name}' expects {expected}, got '{value}'")]
    WrongType {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("option '{name}' value {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("option '{name}' value '{value}' is not one of {allowed:?}")]
    NotAllowed {
        name: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl VoiceOptionSpec {
    /// Returns the value used when the option is not overridden.
    pub fn default_value(&self) -> OptionValue {
        match self {
            Self::Number { default, .. } => OptionValue::Number(*default),
            Self::Integer { default, .. } => OptionValue::Integer(*default),
            Self::List { default, .. } => OptionValue::Text(default.clone()),
            Self::Text { default } => OptionValue::Text(default.clone()),
        }
    }

    /// Checks `value` against this spec and returns it normalized to the
    /// spec's type (an integer supplied for a `Number` option becomes a float).
    pub fn check(&self, name: &str, value: &OptionValue) -> Result<OptionValue, OptionError> {
        let wrong_type = |expected| OptionError::WrongType {
            name: name.to_string(),
            expected,
            value: value.to_string(),
        };

        match self {
            Self::Number { min, max, .. } => {
                let v = value.as_f64().ok_or_else(|| wrong_type("a number"))?;
                if v < *min || v > *max {
                    return Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value: v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(OptionValue::Number(v))
            }
            Self::Integer { min, max, .. } => {
                let v = match value {
                    OptionValue::Integer(v) => *v,
                    OptionValue::Number(v) if v.fract() == 0.0 => *v as i64,
                    _ => return Err(wrong_type("an integer")),
                };
                if v < *min || v > *max {
                    return Err(OptionError::OutOfRange {
                        name: name.to_string(),
                        value: v as f64,
                        min: *min as f64,
                        max: *max as f64,
                    });
                }
                Ok(OptionValue::Integer(v))
            }
            Self::List { values, .. } => {
                let v = value.as_str().ok_or_else(|| wrong_type("a string"))?;
                if !values.iter().any(|allowed| allowed == v) {
                    return Err(OptionError::NotAllowed {
                        name: name.to_string(),
                        value: v.to_string(),
                        allowed: values.clone(),
                    });
                }
                Ok(value.clone())
            }
            Self::Text { .. } => value
                .as_str()
                .map(|_| value.clone())
                .ok_or_else(|| wrong_type("a string")),
        }
    }
}

/// A synthetic voice exposed by a provider.
///
/// Immutable once constructed. The voice catalog owns voices behind an
/// `Arc`; selection entries only hold references to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Human-readable name.
    pub name: String,
    /// Reported gender.
    pub gender: Gender,
    /// Language the voice speaks.
    pub language: AudioLanguage,
    /// Provider exposing this voice.
    pub provider: ProviderId,
    /// Provider-specific key, passed back verbatim on synthesis.
    pub voice_key: serde_json::Value,
    /// Tunable options and their schema.
    #[serde(default)]
    pub options: BTreeMap<String, VoiceOptionSpec>,
}

impl Voice {
    /// Returns the stable identity of this voice.
    pub fn id(&self) -> VoiceId {
        VoiceId::new(&self.provider, &self.voice_key)
    }

    /// Validates a single override against the schema.
    pub fn check_option(&self, name: &str, value: &OptionValue) -> Result<OptionValue, OptionError> {
        let spec = self
            .options
            .get(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))?;
        spec.check(name, value)
    }

    /// Validates a full set of overrides, returning them normalized.
    pub fn check_options(
        &self,
        options: &BTreeMap<String, OptionValue>,
    ) -> Result<BTreeMap<String, OptionValue>, OptionError> {
        options
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.check_option(name, value)?)))
            .collect()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.name, self.language, self.gender, self.provider
        )
    }
}

//! How synthesized audio is written back into a record.

use crate::error::ConfigError;
use crate::record::RecordFields;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between the pieces written into the target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorPolicy {
    #[default]
    Space,
    None,
    LineBreak,
}

impl SeparatorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Space => " ",
            Self::None => "",
            Self::LineBreak => "<br>",
        }
    }
}

/// Whether the source text is written alongside the sound tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAndSoundTag {
    #[default]
    SoundOnly,
    TextAndSound(SeparatorPolicy),
}

/// Target configuration of a batch.
///
/// | text_and_sound_tag | remove_sound_tag | new field content |
/// |---|---|---|
/// | `SoundOnly` | false | existing + audio |
/// | `SoundOnly` | true | audio |
/// | `TextAndSound` | false | existing + text + audio |
/// | `TextAndSound` | true | text + audio |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredBatchTarget", into = "StoredBatchTarget")]
pub struct BatchTarget {
    pub target_field: String,
    pub text_and_sound_tag: TextAndSoundTag,
    pub remove_sound_tag: bool,
}

impl BatchTarget {
    /// Appends a sound tag to `target_field`, keeping existing content.
    pub fn new(target_field: impl Into<String>) -> Self {
        Self {
            target_field: target_field.into(),
            text_and_sound_tag: TextAndSoundTag::SoundOnly,
            remove_sound_tag: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_field.trim().is_empty() {
            return Err(ConfigError::EmptyTargetField);
        }
        Ok(())
    }

    /// Computes the new content of the target field.
    pub fn apply(&self, existing: &str, source_text: &str, audio_reference: &str) -> String {
        let (separator, text) = match self.text_and_sound_tag {
            TextAndSoundTag::SoundOnly => (SeparatorPolicy::Space.as_str(), None),
            TextAndSoundTag::TextAndSound(policy) => (policy.as_str(), Some(source_text)),
        };

        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if !self.remove_sound_tag && !existing.is_empty() {
            parts.push(existing);
        }
        parts.extend(text);
        parts.push(audio_reference);
        parts.join(separator)
    }

    /// Applies the target to a record's fields, changing only the target
    /// field. Returns the new content, or `None` if the record has no such
    /// field.
    pub fn apply_to_record(
        &self,
        fields: &mut RecordFields,
        source_text: &str,
        audio_reference: &str,
    ) -> Option<String> {
        let slot = fields.get_mut(&self.target_field)?;
        let updated = self.apply(slot, source_text, audio_reference);
        slot.clone_from(&updated);
        Some(updated)
    }
}

impl fmt::Display for BatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target_field)
    }
}

/// Persisted shape of [`BatchTarget`]: a text-and-sound flag plus an
/// optional separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBatchTarget {
    target_field: String,
    text_and_sound_tag: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    separator: Option<SeparatorPolicy>,
    remove_sound_tag: bool,
}

impl From<StoredBatchTarget> for BatchTarget {
    fn from(stored: StoredBatchTarget) -> Self {
        let text_and_sound_tag = if stored.text_and_sound_tag {
            TextAndSoundTag::TextAndSound(stored.separator.unwrap_or_default())
        } else {
            TextAndSoundTag::SoundOnly
        };
        Self {
            target_field: stored.target_field,
            text_and_sound_tag,
            remove_sound_tag: stored.remove_sound_tag,
        }
    }
}

impl From<BatchTarget> for StoredBatchTarget {
    fn from(target: BatchTarget) -> Self {
        let (text_and_sound_tag, separator) = match target.text_and_sound_tag {
            TextAndSoundTag::SoundOnly => (false, None),
            TextAndSoundTag::TextAndSound(policy) => (true, Some(policy)),
        };
        Self {
            target_field: target.target_field,
            text_and_sound_tag,
            separator,
            remove_sound_tag: target.remove_sound_tag,
        }
    }
}

//! The voice catalog: every voice known to the configured providers.

use crate::error::VoiceError;
use hypertts_types::{AudioLanguage, ProviderId, Voice, VoiceId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Owns all known voices. Selection entries hold `Arc` references into it.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<Arc<Voice>>,
    by_id: HashMap<VoiceId, Arc<Voice>>,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog, rejecting duplicate voices.
    pub fn from_voices(voices: impl IntoIterator<Item = Voice>) -> Result<Self, VoiceError> {
        let mut catalog = Self::new();
        for voice in voices {
            catalog.insert(voice)?;
        }
        Ok(catalog)
    }

    /// Adds a voice and returns the shared handle to it.
    pub fn insert(&mut self, voice: Voice) -> Result<Arc<Voice>, VoiceError> {
        let id = voice.id();
        if self.by_id.contains_key(&id) {
            return Err(VoiceError::DuplicateVoice(id));
        }
        let voice = Arc::new(voice);
        self.voices.push(Arc::clone(&voice));
        self.by_id.insert(id, Arc::clone(&voice));
        Ok(voice)
    }

    pub fn get(&self, id: &VoiceId) -> Option<Arc<Voice>> {
        self.by_id.get(id).cloned()
    }

    /// Looks up a voice by provider and provider-specific key.
    pub fn find(
        &self,
        provider: &ProviderId,
        voice_key: &serde_json::Value,
    ) -> Option<Arc<Voice>> {
        self.get(&VoiceId::new(provider, voice_key))
    }

    /// All voices, in insertion order.
    pub fn voices(&self) -> &[Arc<Voice>] {
        &self.voices
    }

    pub fn by_provider<'a>(
        &'a self,
        provider: &'a ProviderId,
    ) -> impl Iterator<Item = &'a Arc<Voice>> + 'a {
        self.voices.iter().filter(move |v| &v.provider == provider)
    }

    pub fn by_language(&self, language: AudioLanguage) -> impl Iterator<Item = &Arc<Voice>> + '_ {
        self.voices.iter().filter(move |v| v.language == language)
    }

    /// Ids of every voice in the catalog; the default "available" set.
    pub fn ids(&self) -> HashSet<VoiceId> {
        self.by_id.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

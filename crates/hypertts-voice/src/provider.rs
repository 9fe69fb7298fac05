//! The contract every synthesis provider implements, and a registry that
//! dispatches synthesis requests to the provider owning a voice.

use crate::catalog::VoiceCatalog;
use crate::error::{ProviderError, ProviderErrorKind};
use crate::selection::VoiceWithOptions;
use async_trait::async_trait;
use hypertts_types::{ProviderId, Voice};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A text-to-speech provider.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// The provider identity voices refer to.
    fn id(&self) -> ProviderId;

    /// Lists the voices this provider exposes.
    async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError>;

    /// Synthesizes `text` with `voice`, returning encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceWithOptions)
        -> Result<Vec<u8>, ProviderError>;

    /// File extension of the audio returned by [`synthesize`](Self::synthesize).
    fn audio_extension(&self) -> &str {
        "mp3"
    }
}

/// The set of configured providers, keyed by id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, Arc<dyn SynthesisProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any previous provider with the same id.
    pub fn register(&mut self, provider: Arc<dyn SynthesisProvider>) {
        let id = provider.id();
        if self.providers.insert(id.clone(), provider).is_some() {
            tracing::warn!(provider = %id, "replaced previously registered provider");
        }
    }

    pub fn get(&self, id: &ProviderId) -> Option<&Arc<dyn SynthesisProvider>> {
        self.providers.get(id)
    }

    /// Returns the provider owning `voice`, or a `NotConfigured` error.
    pub fn provider_for(
        &self,
        voice: &VoiceWithOptions,
    ) -> Result<&Arc<dyn SynthesisProvider>, ProviderError> {
        let id = &voice.voice().provider;
        self.get(id).ok_or_else(|| {
            ProviderError::new(
                id.clone(),
                ProviderErrorKind::NotConfigured,
                format!("no provider registered for voice {}", voice.voice().name),
            )
        })
    }

    /// Synthesizes with the provider owning `voice`.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceWithOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        self.provider_for(voice)?.synthesize(text, voice).await
    }

    /// Builds a catalog from every registered provider's voice list.
    ///
    /// A provider whose listing fails contributes no voices; the failure is
    /// logged and returned alongside the catalog so the caller can surface it.
    pub async fn load_catalog(&self) -> (VoiceCatalog, Vec<ProviderError>) {
        let mut catalog = VoiceCatalog::new();
        let mut failures = Vec::new();

        for (id, provider) in &self.providers {
            match provider.list_voices().await {
                Ok(voices) => {
                    let count = voices.len();
                    for voice in voices {
                        if let Err(e) = catalog.insert(voice) {
                            tracing::warn!(provider = %id, "skipping voice: {}", e);
                        }
                    }
                    tracing::info!(provider = %id, count, "loaded provider voices");
                }
                Err(e) => {
                    tracing::error!(provider = %id, "could not get voice list: {}", e);
                    failures.push(e);
                }
            }
        }

        (catalog, failures)
    }
}

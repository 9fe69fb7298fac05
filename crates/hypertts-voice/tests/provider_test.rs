use async_trait::async_trait;
use hypertts_types::{AudioLanguage, Gender, ProviderId, Voice};
use hypertts_voice::{
    EspeakProvider, EspeakSettings, ProviderError, ProviderErrorKind, ProviderRegistry,
    SynthesisProvider, VoiceCatalog, VoiceWithOptions,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct StaticProvider {
    id: &'static str,
    voices: Vec<&'static str>,
    fail_listing: bool,
}

#[async_trait]
impl SynthesisProvider for StaticProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(self.id)
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        if self.fail_listing {
            return Err(ProviderError::new(
                self.id(),
                ProviderErrorKind::Authentication,
                "bad key",
            ));
        }
        Ok(self
            .voices
            .iter()
            .map(|name| Voice {
                name: name.to_string(),
                gender: Gender::Any,
                language: AudioLanguage::EnUs,
                provider: self.id(),
                voice_key: json!(name),
                options: Default::default(),
            })
            .collect())
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceWithOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(format!("{}:{}", voice.voice().name, text).into_bytes())
    }
}

#[tokio::test]
async fn registry_loads_catalog_from_all_providers() {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(StaticProvider {
        id: "One",
        voices: vec!["a", "b"],
        fail_listing: false,
    }));
    registry.register(Arc::new(StaticProvider {
        id: "Two",
        voices: vec!["c"],
        fail_listing: false,
    }));
    registry.register(Arc::new(StaticProvider {
        id: "Broken",
        voices: vec!["x"],
        fail_listing: true,
    }));

    let (catalog, failures) = registry.load_catalog().await;
    assert_eq!(catalog.len(), 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, ProviderId::new("Broken"));
}

#[tokio::test]
async fn registry_dispatches_to_owning_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(StaticProvider {
        id: "One",
        voices: vec!["a"],
        fail_listing: false,
    }));
    let (catalog, _) = registry.load_catalog().await;
    let voice = VoiceWithOptions::with_defaults(catalog.voices()[0].clone());

    let audio = registry.synthesize("hello", &voice).await.unwrap();
    assert_eq!(audio, b"a:hello");
}

#[tokio::test]
async fn missing_provider_is_a_fatal_error() {
    let catalog = VoiceCatalog::from_voices([Voice {
        name: "orphan".to_string(),
        gender: Gender::Any,
        language: AudioLanguage::FrFr,
        provider: ProviderId::new("Gone"),
        voice_key: json!("orphan"),
        options: Default::default(),
    }])
    .unwrap();
    let voice = VoiceWithOptions::with_defaults(catalog.voices()[0].clone());

    let err = ProviderRegistry::new()
        .synthesize("hello", &voice)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::NotConfigured);
    assert!(err.is_fatal());
}

#[tokio::test]
async fn espeak_missing_binary_is_unreachable() {
    let temp_dir = tempfile::tempdir().unwrap();
    let provider = EspeakProvider::new(EspeakSettings {
        binary: temp_dir.path().join("no-such-espeak"),
        timeout: Duration::from_secs(5),
    });

    let err = provider.list_voices().await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Unreachable);
    assert!(err.is_fatal());
}

#[tokio::test]
async fn espeak_rejects_oversized_text() {
    let provider = EspeakProvider::default();
    let voice = Arc::new(Voice {
        name: "English".to_string(),
        gender: Gender::Male,
        language: AudioLanguage::EnUs,
        provider: provider.id(),
        voice_key: json!("en-us"),
        options: Default::default(),
    });
    let text = "a".repeat(65 * 1024);

    let err = provider
        .synthesize(&text, &VoiceWithOptions::with_defaults(voice))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::InvalidInput);
    assert!(!err.is_fatal());
}

//! Runs a stored preset over a JSON record file with a scripted provider.

use async_trait::async_trait;
use hypertts_batch::{
    BatchConfig, BatchExecutor, BatchSource, BatchState, BatchTarget, RecordOutcome, RecordStore,
    SeparatorPolicy, TextAndSoundTag, TextProcessing, TextRule,
};
use hypertts_cli::store::{DirMediaStore, JsonRecordStore};
use hypertts_db::{open_preset_db, DbRuntimeSettings};
use hypertts_types::{AudioLanguage, Gender, ProviderId, RecordId, Voice};
use hypertts_voice::{
    ProviderError, ProviderRegistry, SynthesisProvider, VoiceSelection, VoiceWithOptions,
};
use serde_json::json;
use std::sync::Arc;

struct EchoProvider;

#[async_trait]
impl SynthesisProvider for EchoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("Echo")
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        Ok(vec![Voice {
            name: "Echo One".to_string(),
            gender: Gender::Any,
            language: AudioLanguage::EnUs,
            provider: self.id(),
            voice_key: json!({ "id": 1 }),
            options: Default::default(),
        }])
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceWithOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(text.as_bytes().to_vec())
    }

    fn audio_extension(&self) -> &str {
        "wav"
    }
}

#[tokio::test]
async fn stored_preset_runs_over_record_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(EchoProvider));
    let (catalog, failures) = registry.load_catalog().await;
    assert!(failures.is_empty());

    let mut text_processing = TextProcessing::new();
    text_processing.add_rule(TextRule::simple("&", "and"));
    let mut target = BatchTarget::new("Back");
    target.text_and_sound_tag = TextAndSoundTag::TextAndSound(SeparatorPolicy::Space);
    let config = BatchConfig::new("echo")
        .with_source(BatchSource::simple("Front"))
        .with_target(target)
        .with_voice_selection(VoiceSelection::single(VoiceWithOptions::with_defaults(
            catalog.voices()[0].clone(),
        )))
        .with_text_processing(text_processing);

    let pool = open_preset_db(&dir.path().join("presets.db"), DbRuntimeSettings::default())
        .expect("preset db should open");
    let conn = pool.get().expect("should get connection");
    hypertts_presets::save_preset(&conn, &config).expect("save should succeed");
    let loaded =
        hypertts_presets::load_preset(&conn, "echo", &catalog).expect("load should succeed");
    assert_eq!(loaded, config);

    let records_path = dir.path().join("records.json");
    std::fs::write(
        &records_path,
        r#"[
            {"id": 1, "fields": {"Front": "salt & pepper", "Back": ""}},
            {"id": 2, "fields": {"Front": "   ", "Back": "kept"}}
        ]"#,
    )
    .expect("should write records");
    let records = Arc::new(JsonRecordStore::open(&records_path).expect("should open records"));
    let media = Arc::new(DirMediaStore::new(dir.path().join("media")).expect("media dir"));

    let mut executor = BatchExecutor::new(
        &loaded,
        catalog.ids(),
        registry,
        records.clone(),
        media.clone(),
        Default::default(),
    )
    .expect("executor should build");
    let outcome = executor
        .run(&records.ids(), &Default::default(), None)
        .await;

    assert_eq!(outcome.state, BatchState::Completed);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.skipped, 1);

    let (_, first) = &outcome.records[0];
    let RecordOutcome::Success { audio_reference } = first else {
        panic!("record 1 should succeed, got {first:?}");
    };
    let filename = audio_reference
        .strip_prefix("[sound:")
        .and_then(|rest| rest.strip_suffix(']'))
        .expect("audio reference should be a sound tag");
    assert!(filename.ends_with(".wav"));
    let audio = std::fs::read(media.dir().join(filename)).expect("audio file should exist");
    assert_eq!(audio, b"salt and pepper");

    // The record file on disk carries the new field content.
    records.flush().expect("flush should succeed");
    let reopened = JsonRecordStore::open(&records_path).expect("should reopen records");
    let first_fields = reopened.get_fields(RecordId(1)).expect("record 1");
    assert_eq!(first_fields["Back"], format!("salt & pepper {audio_reference}"));
    assert_eq!(
        reopened.get_fields(RecordId(2)).expect("record 2")["Back"],
        "kept"
    );
}

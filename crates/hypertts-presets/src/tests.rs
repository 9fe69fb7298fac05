//! Unit tests for the preset store.

use hypertts_batch::{
    BatchConfig, BatchSource, BatchTarget, BuiltinRule, ConfigError, SeparatorPolicy,
    TextAndSoundTag, TextProcessing, TextRule,
};
use hypertts_types::{AudioLanguage, Gender, ProviderId, Voice};
use hypertts_voice::{
    VoiceCatalog, VoiceError, VoiceList, VoiceSelection, VoiceWithOptions,
    VoiceWithOptionsPriority,
};
use rusqlite::Connection;
use serde_json::json;

use crate::error::PresetError;
use crate::store::{
    delete_preset, list_presets, load_preset, load_stored_preset, preset_exists, save_preset,
};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    hypertts_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn voice(name: &str) -> Voice {
    Voice {
        name: name.to_string(),
        gender: Gender::Male,
        language: AudioLanguage::FrFr,
        provider: ProviderId::new("Espeak"),
        voice_key: json!({ "name": name }),
        options: Default::default(),
    }
}

fn catalog() -> VoiceCatalog {
    VoiceCatalog::from_voices([voice("fr"), voice("fr+m3")]).expect("should build catalog")
}

fn priority_config(name: &str, catalog: &VoiceCatalog) -> BatchConfig {
    let mut list = VoiceList::new();
    for v in catalog.voices() {
        list.add(VoiceWithOptionsPriority(VoiceWithOptions::with_defaults(v.clone())));
    }
    let mut text_processing = TextProcessing::new();
    text_processing.add_rule(TextRule::builtin(BuiltinRule::StripHtml));
    text_processing.add_rule(TextRule::simple("&nbsp;", " "));

    let mut target = BatchTarget::new("Sound");
    target.text_and_sound_tag = TextAndSoundTag::TextAndSound(SeparatorPolicy::LineBreak);

    BatchConfig::new(name)
        .with_source(BatchSource::simple("Word"))
        .with_target(target)
        .with_voice_selection(VoiceSelection::Priority(list))
        .with_text_processing(text_processing)
}

// ---- save / load -------------------------------------------------------

#[test]
fn saved_preset_loads_back_equal() {
    let conn = test_db();
    let catalog = catalog();
    let config = priority_config("french", &catalog);

    save_preset(&conn, &config).expect("save should succeed");
    let loaded = load_preset(&conn, "french", &catalog).expect("load should succeed");

    assert_eq!(loaded, config);
}

#[test]
fn saving_same_name_replaces_config() {
    let conn = test_db();
    let catalog = catalog();
    let first = priority_config("french", &catalog);
    save_preset(&conn, &first).expect("first save should succeed");

    let second = first
        .clone()
        .with_source(BatchSource::template("{Word} {Example}", Default::default()));
    save_preset(&conn, &second).expect("second save should succeed");

    let loaded = load_preset(&conn, "french", &catalog).expect("load should succeed");
    assert_eq!(loaded, second);
    assert_eq!(list_presets(&conn).expect("list should succeed").len(), 1);
}

#[test]
fn invalid_config_is_not_written() {
    let conn = test_db();
    let config = BatchConfig::new("broken").with_source(BatchSource::simple("Word"));

    let err = save_preset(&conn, &config).expect_err("save should fail");
    assert!(
        matches!(err, PresetError::Invalid(ConfigError::TargetNotSet)),
        "unexpected error: {err:?}"
    );
    assert!(!preset_exists(&conn, "broken").expect("exists should succeed"));
}

#[test]
fn load_unknown_preset_is_not_found() {
    let conn = test_db();
    let err = load_preset(&conn, "missing", &catalog()).expect_err("load should fail");
    assert!(matches!(err, PresetError::NotFound(name) if name == "missing"));
}

#[test]
fn load_fails_when_voice_left_the_catalog() {
    let conn = test_db();
    save_preset(&conn, &priority_config("french", &catalog())).expect("save should succeed");

    let shrunk = VoiceCatalog::from_voices([voice("fr")]).expect("should build catalog");
    let err = load_preset(&conn, "french", &shrunk).expect_err("load should fail");
    assert!(
        matches!(
            err,
            PresetError::Invalid(ConfigError::Voice(VoiceError::VoiceNotFound { .. }))
        ),
        "unexpected error: {err:?}"
    );

    // The raw form is still readable for repair.
    let stored = load_stored_preset(&conn, "french").expect("stored form should load");
    assert_eq!(stored.name, "french");
}

#[test]
fn corrupt_json_is_a_serialization_error() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO batch_presets (name, config_json) VALUES ('bad', '{not json')",
        [],
    )
    .expect("should insert row");

    let err = load_stored_preset(&conn, "bad").expect_err("load should fail");
    assert!(matches!(err, PresetError::Serialization(_)));
}

// ---- list / delete -----------------------------------------------------

#[test]
fn list_is_ordered_by_name() {
    let conn = test_db();
    let catalog = catalog();
    for name in ["zulu", "alpha", "mike"] {
        save_preset(&conn, &priority_config(name, &catalog)).expect("save should succeed");
    }

    let names: Vec<String> = list_presets(&conn)
        .expect("list should succeed")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["alpha", "mike", "zulu"]);
}

#[test]
fn delete_removes_preset() {
    let conn = test_db();
    save_preset(&conn, &priority_config("french", &catalog())).expect("save should succeed");

    delete_preset(&conn, "french").expect("delete should succeed");
    assert!(!preset_exists(&conn, "french").expect("exists should succeed"));

    let err = delete_preset(&conn, "french").expect_err("second delete should fail");
    assert!(matches!(err, PresetError::NotFound(_)));
}

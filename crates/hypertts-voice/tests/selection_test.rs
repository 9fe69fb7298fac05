use hypertts_types::{AudioLanguage, Gender, OptionValue, ProviderId, Voice, VoiceId, VoiceOptionSpec};
use hypertts_voice::{
    SelectionError, StoredVoiceSelection, VoiceCatalog, VoiceError, VoiceList, VoiceSelection,
    VoiceWithOptions, VoiceWithOptionsPriority, VoiceWithOptionsRandom,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

fn make_voice(name: &str) -> Voice {
    let mut options = BTreeMap::new();
    options.insert(
        "rate".to_string(),
        VoiceOptionSpec::Number {
            min: 0.5,
            max: 3.0,
            default: 1.0,
        },
    );
    Voice {
        name: name.to_string(),
        gender: Gender::Male,
        language: AudioLanguage::EnGb,
        provider: ProviderId::new("Azure"),
        voice_key: json!({ "name": name }),
        options,
    }
}

fn catalog() -> VoiceCatalog {
    VoiceCatalog::from_voices([make_voice("A"), make_voice("B"), make_voice("C")])
        .expect("catalog should build")
}

fn entry(catalog: &VoiceCatalog, name: &str) -> VoiceWithOptions {
    let voice = catalog
        .find(&ProviderId::new("Azure"), &json!({ "name": name }))
        .expect("voice should exist");
    VoiceWithOptions::with_defaults(voice)
}

fn id(catalog: &VoiceCatalog, name: &str) -> VoiceId {
    entry(catalog, name).voice_id().clone()
}

fn priority(catalog: &VoiceCatalog, names: &[&str]) -> VoiceSelection {
    let mut list = VoiceList::new();
    for name in names {
        list.add(VoiceWithOptionsPriority(entry(catalog, name)));
    }
    VoiceSelection::Priority(list)
}

fn random(catalog: &VoiceCatalog, weights: &[(&str, f64)]) -> VoiceSelection {
    let mut list = VoiceList::new();
    for (name, weight) in weights {
        list.add(VoiceWithOptionsRandom::new(entry(catalog, name), *weight).unwrap());
    }
    VoiceSelection::Random(list)
}

// -----------------------------------------------------------------------
// Single
// -----------------------------------------------------------------------

#[test]
fn single_returns_configured_voice_when_available() {
    let catalog = catalog();
    let selection = VoiceSelection::single(entry(&catalog, "A"));
    let mut rng = StdRng::seed_from_u64(1);

    let chosen = selection.resolve(&catalog.ids(), &mut rng).unwrap();
    assert_eq!(chosen.voice().name, "A");

    let err = selection.resolve(&HashSet::new(), &mut rng).unwrap_err();
    assert_eq!(err, SelectionError::NoVoicesAvailable);
}

#[test]
fn unset_single_fails_with_voice_not_set() {
    let mut rng = StdRng::seed_from_u64(1);
    let err = VoiceSelection::Single(None)
        .resolve(&catalog().ids(), &mut rng)
        .unwrap_err();
    assert_eq!(err, SelectionError::VoiceNotSet);
}

// -----------------------------------------------------------------------
// Priority
// -----------------------------------------------------------------------

#[test]
fn priority_skips_unavailable_first_entry() {
    let catalog = catalog();
    let selection = priority(&catalog, &["A", "B"]);
    let mut rng = StdRng::seed_from_u64(1);

    let all = catalog.ids();
    assert_eq!(selection.resolve(&all, &mut rng).unwrap().voice().name, "A");

    let only_b: HashSet<VoiceId> = [id(&catalog, "B")].into_iter().collect();
    assert_eq!(
        selection.resolve(&only_b, &mut rng).unwrap().voice().name,
        "B"
    );

    let none: HashSet<VoiceId> = [id(&catalog, "C")].into_iter().collect();
    assert_eq!(
        selection.resolve(&none, &mut rng).unwrap_err(),
        SelectionError::NoVoicesAvailable
    );
}

#[test]
fn priority_resolve_excluding_falls_through_the_list() {
    let catalog = catalog();
    let selection = priority(&catalog, &["A", "B", "C"]);
    let mut rng = StdRng::seed_from_u64(1);
    let excluded: HashSet<VoiceId> = [id(&catalog, "A"), id(&catalog, "B")].into_iter().collect();

    let chosen = selection
        .resolve_excluding(&catalog.ids(), &excluded, &mut rng)
        .unwrap();
    assert_eq!(chosen.voice().name, "C");
}

#[test]
fn priority_order_follows_move_operations() {
    let catalog = catalog();
    let mut selection = priority(&catalog, &["A", "B"]);
    if let VoiceSelection::Priority(list) = &mut selection {
        list.move_down(0);
    }
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(
        selection.resolve(&catalog.ids(), &mut rng).unwrap().voice().name,
        "B"
    );
}

// -----------------------------------------------------------------------
// Random
// -----------------------------------------------------------------------

#[test]
fn random_only_draws_from_available_voices() {
    let catalog = catalog();
    let selection = random(&catalog, &[("A", 1.0), ("B", 3.0)]);
    let only_b: HashSet<VoiceId> = [id(&catalog, "B")].into_iter().collect();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..1_000 {
        let chosen = selection.resolve(&only_b, &mut rng).unwrap();
        assert_eq!(chosen.voice().name, "B");
    }
}

#[test]
fn random_selection_respects_weights() {
    let catalog = catalog();
    let selection = random(&catalog, &[("A", 1.0), ("B", 3.0)]);
    let available = catalog.ids();
    let mut rng = StdRng::seed_from_u64(42);

    let draws = 10_000;
    let b_count = (0..draws)
        .filter(|_| selection.resolve(&available, &mut rng).unwrap().voice().name == "B")
        .count();
    let fraction = b_count as f64 / draws as f64;
    assert!(
        (0.70..=0.80).contains(&fraction),
        "B fraction {fraction} outside [0.70, 0.80]"
    );
}

#[test]
fn unavailable_voice_does_not_skew_remaining_proportions() {
    let catalog = catalog();
    let selection = random(&catalog, &[("A", 1.0), ("B", 3.0), ("C", 100.0)]);
    let available: HashSet<VoiceId> = [id(&catalog, "A"), id(&catalog, "B")].into_iter().collect();
    let mut rng = StdRng::seed_from_u64(99);

    let draws = 10_000;
    let b_count = (0..draws)
        .filter(|_| selection.resolve(&available, &mut rng).unwrap().voice().name == "B")
        .count();
    let fraction = b_count as f64 / draws as f64;
    assert!((0.70..=0.80).contains(&fraction), "B fraction {fraction}");
}

#[test]
fn random_with_nothing_available_fails() {
    let catalog = catalog();
    let selection = random(&catalog, &[("A", 1.0)]);
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(
        selection.resolve(&HashSet::new(), &mut rng).unwrap_err(),
        SelectionError::NoVoicesAvailable
    );
}

// -----------------------------------------------------------------------
// Persistence
// -----------------------------------------------------------------------

#[test]
fn stored_random_selection_keeps_weights_and_options() {
    let catalog = catalog();
    let mut tuned = entry(&catalog, "A");
    tuned.set_option("rate", OptionValue::Number(1.5)).unwrap();
    let mut list = VoiceList::new();
    list.add(VoiceWithOptionsRandom::new(tuned, 2.0).unwrap());
    list.add(VoiceWithOptionsRandom::new(entry(&catalog, "B"), 5.0).unwrap());
    let selection = VoiceSelection::Random(list);

    let stored = selection.to_stored().unwrap();
    let value = serde_json::to_value(&stored).unwrap();
    assert_eq!(value["voice_selection_mode"], "random");
    assert_eq!(value["voice_list"][0]["weight"], 2.0);
    assert_eq!(value["voice_list"][0]["options"]["rate"], 1.5);
    assert_eq!(value["voice_list"][1]["voice"]["name"], "B");

    let parsed: StoredVoiceSelection = serde_json::from_value(value).unwrap();
    let restored = VoiceSelection::from_stored(&parsed, &catalog).unwrap();
    assert_eq!(restored, selection);
}

#[test]
fn stored_priority_entries_omit_weight() {
    let catalog = catalog();
    let value = serde_json::to_value(priority(&catalog, &["A"]).to_stored().unwrap()).unwrap();
    assert_eq!(value["voice_selection_mode"], "priority");
    assert!(value["voice_list"][0].get("weight").is_none());
}

#[test]
fn missing_weight_defaults_to_one() {
    let catalog = catalog();
    let value = json!({
        "voice_selection_mode": "random",
        "voice_list": [{
            "voice": {
                "provider": "Azure",
                "voice_key": {"name": "C"},
                "name": "C",
                "gender": "Male",
                "language": "en_GB"
            }
        }]
    });
    let stored: StoredVoiceSelection = serde_json::from_value(value).unwrap();
    match VoiceSelection::from_stored(&stored, &catalog).unwrap() {
        VoiceSelection::Random(list) => assert_eq!(list.entries()[0].random_weight(), 1.0),
        other => panic!("expected random selection, got {other:?}"),
    }
}

#[test]
fn stored_voice_missing_from_catalog_is_reported() {
    let stored = priority(&catalog(), &["A"]).to_stored().unwrap();
    let smaller = VoiceCatalog::from_voices([make_voice("B")]).unwrap();
    let err = VoiceSelection::from_stored(&stored, &smaller).unwrap_err();
    assert!(matches!(err, VoiceError::VoiceNotFound { ref name, .. } if name == "A"));
}

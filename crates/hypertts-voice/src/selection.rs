//! Voice selection strategies.
//!
//! A [`VoiceSelection`] decides which voice synthesizes a given request:
//!
//! | Mode | Behavior |
//! |------|----------|
//! | `Single` | always the configured voice |
//! | `Priority` | the first list entry whose voice is available |
//! | `Random` | a weighted draw among available entries |
//!
//! "Available" is always supplied by the caller as a set of [`VoiceId`]s;
//! the strategies never infer provider health on their own.

use crate::catalog::VoiceCatalog;
use crate::error::{SelectionError, VoiceError};
use hypertts_types::{AudioLanguage, Gender, OptionValue, ProviderId, Voice, VoiceId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A voice plus per-request option overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceWithOptions {
    voice: Arc<Voice>,
    voice_id: VoiceId,
    options: BTreeMap<String, OptionValue>,
}

impl VoiceWithOptions {
    /// Creates an entry, validating every override against the voice schema.
    pub fn new(
        voice: Arc<Voice>,
        options: BTreeMap<String, OptionValue>,
    ) -> Result<Self, SelectionError> {
        let options = voice.check_options(&options)?;
        let voice_id = voice.id();
        Ok(Self {
            voice,
            voice_id,
            options,
        })
    }

    /// An entry using only schema defaults.
    pub fn with_defaults(voice: Arc<Voice>) -> Self {
        let voice_id = voice.id();
        Self {
            voice,
            voice_id,
            options: BTreeMap::new(),
        }
    }

    pub fn voice(&self) -> &Arc<Voice> {
        &self.voice
    }

    pub fn voice_id(&self) -> &VoiceId {
        &self.voice_id
    }

    /// The explicit overrides only.
    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    /// Overrides merged over the schema defaults.
    pub fn effective_options(&self) -> BTreeMap<String, OptionValue> {
        self.voice
            .options
            .iter()
            .map(|(name, spec)| {
                let value = self
                    .options
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| spec.default_value());
                (name.clone(), value)
            })
            .collect()
    }

    /// The effective value of a single option, if the voice has it.
    pub fn option(&self, name: &str) -> Option<OptionValue> {
        self.options.get(name).cloned().or_else(|| {
            self.voice
                .options
                .get(name)
                .map(|spec| spec.default_value())
        })
    }

    pub fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), SelectionError> {
        let value = self.voice.check_option(name, &value)?;
        self.options.insert(name.to_string(), value);
        Ok(())
    }

    pub fn clear_option(&mut self, name: &str) {
        self.options.remove(name);
    }

    fn options_summary(&self) -> String {
        let changed: Vec<String> = self
            .options
            .iter()
            .filter(|(name, value)| {
                self.voice
                    .options
                    .get(*name)
                    .map_or(true, |spec| spec.default_value() != **value)
            })
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        if changed.is_empty() {
            String::new()
        } else {
            format!(" ({})", changed.join(", "))
        }
    }
}

impl fmt::Display for VoiceWithOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.voice, self.options_summary())
    }
}

/// Access to the voice of a list entry, shared by both list flavors.
pub trait ListEntry {
    fn voice_with_options(&self) -> &VoiceWithOptions;
}

/// A Priority list entry. Its position in the list is its priority.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceWithOptionsPriority(pub VoiceWithOptions);

impl ListEntry for VoiceWithOptionsPriority {
    fn voice_with_options(&self) -> &VoiceWithOptions {
        &self.0
    }
}

/// A Random list entry with its draw weight.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceWithOptionsRandom {
    voice: VoiceWithOptions,
    random_weight: f64,
}

impl VoiceWithOptionsRandom {
    pub fn new(voice: VoiceWithOptions, random_weight: f64) -> Result<Self, SelectionError> {
        check_weight(random_weight)?;
        Ok(Self {
            voice,
            random_weight,
        })
    }

    pub fn random_weight(&self) -> f64 {
        self.random_weight
    }

    pub fn set_random_weight(&mut self, weight: f64) -> Result<(), SelectionError> {
        check_weight(weight)?;
        self.random_weight = weight;
        Ok(())
    }
}

impl ListEntry for VoiceWithOptionsRandom {
    fn voice_with_options(&self) -> &VoiceWithOptions {
        &self.voice
    }
}

fn check_weight(weight: f64) -> Result<(), SelectionError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(SelectionError::InvalidWeight(weight))
    }
}

/// An ordered list of voices. Order is preserved by every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceList<E> {
    entries: Vec<E>,
}

impl<E> Default for VoiceList<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: ListEntry> VoiceList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, entry: E) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, index: usize) -> Result<E, SelectionError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    /// Swaps the entry with its predecessor. No-op on the first entry or an
    /// out-of-range index.
    pub fn move_up(&mut self, index: usize) {
        if index == 0 || index >= self.entries.len() {
            return;
        }
        self.entries.swap(index - 1, index);
    }

    /// Swaps the entry with its successor. No-op on the last entry or an
    /// out-of-range index.
    pub fn move_down(&mut self, index: usize) {
        if index >= self.entries.len().saturating_sub(1) {
            return;
        }
        self.entries.swap(index, index + 1);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn voices(&self) -> impl Iterator<Item = &VoiceWithOptions> {
        self.entries.iter().map(E::voice_with_options)
    }

    fn check_index(&self, index: usize) -> Result<(), SelectionError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(SelectionError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }
}

impl VoiceList<VoiceWithOptionsRandom> {
    pub fn set_random_weight(&mut self, index: usize, weight: f64) -> Result<(), SelectionError> {
        self.check_index(index)?;
        self.entries[index].set_random_weight(weight)
    }
}

/// The selection mode tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceSelectionMode {
    Single,
    Priority,
    Random,
}

impl VoiceSelectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Priority => "priority",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for VoiceSelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the voice for a synthesis request is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceSelection {
    Single(Option<VoiceWithOptions>),
    Priority(VoiceList<VoiceWithOptionsPriority>),
    Random(VoiceList<VoiceWithOptionsRandom>),
}

impl Default for VoiceSelection {
    fn default() -> Self {
        Self::Single(None)
    }
}

impl VoiceSelection {
    pub fn single(voice: VoiceWithOptions) -> Self {
        Self::Single(Some(voice))
    }

    pub fn mode(&self) -> VoiceSelectionMode {
        match self {
            Self::Single(_) => VoiceSelectionMode::Single,
            Self::Priority(_) => VoiceSelectionMode::Priority,
            Self::Random(_) => VoiceSelectionMode::Random,
        }
    }

    /// Checks the selection is usable: Single set, lists non-empty.
    pub fn validate(&self) -> Result<(), SelectionError> {
        match self {
            Self::Single(None) => Err(SelectionError::VoiceNotSet),
            Self::Single(Some(_)) => Ok(()),
            Self::Priority(list) if list.is_empty() => Err(SelectionError::EmptyVoiceList),
            Self::Random(list) if list.is_empty() => Err(SelectionError::EmptyVoiceList),
            Self::Priority(_) | Self::Random(_) => Ok(()),
        }
    }

    /// Every configured voice, in list order.
    pub fn voices(&self) -> Vec<&VoiceWithOptions> {
        match self {
            Self::Single(voice) => voice.iter().collect(),
            Self::Priority(list) => list.voices().collect(),
            Self::Random(list) => list.voices().collect(),
        }
    }

    /// Ids of every configured voice.
    pub fn voice_ids(&self) -> HashSet<VoiceId> {
        self.voices()
            .into_iter()
            .map(|v| v.voice_id().clone())
            .collect()
    }

    /// Chooses a voice among those in `available`.
    ///
    /// # Errors
    ///
    /// `VoiceNotSet` / `EmptyVoiceList` for an unusable configuration,
    /// `NoVoicesAvailable` when no configured voice is in `available`.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        available: &HashSet<VoiceId>,
        rng: &mut R,
    ) -> Result<&VoiceWithOptions, SelectionError> {
        self.resolve_excluding(available, &HashSet::new(), rng)
    }

    /// Like [`resolve`](Self::resolve), additionally skipping `excluded`
    /// voices (those that already failed for the current request).
    pub fn resolve_excluding<R: Rng + ?Sized>(
        &self,
        available: &HashSet<VoiceId>,
        excluded: &HashSet<VoiceId>,
        rng: &mut R,
    ) -> Result<&VoiceWithOptions, SelectionError> {
        self.validate()?;
        let usable =
            |v: &VoiceWithOptions| available.contains(v.voice_id()) && !excluded.contains(v.voice_id());

        match self {
            Self::Single(voice) => voice
                .as_ref()
                .filter(|v| usable(*v))
                .ok_or(SelectionError::NoVoicesAvailable),
            Self::Priority(list) => list
                .voices()
                .find(|v| usable(*v))
                .ok_or(SelectionError::NoVoicesAvailable),
            Self::Random(list) => {
                let candidates: Vec<&VoiceWithOptionsRandom> = list
                    .entries()
                    .iter()
                    .filter(|e| usable(&e.voice))
                    .collect();
                if candidates.is_empty() {
                    return Err(SelectionError::NoVoicesAvailable);
                }
                let dist = WeightedIndex::new(candidates.iter().map(|e| e.random_weight))
                    .map_err(|_| SelectionError::NoVoicesAvailable)?;
                Ok(&candidates[dist.sample(rng)].voice)
            }
        }
    }

    /// Converts to the persisted form. Fails if the selection is unusable.
    pub fn to_stored(&self) -> Result<StoredVoiceSelection, SelectionError> {
        self.validate()?;
        Ok(match self {
            Self::Single(voice) => StoredVoiceSelection::Single {
                voice: StoredVoiceWithOptions::from_voice(
                    voice.as_ref().ok_or(SelectionError::VoiceNotSet)?,
                    None,
                ),
            },
            Self::Priority(list) => StoredVoiceSelection::Priority {
                voice_list: list
                    .voices()
                    .map(|v| StoredVoiceWithOptions::from_voice(v, None))
                    .collect(),
            },
            Self::Random(list) => StoredVoiceSelection::Random {
                voice_list: list
                    .entries()
                    .iter()
                    .map(|e| StoredVoiceWithOptions::from_voice(&e.voice, Some(e.random_weight)))
                    .collect(),
            },
        })
    }

    /// Rebuilds a selection from its persisted form, resolving each voice
    /// against `catalog`.
    pub fn from_stored(
        stored: &StoredVoiceSelection,
        catalog: &VoiceCatalog,
    ) -> Result<Self, VoiceError> {
        match stored {
            StoredVoiceSelection::Single { voice } => {
                Ok(Self::Single(Some(voice.resolve(catalog)?)))
            }
            StoredVoiceSelection::Priority { voice_list } => {
                let mut list = VoiceList::new();
                for entry in voice_list {
                    list.add(VoiceWithOptionsPriority(entry.resolve(catalog)?));
                }
                Ok(Self::Priority(list))
            }
            StoredVoiceSelection::Random { voice_list } => {
                let mut list = VoiceList::new();
                for entry in voice_list {
                    let voice = entry.resolve(catalog)?;
                    list.add(VoiceWithOptionsRandom::new(voice, entry.weight.unwrap_or(1.0))?);
                }
                Ok(Self::Random(list))
            }
        }
    }
}

impl fmt::Display for VoiceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(_) => f.write_str("Single"),
            Self::Priority(list) => write!(f, "priority ({} voices)", list.len()),
            Self::Random(list) => write!(f, "random ({} voices)", list.len()),
        }
    }
}

/// Persisted reference to a catalog voice.
///
/// Carries the descriptive fields too so a preset stays readable, but only
/// `provider` and `voice_key` are used to find the voice again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVoice {
    pub provider: ProviderId,
    pub voice_key: serde_json::Value,
    pub name: String,
    pub gender: Gender,
    pub language: AudioLanguage,
}

/// Persisted voice entry with overrides and, for Random lists, its weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVoiceWithOptions {
    pub voice: StoredVoice,
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl StoredVoiceWithOptions {
    fn from_voice(voice: &VoiceWithOptions, weight: Option<f64>) -> Self {
        let v = voice.voice();
        Self {
            voice: StoredVoice {
                provider: v.provider.clone(),
                voice_key: v.voice_key.clone(),
                name: v.name.clone(),
                gender: v.gender,
                language: v.language,
            },
            options: voice.options().clone(),
            weight,
        }
    }

    fn resolve(&self, catalog: &VoiceCatalog) -> Result<VoiceWithOptions, VoiceError> {
        let voice = catalog
            .find(&self.voice.provider, &self.voice.voice_key)
            .ok_or_else(|| VoiceError::VoiceNotFound {
                provider: self.voice.provider.clone(),
                name: self.voice.name.clone(),
            })?;
        Ok(VoiceWithOptions::new(voice, self.options.clone())?)
    }
}

/// Persisted voice selection, tagged by `voice_selection_mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "voice_selection_mode", rename_all = "snake_case")]
pub enum StoredVoiceSelection {
    Single {
        voice: StoredVoiceWithOptions,
    },
    Priority {
        voice_list: Vec<StoredVoiceWithOptions>,
    },
    Random {
        voice_list: Vec<StoredVoiceWithOptions>,
    },
}

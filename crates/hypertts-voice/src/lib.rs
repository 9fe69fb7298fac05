//! Voices, voice selection, and synthesis providers for HyperTTS.
//!
//! - [`VoiceCatalog`] owns every voice the configured providers expose.
//! - [`VoiceSelection`] chooses which voice synthesizes a request (single
//!   voice, priority list, or weighted random list).
//! - [`SynthesisProvider`] is the contract each TTS provider implements;
//!   [`ProviderRegistry`] dispatches a request to the provider owning the
//!   selected voice.
//!
//! The only provider shipped here is [`EspeakProvider`], which drives the
//! local `espeak-ng` binary. Network providers implement the same trait.

pub mod catalog;
pub mod error;
pub mod espeak;
pub mod provider;
pub mod selection;

pub use catalog::VoiceCatalog;
pub use error::{ProviderError, ProviderErrorKind, SelectionError, VoiceError};
pub use espeak::{EspeakProvider, EspeakSettings, ESPEAK_PROVIDER};
pub use provider::{ProviderRegistry, SynthesisProvider};
pub use selection::{
    ListEntry, StoredVoice, StoredVoiceSelection, StoredVoiceWithOptions, VoiceList,
    VoiceSelection, VoiceSelectionMode, VoiceWithOptions, VoiceWithOptionsPriority,
    VoiceWithOptionsRandom,
};

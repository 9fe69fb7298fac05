//! Audio file naming and sound tags.

use hypertts_voice::VoiceWithOptions;
use sha2::{Digest, Sha256};

const FILENAME_PREFIX: &str = "hypertts-";

/// Content-addressed file name for audio synthesized from `text` with
/// `voice`.
///
/// The hash covers provider, voice key, effective options and text, so the
/// same request always maps to the same file and any change to the voice
/// configuration produces a new one.
pub fn audio_filename(voice: &VoiceWithOptions, text: &str, extension: &str) -> String {
    let v = voice.voice();
    let mut hasher = Sha256::new();
    hasher.update(v.provider.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(v.voice_key.to_string().as_bytes());
    hasher.update([0]);
    for (name, value) in voice.effective_options() {
        hasher.update(format!("{name}={value};").as_bytes());
    }
    hasher.update([0]);
    hasher.update(text.as_bytes());
    format!("{FILENAME_PREFIX}{}.{extension}", hex::encode(hasher.finalize()))
}

/// The reference inserted into a field to play `filename`.
pub fn sound_tag(filename: &str) -> String {
    format!("[sound:{filename}]")
}

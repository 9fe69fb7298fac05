//! Local `espeak-ng` provider.
//!
//! Runs the `espeak-ng` binary as a subprocess. Voices come from
//! `espeak-ng --voices`; synthesis writes WAV to stdout via `--stdout`.

use crate::error::{ProviderError, ProviderErrorKind};
use crate::provider::SynthesisProvider;
use crate::selection::VoiceWithOptions;
use async_trait::async_trait;
use hypertts_types::{AudioLanguage, Gender, ProviderId, Voice, VoiceOptionSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Provider id used by espeak-ng voices.
pub const ESPEAK_PROVIDER: &str = "ESpeakNg";

/// Maximum text input size for a single synthesis call (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

const DEFAULT_RATE_WPM: i64 = 175;
const DEFAULT_PITCH: i64 = 50;

/// espeak-ng language codes whose locale cannot be derived mechanically.
const AUDIO_LANGUAGE_OVERRIDES: &[(&str, AudioLanguage)] = &[
    ("en", AudioLanguage::EnUs),
    ("en-us", AudioLanguage::EnUs),
    ("en-029", AudioLanguage::EnUs),
    ("vi-vn-x-south", AudioLanguage::ViVn),
    ("vi-vn-x-central", AudioLanguage::ViVn),
    ("es", AudioLanguage::EsEs),
    ("es-419", AudioLanguage::EsMx),
    ("fr", AudioLanguage::FrFr),
    ("fr-be", AudioLanguage::FrFr),
    ("pt", AudioLanguage::PtPt),
    ("de", AudioLanguage::DeDe),
    ("ar", AudioLanguage::ArSa),
    ("cmn", AudioLanguage::ZhCn),
    ("yue", AudioLanguage::ZhHk),
    ("nb", AudioLanguage::NbNo),
];

/// Runtime settings for the espeak-ng provider.
#[derive(Debug, Clone)]
pub struct EspeakSettings {
    /// Path to (or name of) the `espeak-ng` binary.
    pub binary: PathBuf,
    /// Timeout for a single subprocess invocation.
    pub timeout: Duration,
}

impl Default for EspeakSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("espeak-ng"),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Synthesis provider backed by the `espeak-ng` command line tool.
#[derive(Debug, Clone, Default)]
pub struct EspeakProvider {
    settings: EspeakSettings,
}

impl EspeakProvider {
    pub fn new(settings: EspeakSettings) -> Self {
        Self { settings }
    }

    fn error(&self, kind: ProviderErrorKind, message: impl Into<String>) -> ProviderError {
        ProviderError::new(self.id(), kind, message)
    }

    async fn run(&self, command: &mut Command, what: &str) -> Result<Vec<u8>, ProviderError> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            self.error(
                ProviderErrorKind::Unreachable,
                format!("failed to spawn {:?}: {}", self.settings.binary, e),
            )
        })?;

        let output = tokio::time::timeout(self.settings.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                self.error(
                    ProviderErrorKind::Timeout,
                    format!("{} timed out after {:?}", what, self.settings.timeout),
                )
            })?
            .map_err(|e| {
                self.error(
                    ProviderErrorKind::Other,
                    format!("failed to wait for espeak-ng: {}", e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.error(
                ProviderErrorKind::Other,
                format!("{} failed: {}", what, stderr.trim()),
            ));
        }

        Ok(output.stdout)
    }
}

/// Maps an espeak-ng language code (`en-us`, `fr`, `pt-br`) to a locale.
pub fn audio_language_for(espeak_language: &str) -> Option<AudioLanguage> {
    let code = espeak_language.to_ascii_lowercase();
    if let Some((_, language)) = AUDIO_LANGUAGE_OVERRIDES.iter().find(|(c, _)| *c == code) {
        return Some(*language);
    }

    let mut parts = code.split('-');
    let lang = parts.next()?;
    match parts.next() {
        Some(region) if region.len() == 2 => format!("{}_{}", lang, region.to_ascii_uppercase())
            .parse()
            .ok(),
        _ => AudioLanguage::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().split('_').next() == Some(lang)),
    }
}

fn voice_options() -> BTreeMap<String, VoiceOptionSpec> {
    let mut options = BTreeMap::new();
    options.insert(
        "rate".to_string(),
        VoiceOptionSpec::Integer {
            min: 80,
            max: 450,
            default: DEFAULT_RATE_WPM,
        },
    );
    options.insert(
        "pitch".to_string(),
        VoiceOptionSpec::Integer {
            min: 0,
            max: 99,
            default: DEFAULT_PITCH,
        },
    );
    options
}

/// Parses the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 10)
/// ```
///
/// Voices whose language has no known locale are skipped.
pub fn parse_voice_list(output: &str) -> Vec<Voice> {
    let provider = ProviderId::new(ESPEAK_PROVIDER);
    let mut voices = Vec::new();

    for line in output.lines().skip(1) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 4 {
            continue;
        }
        let espeak_language = columns[1];
        let gender = match columns[2].rsplit('/').next() {
            Some("M") => Gender::Male,
            Some("F") => Gender::Female,
            _ => Gender::Any,
        };

        let Some(language) = audio_language_for(espeak_language) else {
            tracing::warn!(language = espeak_language, "language not recognized, skipping voice");
            continue;
        };

        voices.push(Voice {
            name: columns[3].replace('_', " "),
            gender,
            language,
            provider: provider.clone(),
            voice_key: serde_json::Value::String(espeak_language.to_string()),
            options: voice_options(),
        });
    }

    voices
}

#[async_trait]
impl SynthesisProvider for EspeakProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ESPEAK_PROVIDER)
    }

    async fn list_voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let mut command = Command::new(&self.settings.binary);
        command.arg("--voices");
        let stdout = self.run(&mut command, "espeak-ng --voices").await?;
        Ok(parse_voice_list(&String::from_utf8_lossy(&stdout)))
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceWithOptions,
    ) -> Result<Vec<u8>, ProviderError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(self.error(
                ProviderErrorKind::InvalidInput,
                format!(
                    "text exceeds maximum size: {} bytes (limit: {} bytes)",
                    text.len(),
                    MAX_TTS_INPUT_BYTES
                ),
            ));
        }

        let voice_key = voice.voice().voice_key.as_str().ok_or_else(|| {
            self.error(
                ProviderErrorKind::InvalidInput,
                format!("voice key for {} is not a language code", voice.voice().name),
            )
        })?;

        let rate = voice
            .option("rate")
            .and_then(|v| v.as_f64())
            .map_or(DEFAULT_RATE_WPM, |v| v as i64);
        let pitch = voice
            .option("pitch")
            .and_then(|v| v.as_f64())
            .map_or(DEFAULT_PITCH, |v| v as i64);

        let mut command = Command::new(&self.settings.binary);
        command
            .arg("-v")
            .arg(voice_key)
            .arg("-s")
            .arg(rate.to_string())
            .arg("-p")
            .arg(pitch.to_string())
            .arg("--stdout")
            // Card text may start with '-'.
            .arg("--")
            .arg(text);

        tracing::debug!(voice = voice_key, rate, pitch, "running espeak-ng");
        let wav = self.run(&mut command, "espeak-ng synthesis").await?;
        if wav.is_empty() {
            return Err(self.error(
                ProviderErrorKind::NotFound,
                "espeak-ng produced no audio",
            ));
        }
        Ok(wav)
    }

    fn audio_extension(&self) -> &str {
        "wav"
    }
}

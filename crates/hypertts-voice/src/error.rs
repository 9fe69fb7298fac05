use hypertts_types::{OptionError, ProviderId, VoiceId};
use std::fmt;
use thiserror::Error;

/// Errors raised while configuring or resolving a voice selection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("no voice has been selected")]
    VoiceNotSet,

    #[error("the voice list is empty")]
    EmptyVoiceList,

    #[error("none of the configured voices are available")]
    NoVoicesAvailable,

    #[error("voice list index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("random weight must be a positive number, got {0}")]
    InvalidWeight(f64),

    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Errors raised by the voice catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("voice not found: {name} ({provider})")]
    VoiceNotFound { provider: ProviderId, name: String },

    #[error("duplicate voice in catalog: {0}")]
    DuplicateVoice(VoiceId),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Credentials were rejected.
    Authentication,
    /// The provider cannot be reached at all (binary missing, service down).
    Unreachable,
    /// No provider is registered for the requested voice.
    NotConfigured,
    RateLimited,
    Timeout,
    /// The provider has no audio for this text/voice combination.
    NotFound,
    /// The request was rejected as malformed (e.g. text too long).
    InvalidInput,
    Other,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication failure",
            Self::Unreachable => "unreachable",
            Self::NotConfigured => "not configured",
            Self::RateLimited => "rate limited",
            Self::Timeout => "timeout",
            Self::NotFound => "audio not found",
            Self::InvalidInput => "invalid input",
            Self::Other => "error",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synthesis or voice-listing failure reported by a provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: ProviderId,
    pub kind: ProviderErrorKind,
    /// Upstream status code, when the provider has one.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderId, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether this failure will recur for every remaining record, so a
    /// batch run should stop rather than continue record by record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::Authentication
                | ProviderErrorKind::Unreachable
                | ProviderErrorKind::NotConfigured
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let provider = ProviderId::new("Azure");
        let fatal = [
            ProviderErrorKind::Authentication,
            ProviderErrorKind::Unreachable,
            ProviderErrorKind::NotConfigured,
        ];
        let per_record = [
            ProviderErrorKind::RateLimited,
            ProviderErrorKind::Timeout,
            ProviderErrorKind::NotFound,
            ProviderErrorKind::InvalidInput,
            ProviderErrorKind::Other,
        ];
        for kind in fatal {
            assert!(ProviderError::new(provider.clone(), kind, "x").is_fatal());
        }
        for kind in per_record {
            assert!(!ProviderError::new(provider.clone(), kind, "x").is_fatal());
        }
    }

    #[test]
    fn provider_error_message() {
        let err = ProviderError::new(
            ProviderId::new("Azure"),
            ProviderErrorKind::Authentication,
            "status code 401: Unauthorized",
        )
        .with_status(401);
        assert_eq!(
            err.to_string(),
            "Azure authentication failure: status code 401: Unauthorized"
        );
        assert_eq!(err.status, Some(401));
    }
}

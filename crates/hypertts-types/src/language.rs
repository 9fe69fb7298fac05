//! Audio language (locale) codes for voices.

use serde::{Deserialize, Serialize};

macro_rules! audio_languages {
    ($($variant:ident => $code:literal, $label:literal;)+) => {
        /// Locale a voice speaks, e.g. `en_US` or `fr_FR`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum AudioLanguage {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl AudioLanguage {
            /// Every supported language, in declaration order.
            pub const ALL: &'static [AudioLanguage] = &[$(AudioLanguage::$variant),+];

            /// Returns the canonical locale code, e.g. `"en_US"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Returns the human-readable language name.
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl std::str::FromStr for AudioLanguage {
            type Err = ParseAudioLanguageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Accept both `en_US` and `en-US`.
                let normalized = s.replace('-', "_");
                match normalized.as_str() {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(ParseAudioLanguageError(s.to_string())),
                }
            }
        }
    };
}

audio_languages! {
    ArEg => "ar_EG", "Arabic (Egypt)";
    ArSa => "ar_SA", "Arabic (Saudi Arabia)";
    BgBg => "bg_BG", "Bulgarian";
    CaEs => "ca_ES", "Catalan";
    CsCz => "cs_CZ", "Czech";
    DaDk => "da_DK", "Danish";
    DeAt => "de_AT", "German (Austria)";
    DeDe => "de_DE", "German (Germany)";
    ElGr => "el_GR", "Greek";
    EnAu => "en_AU", "English (Australia)";
    EnCa => "en_CA", "English (Canada)";
    EnGb => "en_GB", "English (UK)";
    EnIn => "en_IN", "English (India)";
    EnUs => "en_US", "English (US)";
    EsEs => "es_ES", "Spanish (Spain)";
    EsMx => "es_MX", "Spanish (Mexico)";
    FiFi => "fi_FI", "Finnish";
    FrCa => "fr_CA", "French (Canada)";
    FrFr => "fr_FR", "French (France)";
    HeIl => "he_IL", "Hebrew";
    HiIn => "hi_IN", "Hindi";
    HuHu => "hu_HU", "Hungarian";
    IdId => "id_ID", "Indonesian";
    ItIt => "it_IT", "Italian";
    JaJp => "ja_JP", "Japanese";
    KoKr => "ko_KR", "Korean";
    NbNo => "nb_NO", "Norwegian";
    NlNl => "nl_NL", "Dutch";
    PlPl => "pl_PL", "Polish";
    PtBr => "pt_BR", "Portuguese (Brazil)";
    PtPt => "pt_PT", "Portuguese (Portugal)";
    RoRo => "ro_RO", "Romanian";
    RuRu => "ru_RU", "Russian";
    SvSe => "sv_SE", "Swedish";
    ThTh => "th_TH", "Thai";
    TrTr => "tr_TR", "Turkish";
    UkUa => "uk_UA", "Ukrainian";
    ViVn => "vi_VN", "Vietnamese";
    ZhCn => "zh_CN", "Chinese (Mandarin, Simplified)";
    ZhHk => "zh_HK", "Chinese (Cantonese, Traditional)";
    ZhTw => "zh_TW", "Chinese (Taiwanese Mandarin)";
}

impl std::fmt::Display for AudioLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown locale code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audio language: {0}")]
pub struct ParseAudioLanguageError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_str() {
        for language in AudioLanguage::ALL {
            let parsed: AudioLanguage = language.as_str().parse().unwrap();
            assert_eq!(parsed, *language);
        }
    }

    #[test]
    fn hyphenated_codes_are_accepted() {
        assert_eq!("en-US".parse::<AudioLanguage>().unwrap(), AudioLanguage::EnUs);
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "xx_XX".parse::<AudioLanguage>().unwrap_err();
        assert_eq!(err.0, "xx_XX");
    }

    #[test]
    fn serde_uses_locale_code() {
        let json = serde_json::to_string(&AudioLanguage::FrFr).unwrap();
        assert_eq!(json, "\"fr_FR\"");
        let back: AudioLanguage = serde_json::from_str("\"ja_JP\"").unwrap();
        assert_eq!(back, AudioLanguage::JaJp);
    }
}

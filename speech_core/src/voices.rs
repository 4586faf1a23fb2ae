//! Voice and language catalog.
//!
//! The catalog is what the selection screen offers. The TTS voice map is the
//! relay-side mapping from a catalog voice key to the upstream voice id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    Indian,
    British,
    American,
    International,
}

impl Accent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Accent::Indian => "indian",
            Accent::British => "british",
            Accent::American => "american",
            Accent::International => "international",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Target language of the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Urdu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
            Language::Urdu => "urdu",
        }
    }

    /// Locale handed to the platform speech recognizer.
    pub fn recognition_locale(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Hindi => "hi-IN",
            Language::Urdu => "ur-PK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    pub accent: Accent,
    pub gender: Gender,
    pub description: String,
}

impl VoiceOption {
    fn builtin(id: &str, name: &str, accent: Accent, gender: Gender, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            accent,
            gender,
            description: description.to_string(),
        }
    }
}

/// All selectable voices, in display order.
pub fn catalog() -> Vec<VoiceOption> {
    use Accent::*;
    use Gender::*;
    vec![
        VoiceOption::builtin("indian-female", "Priya", Indian, Female, "Warm Indian English accent"),
        VoiceOption::builtin("indian-female-pure", "Ananya", Indian, Female, "Pure Indian English accent"),
        VoiceOption::builtin("indian-male", "Arjun", Indian, Male, "Professional Indian English accent"),
        VoiceOption::builtin("british-female", "Charlotte", British, Female, "Refined British English accent"),
        VoiceOption::builtin("british-male", "James", British, Male, "Classic British English accent"),
        VoiceOption::builtin("american-female", "Emily", American, Female, "Clear American English accent"),
        VoiceOption::builtin("american-male", "Michael", American, Male, "Standard American English accent"),
        VoiceOption::builtin("international-female", "Sofia", International, Female, "Neutral international English"),
        VoiceOption::builtin("international-male", "Alexander", International, Male, "Global professional English"),
    ]
}

pub fn find_voice(id: &str) -> Option<VoiceOption> {
    catalog().into_iter().find(|v| v.id == id)
}

/// Upstream voice used when a key is not in [`TTS_VOICE_MAP`].
pub const DEFAULT_TTS_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

pub const TTS_VOICE_MAP: &[(&str, &str)] = &[
    ("indian-female", "pFZP5JQG7iQjIQuC4Bku"),
    ("indian-female-pure", "ThT5KcBeYPX3keUQqHPh"),
    ("indian-male", "onwK4e9ZLuTAKqWW03F9"),
    ("british-female", "EXAVITQu4vr4xnSDxMaL"),
    ("british-male", "JBFqnCBsd6RMkjVDRZzb"),
    ("american-female", "cgSgspJ2msm6clMCkdW9"),
    ("american-male", "cjVigY5qzO86Huf0OWal"),
    ("international-female", "XrExE9yKIg1WjnnlVkGX"),
    ("international-male", "TX3LPaxmHKxFdv7VOQHJ"),
];

/// Resolve a catalog voice key to the upstream voice id.
///
/// Unknown or empty keys silently fall back to [`DEFAULT_TTS_VOICE_ID`].
pub fn resolve_tts_voice_id(voice_key: Option<&str>) -> &'static str {
    voice_key
        .and_then(|key| {
            TTS_VOICE_MAP
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, id)| *id)
        })
        .unwrap_or(DEFAULT_TTS_VOICE_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_voice_key_falls_back_to_default() {
        assert_eq!(resolve_tts_voice_id(Some("unknown-key")), DEFAULT_TTS_VOICE_ID);
        assert_eq!(resolve_tts_voice_id(None), DEFAULT_TTS_VOICE_ID);
        assert_eq!(resolve_tts_voice_id(Some("")), DEFAULT_TTS_VOICE_ID);
    }

    #[test]
    fn test_known_voice_key_resolves() {
        assert_eq!(resolve_tts_voice_id(Some("british-male")), "JBFqnCBsd6RMkjVDRZzb");
        assert_eq!(resolve_tts_voice_id(Some("indian-female-pure")), "ThT5KcBeYPX3keUQqHPh");
    }

    #[test]
    fn test_every_catalog_voice_has_a_mapping() {
        for voice in catalog() {
            assert!(
                TTS_VOICE_MAP.iter().any(|(k, _)| *k == voice.id),
                "missing mapping for {}",
                voice.id
            );
        }
    }

    #[test]
    fn test_language_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Language::Hindi).unwrap(), "\"hindi\"");
        assert_eq!(Language::Urdu.recognition_locale(), "ur-PK");
        assert_eq!(Language::default(), Language::English);
    }
}

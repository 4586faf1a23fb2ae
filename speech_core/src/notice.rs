//! User-visible notifications ("toasts").

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// No speech recognition capability on this platform.
    SpeechUnsupported,
    MicrophoneDenied,
    RecognitionFailed,
    /// A chat request failed; carries the user-facing description.
    ChatFailed { description: String },
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::SpeechUnsupported => "Not Supported",
            Notice::MicrophoneDenied => "Microphone Access Denied",
            Notice::RecognitionFailed => "Recognition Error",
            Notice::ChatFailed { .. } => "Error",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Notice::SpeechUnsupported => {
                "Speech recognition is not supported on this platform."
            }
            Notice::MicrophoneDenied => "Please allow microphone access to use voice input.",
            Notice::RecognitionFailed => "Failed to recognize speech. Please try again.",
            Notice::ChatFailed { description } => description,
        }
    }
}

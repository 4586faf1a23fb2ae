//! Speech side of the voice chat: voice catalog, TTS/STT relay clients,
//! playback arbitration and voice input capture.

pub mod capture;
pub mod error;
pub mod notice;
pub mod playback;
pub mod relay;
pub mod voices;

pub use capture::{
    CaptureState, Composer, RecognitionErrorKind, RecognitionEvent, RecognitionResult,
    RecognitionSessionId, SpeechRecognizer, VoiceCapture,
};
pub use error::SpeechError;
pub use notice::Notice;
pub use playback::{
    AudioClip, AudioOutput, PlaybackArbiter, PlaybackHandle, PlaybackNotifier, PlaybackOrigin,
    PlaybackOutcome, PlaybackRequest, PlaybackSignal, PlaybackState, PlaybackTicket,
};
pub use relay::{HttpSpeechRelay, RelayConfig, SttRelay, TtsRelay};
pub use voices::{
    catalog, find_voice, resolve_tts_voice_id, Accent, Gender, Language, VoiceOption,
    DEFAULT_TTS_VOICE_ID,
};

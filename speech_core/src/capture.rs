//! Voice input capture.
//!
//! Bridges a platform speech recognizer into the text composer. The capture
//! is a small state machine (`Idle -> Recording -> Idle`); every recognition
//! session gets an id and events carrying any other id are ignored, so an
//! aborted session can never write into the composer afterwards.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::notice::Notice;
use crate::voices::Language;

pub type RecognitionSessionId = u64;

/// Platform speech recognition capability.
///
/// The host reports events for a session back through
/// [`VoiceCapture::handle_event`] with the id it was started with.
pub trait SpeechRecognizer: Send + Sync {
    fn start(&self, session: RecognitionSessionId, locale: &str) -> Result<()>;
    /// Finish gracefully; pending results may still be delivered.
    fn stop(&self);
    /// Tear down immediately.
    fn abort(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    NotAllowed,
    Aborted,
    NoSpeech,
    Network,
    Other(String),
}

impl RecognitionErrorKind {
    /// Map a platform error code (`not-allowed`, `aborted`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => RecognitionErrorKind::NotAllowed,
            "aborted" => RecognitionErrorKind::Aborted,
            "no-speech" => RecognitionErrorKind::NoSpeech,
            "network" => RecognitionErrorKind::Network,
            other => RecognitionErrorKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    /// All results of the session so far.
    Results(Vec<RecognitionResult>),
    Error(RecognitionErrorKind),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording { session: RecognitionSessionId },
}

/// The text box shared by typed and spoken input.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    message: String,
    interim: String,
}

impl Composer {
    /// Committed text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Uncommitted recognition text, replaced wholesale on every update.
    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = text.into();
    }

    /// What the input box shows.
    pub fn display(&self) -> String {
        if self.interim.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.interim)
        }
    }

    fn commit(&mut self, final_text: &str) {
        self.message = if self.message.is_empty() {
            final_text.trim().to_string()
        } else {
            format!("{} {}", self.message, final_text).trim().to_string()
        };
        self.interim.clear();
    }

    fn clear(&mut self) {
        self.message.clear();
        self.interim.clear();
    }
}

pub struct VoiceCapture {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    state: CaptureState,
    next_session: RecognitionSessionId,
    composer: Composer,
}

impl VoiceCapture {
    /// `None` means the platform has no speech recognition; every voice
    /// affordance should then be disabled via [`VoiceCapture::is_supported`].
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            state: CaptureState::Idle,
            next_session: 0,
            composer: Composer::default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Recording { .. })
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn start(&mut self, language: Language) -> Option<Notice> {
        let Some(recognizer) = self.recognizer.clone() else {
            return Some(Notice::SpeechUnsupported);
        };
        if self.is_recording() {
            debug!("recognition already active");
            return None;
        }

        self.next_session += 1;
        let session = self.next_session;
        let locale = language.recognition_locale();
        self.composer.interim.clear();

        match recognizer.start(session, locale) {
            Ok(()) => {
                info!(session, locale, "speech recognition started");
                self.state = CaptureState::Recording { session };
                None
            }
            Err(e) => {
                error!("speech recognition failed to start: {e}");
                Some(Notice::RecognitionFailed)
            }
        }
    }

    pub fn stop(&mut self) {
        if self.is_recording() {
            if let Some(recognizer) = &self.recognizer {
                recognizer.stop();
            }
        }
    }

    /// Cancel immediately. Later events from the aborted session are ignored.
    pub fn abort(&mut self) {
        if self.is_recording() {
            if let Some(recognizer) = &self.recognizer {
                recognizer.abort();
            }
            self.state = CaptureState::Idle;
            self.composer.interim.clear();
        }
    }

    pub fn toggle(&mut self, language: Language) -> Option<Notice> {
        if self.is_recording() {
            self.stop();
            None
        } else {
            self.start(language)
        }
    }

    pub fn handle_event(
        &mut self,
        session: RecognitionSessionId,
        event: RecognitionEvent,
    ) -> Option<Notice> {
        if self.state != (CaptureState::Recording { session }) {
            debug!(session, "ignoring event from inactive recognition session");
            return None;
        }

        match event {
            RecognitionEvent::Started => None,
            RecognitionEvent::Results(results) => {
                let mut final_text = String::new();
                let mut interim_text = String::new();
                for result in &results {
                    if result.is_final {
                        final_text.push_str(&result.transcript);
                    } else {
                        interim_text.push_str(&result.transcript);
                    }
                }
                if final_text.is_empty() {
                    self.composer.interim = interim_text;
                } else {
                    self.composer.commit(&final_text);
                }
                None
            }
            RecognitionEvent::Error(kind) => {
                error!(session, ?kind, "speech recognition error");
                self.state = CaptureState::Idle;
                self.composer.interim.clear();
                match kind {
                    RecognitionErrorKind::NotAllowed => Some(Notice::MicrophoneDenied),
                    RecognitionErrorKind::Aborted => None,
                    _ => Some(Notice::RecognitionFailed),
                }
            }
            RecognitionEvent::End => {
                self.state = CaptureState::Idle;
                self.composer.interim.clear();
                None
            }
        }
    }

    /// Take the composed text for sending, including any interim text.
    ///
    /// Returns `None` when there is nothing to send. Callers check their own
    /// loading flag first; a busy session should leave the composer intact.
    pub fn submit(&mut self) -> Option<String> {
        let text = self.composer.display().trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.composer.clear();
        self.stop();
        Some(text)
    }
}

impl Drop for VoiceCapture {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_kinds() {
        assert_eq!(RecognitionErrorKind::from_code("not-allowed"), RecognitionErrorKind::NotAllowed);
        assert_eq!(RecognitionErrorKind::from_code("aborted"), RecognitionErrorKind::Aborted);
        assert_eq!(
            RecognitionErrorKind::from_code("audio-capture"),
            RecognitionErrorKind::Other("audio-capture".into())
        );
    }

    #[test]
    fn test_composer_display_appends_interim() {
        let mut composer = Composer::default();
        composer.set_message("hello");
        composer.interim = "wor".into();
        assert_eq!(composer.display(), "hello wor");
        composer.commit(" world ");
        assert_eq!(composer.message(), "hello  world");
        assert_eq!(composer.interim(), "");
    }

    #[test]
    fn test_unsupported_capture_fails_closed() {
        let mut capture = VoiceCapture::new(None);
        assert!(!capture.is_supported());
        assert_eq!(capture.start(Language::English), Some(Notice::SpeechUnsupported));
        assert_eq!(capture.state(), CaptureState::Idle);
    }
}

//! Voice input capture state machine.

use std::sync::{Arc, Mutex};

use speech_core::error::Result;
use speech_core::{
    CaptureState, Language, Notice, RecognitionErrorKind, RecognitionEvent, RecognitionResult,
    RecognitionSessionId, SpeechRecognizer, VoiceCapture,
};

#[derive(Default)]
struct FakeRecognizer {
    calls: Mutex<Vec<String>>,
}

impl FakeRecognizer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&self, session: RecognitionSessionId, locale: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("start {session} {locale}"));
        Ok(())
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push("stop".into());
    }

    fn abort(&self) {
        self.calls.lock().unwrap().push("abort".into());
    }
}

fn capture() -> (Arc<FakeRecognizer>, VoiceCapture) {
    let recognizer = Arc::new(FakeRecognizer::default());
    let capture = VoiceCapture::new(Some(recognizer.clone()));
    (recognizer, capture)
}

fn session_of(capture: &VoiceCapture) -> RecognitionSessionId {
    match capture.state() {
        CaptureState::Recording { session } => session,
        CaptureState::Idle => panic!("capture is idle"),
    }
}

#[test]
fn test_start_uses_language_locale_and_is_single_flight() {
    let (recognizer, mut capture) = capture();

    assert_eq!(capture.start(Language::Hindi), None);
    assert!(capture.is_recording());
    assert_eq!(capture.start(Language::Hindi), None);

    assert_eq!(recognizer.calls(), vec!["start 1 hi-IN".to_string()]);
}

#[test]
fn test_interim_results_replace_and_final_results_commit() {
    let (_recognizer, mut capture) = capture();
    capture.composer_mut().set_message("Hi");
    capture.start(Language::English);
    let session = session_of(&capture);

    capture.handle_event(
        session,
        RecognitionEvent::Results(vec![RecognitionResult::interim("how")]),
    );
    assert_eq!(capture.composer().interim(), "how");
    capture.handle_event(
        session,
        RecognitionEvent::Results(vec![RecognitionResult::interim("how are")]),
    );
    assert_eq!(capture.composer().interim(), "how are");
    assert_eq!(capture.composer().display(), "Hi how are");

    capture.handle_event(
        session,
        RecognitionEvent::Results(vec![RecognitionResult::final_result("how are you")]),
    );
    assert_eq!(capture.composer().message(), "Hi how are you");
    assert_eq!(capture.composer().interim(), "");

    capture.handle_event(session, RecognitionEvent::End);
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[test]
fn test_permission_denied_and_generic_errors_are_distinct() {
    let (_recognizer, mut capture) = capture();

    capture.start(Language::English);
    let session = session_of(&capture);
    let notice = capture.handle_event(
        session,
        RecognitionEvent::Error(RecognitionErrorKind::NotAllowed),
    );
    assert_eq!(notice, Some(Notice::MicrophoneDenied));
    assert!(!capture.is_recording());

    capture.start(Language::English);
    let session = session_of(&capture);
    let notice = capture.handle_event(
        session,
        RecognitionEvent::Error(RecognitionErrorKind::from_code("network")),
    );
    assert_eq!(notice, Some(Notice::RecognitionFailed));

    capture.start(Language::English);
    let session = session_of(&capture);
    let notice = capture.handle_event(
        session,
        RecognitionEvent::Error(RecognitionErrorKind::Aborted),
    );
    assert_eq!(notice, None);
    assert!(!capture.is_recording());
}

#[test]
fn test_abort_ignores_residual_events() {
    let (recognizer, mut capture) = capture();
    capture.start(Language::Urdu);
    let session = session_of(&capture);

    capture.abort();
    assert_eq!(capture.state(), CaptureState::Idle);
    assert_eq!(recognizer.calls().last().map(String::as_str), Some("abort"));

    capture.handle_event(
        session,
        RecognitionEvent::Results(vec![RecognitionResult::final_result("late")]),
    );
    let notice = capture.handle_event(
        session,
        RecognitionEvent::Error(RecognitionErrorKind::NotAllowed),
    );
    assert_eq!(notice, None);
    assert_eq!(capture.composer().message(), "");
}

#[test]
fn test_events_from_previous_session_do_not_touch_new_one() {
    let (_recognizer, mut capture) = capture();
    capture.start(Language::English);
    let old = session_of(&capture);
    capture.abort();

    capture.start(Language::English);
    let current = session_of(&capture);
    assert_ne!(old, current);

    capture.handle_event(old, RecognitionEvent::End);
    assert!(capture.is_recording());
}

#[test]
fn test_submit_includes_interim_and_stops_recording() {
    let (recognizer, mut capture) = capture();
    capture.composer_mut().set_message("Translate");
    capture.start(Language::English);
    let session = session_of(&capture);
    capture.handle_event(
        session,
        RecognitionEvent::Results(vec![RecognitionResult::interim("good morning")]),
    );

    assert_eq!(capture.submit().as_deref(), Some("Translate good morning"));
    assert_eq!(capture.composer().display(), "");
    assert_eq!(recognizer.calls().last().map(String::as_str), Some("stop"));

    // Graceful stop: the session ends when the platform reports it.
    capture.handle_event(session, RecognitionEvent::End);
    assert!(!capture.is_recording());
}

#[test]
fn test_submit_with_blank_composer_sends_nothing() {
    let (_recognizer, mut capture) = capture();
    capture.composer_mut().set_message("   ");
    assert_eq!(capture.submit(), None);
}

#[test]
fn test_toggle_starts_then_stops() {
    let (recognizer, mut capture) = capture();
    assert_eq!(capture.toggle(Language::English), None);
    assert!(capture.is_recording());
    capture.toggle(Language::English);
    assert_eq!(
        recognizer.calls(),
        vec!["start 1 en-US".to_string(), "stop".to_string()]
    );
}

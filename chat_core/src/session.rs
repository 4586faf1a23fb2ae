//! One chat session: transcript, conversation history, loading flag, and the
//! glue between the reply stream and playback.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. `go_home` bumps an epoch; work started in an older epoch never
//! writes into the transcript or history again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use speech_core::{
    Language, Notice, PlaybackArbiter, PlaybackOrigin, PlaybackOutcome, PlaybackRequest,
    VoiceCapture, VoiceOption,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::ChatError;
use crate::relay::ChatRelay;
use crate::sse::decode_stream;
use crate::transcript::Transcript;
use crate::types::{ChatRelayRequest, ConversationTurn, DisplayMessage, Role};

pub const WELCOME_MESSAGE_ID: &str = "welcome";
pub const FALLBACK_REPLY: &str = "I'm sorry, I encountered an error. Please try again.";

/// What the render layer is told, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAdded(DisplayMessage),
    MessageUpdated { id: String, content: String },
    TranscriptCleared,
    LoadingChanged(bool),
    Notice(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply streamed to completion into the message with this id.
    Completed { message_id: String },
    /// The request failed; a notice and a fallback reply were shown.
    Failed,
    /// Empty input, a request already in flight, or the session was reset.
    Ignored,
}

#[derive(Debug, Default)]
struct SessionState {
    epoch: u64,
    chat_open: bool,
    voice: Option<VoiceOption>,
    language: Language,
    transcript: Transcript,
    history: Vec<ConversationTurn>,
    loading: bool,
}

pub struct Session {
    state: Mutex<SessionState>,
    chat: Arc<dyn ChatRelay>,
    arbiter: PlaybackArbiter,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl Session {
    pub fn new(chat: Arc<dyn ChatRelay>, arbiter: PlaybackArbiter) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            chat,
            arbiter,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.lock().transcript.messages().to_vec()
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.lock().history.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_chat_open(&self) -> bool {
        self.lock().chat_open
    }

    pub fn selected_voice(&self) -> Option<VoiceOption> {
        self.lock().voice.clone()
    }

    pub fn language(&self) -> Language {
        self.lock().language
    }

    pub fn playing_message_id(&self) -> Option<String> {
        self.arbiter.playing_message_id()
    }

    pub fn arbiter(&self) -> &PlaybackArbiter {
        &self.arbiter
    }

    pub fn select_voice(&self, voice: VoiceOption) {
        info!(voice = %voice.id, "voice selected");
        self.lock().voice = Some(voice);
    }

    pub fn select_language(&self, language: Language) {
        self.lock().language = language;
    }

    /// Leave the selection screen and greet with the selected voice.
    /// Returns `false` when no voice has been selected yet.
    pub fn start_chat(&self) -> bool {
        let mut state = self.lock();
        let Some(voice) = state.voice.clone() else {
            return false;
        };
        let welcome = DisplayMessage::with_id(
            WELCOME_MESSAGE_ID,
            Role::Assistant,
            format!(
                "Hello! I'm {}, speaking with a {} accent. How can I help you today? \
Feel free to type in English, Hindi, or Urdu - I can translate and respond in any of these languages!",
                voice.name,
                voice.accent.as_str()
            ),
        );
        state.chat_open = true;
        state.transcript.clear();
        state.transcript.push(welcome.clone());
        self.emit(SessionEvent::TranscriptCleared);
        self.emit(SessionEvent::MessageAdded(welcome));
        true
    }

    /// Back to the selection screen. Transcript, history and loading state are
    /// reset and playback stops; replies still in flight are discarded.
    pub fn go_home(&self) {
        {
            let mut state = self.lock();
            state.epoch += 1;
            state.chat_open = false;
            state.transcript.clear();
            state.history.clear();
            state.loading = false;
        }
        self.emit(SessionEvent::TranscriptCleared);
        self.emit(SessionEvent::LoadingChanged(false));
        self.arbiter.stop();
        debug!("session reset");
    }

    /// Explicit tap-to-play on a message.
    pub async fn play_audio(&self, message_id: &str, text: &str) -> PlaybackOutcome {
        let voice_key = self.lock().voice.as_ref().map(|v| v.id.clone());
        self.arbiter
            .request_playback(PlaybackRequest {
                message_id: message_id.to_string(),
                text: text.to_string(),
                voice_key,
                origin: PlaybackOrigin::User,
            })
            .await
    }

    /// Send the composer's text, if the session is idle.
    pub async fn submit(&self, capture: &mut VoiceCapture) -> SendOutcome {
        if self.is_loading() {
            return SendOutcome::Ignored;
        }
        match capture.submit() {
            Some(text) => self.send_message(&text).await,
            None => SendOutcome::Ignored,
        }
    }

    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let content = text.trim();
        if content.is_empty() {
            return SendOutcome::Ignored;
        }

        let (epoch, request) = {
            let mut state = self.lock();
            if state.loading {
                warn!("a reply is still streaming, ignoring message");
                return SendOutcome::Ignored;
            }
            let user_message = DisplayMessage::new(Role::User, content);
            state.transcript.push(user_message.clone());
            state.history.push(ConversationTurn::user(content));
            state.loading = true;
            self.emit(SessionEvent::MessageAdded(user_message));
            self.emit(SessionEvent::LoadingChanged(true));

            let request = ChatRelayRequest {
                messages: state.history.clone(),
                voice_name: state.voice.as_ref().map(|v| v.name.clone()),
                voice_accent: state.voice.as_ref().map(|v| v.accent.as_str().to_string()),
                target_language: state.language,
            };
            (state.epoch, request)
        };

        match self.stream_reply(epoch, &request).await {
            Ok((message_id, reply)) => {
                let voice_key = {
                    let mut state = self.lock();
                    if state.epoch != epoch {
                        debug!("session reset while streaming, dropping reply");
                        return SendOutcome::Ignored;
                    }
                    state.history.push(ConversationTurn::assistant(reply.as_str()));
                    state.loading = false;
                    self.emit(SessionEvent::LoadingChanged(false));
                    state.voice.as_ref().map(|v| v.id.clone())
                };

                if !reply.is_empty() {
                    self.arbiter
                        .request_playback(PlaybackRequest {
                            message_id: message_id.clone(),
                            text: reply,
                            voice_key,
                            origin: PlaybackOrigin::Auto,
                        })
                        .await;
                }
                SendOutcome::Completed { message_id }
            }
            Err(e) => {
                error!("chat request failed: {e}");
                let mut state = self.lock();
                if state.epoch != epoch {
                    return SendOutcome::Ignored;
                }
                let fallback = DisplayMessage::new(Role::Assistant, FALLBACK_REPLY);
                state.transcript.push(fallback.clone());
                state.loading = false;
                self.emit(SessionEvent::Notice(Notice::ChatFailed {
                    description: e.user_message(),
                }));
                self.emit(SessionEvent::MessageAdded(fallback));
                self.emit(SessionEvent::LoadingChanged(false));
                SendOutcome::Failed
            }
        }
    }

    /// Open the relay stream and accumulate the reply into a fresh assistant
    /// message. Returns the message id and the full reply text.
    async fn stream_reply(
        &self,
        epoch: u64,
        request: &ChatRelayRequest,
    ) -> Result<(String, String), ChatError> {
        let stream = self.chat.open_stream(request).await?;

        let reply_message = DisplayMessage::new(Role::Assistant, "");
        let message_id = reply_message.id.clone();
        {
            let mut state = self.lock();
            if state.epoch == epoch {
                state.transcript.push(reply_message.clone());
                self.emit(SessionEvent::MessageAdded(reply_message));
            }
        }

        let mut reply = String::new();
        let summary = decode_stream(stream, |delta| {
            reply.push_str(delta);
            let mut state = self.lock();
            if state.epoch != epoch {
                return;
            }
            if let Some(message) = state.transcript.append_delta(&message_id, delta) {
                self.emit(SessionEvent::MessageUpdated {
                    id: message_id.clone(),
                    content: message.content.clone(),
                });
            }
        })
        .await?;

        debug!(
            deltas = summary.deltas,
            completed = summary.completed,
            chars = reply.len(),
            "reply stream finished"
        );
        Ok((message_id, reply))
    }
}

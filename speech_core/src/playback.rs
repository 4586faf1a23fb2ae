//! Playback arbitration.
//!
//! At most one spoken response is tracked at a time. Every playback attempt
//! gets a [`PlaybackTicket`]; completion and error signals only clear the slot
//! while their ticket is still the active one, so a slow-finishing stale
//! playback never clobbers a newer one.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::relay::TtsRelay;

/// Encoded audio as returned by the TTS relay. Decoding is left to the host.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub mime: String,
}

/// How a started playback ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    Ended,
    Failed(String),
}

/// Sending half of a playback's end signal, held by the audio output.
#[derive(Debug)]
pub struct PlaybackNotifier {
    tx: oneshot::Sender<PlaybackSignal>,
}

impl PlaybackNotifier {
    pub fn ended(self) {
        let _ = self.tx.send(PlaybackSignal::Ended);
    }

    pub fn failed(self, reason: impl Into<String>) {
        let _ = self.tx.send(PlaybackSignal::Failed(reason.into()));
    }
}

/// Receiving half of a playback's end signal.
#[derive(Debug)]
pub struct PlaybackHandle {
    rx: oneshot::Receiver<PlaybackSignal>,
}

impl PlaybackHandle {
    pub fn channel() -> (PlaybackNotifier, PlaybackHandle) {
        let (tx, rx) = oneshot::channel();
        (PlaybackNotifier { tx }, PlaybackHandle { rx })
    }

    /// Resolves on natural end or error. A dropped notifier counts as an error.
    pub async fn finished(self) -> PlaybackSignal {
        self.rx
            .await
            .unwrap_or_else(|_| PlaybackSignal::Failed("audio output dropped the playback".into()))
    }
}

/// Platform audio playback capability.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Queried once per request; call sites branch on it instead of failing.
    fn is_available(&self) -> bool {
        true
    }

    /// Start playing `clip`. Returns once playback has started.
    async fn start(&self, clip: AudioClip) -> Result<PlaybackHandle>;

    fn stop(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOrigin {
    /// Triggered after a reply finished streaming.
    Auto,
    /// Explicit tap-to-play on a message.
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTicket {
    pub message_id: String,
    generation: u64,
}

/// Single-slot playback state.
#[derive(Debug, Default)]
pub struct PlaybackState {
    active: Option<PlaybackTicket>,
    next_generation: u64,
}

impl PlaybackState {
    pub fn active_message_id(&self) -> Option<&str> {
        self.active.as_ref().map(|t| t.message_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Claim the slot for `message_id`. Automatic requests never displace an
    /// active playback; user requests always take over.
    pub fn begin(&mut self, message_id: &str, origin: PlaybackOrigin) -> Option<PlaybackTicket> {
        if origin == PlaybackOrigin::Auto && self.active.is_some() {
            return None;
        }
        self.next_generation += 1;
        let ticket = PlaybackTicket {
            message_id: message_id.to_string(),
            generation: self.next_generation,
        };
        self.active = Some(ticket.clone());
        Some(ticket)
    }

    pub fn holds(&self, ticket: &PlaybackTicket) -> bool {
        self.active.as_ref() == Some(ticket)
    }

    /// Release the slot if `ticket` still owns it.
    pub fn finish(&mut self, ticket: &PlaybackTicket) -> bool {
        if self.holds(ticket) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) -> bool {
        self.active.take().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub message_id: String,
    pub text: String,
    /// Catalog id of the selected voice; `None` when no voice is selected.
    pub voice_key: Option<String>,
    pub origin: PlaybackOrigin,
}

#[derive(Debug)]
pub enum PlaybackOutcome {
    Started {
        ticket: PlaybackTicket,
        /// Completes once the end or error signal has been applied.
        finished: JoinHandle<PlaybackSignal>,
    },
    /// An automatic request arrived while another playback was active.
    Dropped,
    NoVoice,
    Unavailable,
    /// Stopped or taken over by a newer request before audio could start.
    Superseded,
    SynthesisFailed,
    StartFailed,
}

impl PlaybackOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, PlaybackOutcome::Started { .. })
    }
}

/// Serializes speech requests against the single [`PlaybackState`] slot.
#[derive(Clone)]
pub struct PlaybackArbiter {
    state: Arc<watch::Sender<PlaybackState>>,
    tts: Arc<dyn TtsRelay>,
    output: Arc<dyn AudioOutput>,
}

impl PlaybackArbiter {
    pub fn new(tts: Arc<dyn TtsRelay>, output: Arc<dyn AudioOutput>) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        Self {
            state: Arc::new(state),
            tts,
            output,
        }
    }

    pub fn playing_message_id(&self) -> Option<String> {
        self.state.borrow().active_message_id().map(str::to_string)
    }

    /// Observe the slot; a change is published on every transition.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub async fn request_playback(&self, request: PlaybackRequest) -> PlaybackOutcome {
        let Some(voice_key) = request.voice_key.as_deref() else {
            debug!(message_id = %request.message_id, "no voice selected, skipping playback");
            return PlaybackOutcome::NoVoice;
        };
        if !self.output.is_available() {
            debug!("audio output unavailable, skipping playback");
            return PlaybackOutcome::Unavailable;
        }

        let mut claimed = None;
        self.state.send_if_modified(|state| {
            claimed = state.begin(&request.message_id, request.origin);
            claimed.is_some()
        });
        let Some(ticket) = claimed else {
            debug!(message_id = %request.message_id, "playback already active, dropping auto-play");
            return PlaybackOutcome::Dropped;
        };

        let clip = match self.tts.synthesize(&request.text, voice_key).await {
            Ok(clip) => clip,
            Err(e) => {
                warn!(message_id = %ticket.message_id, "speech synthesis failed: {e}");
                self.release(&ticket);
                return PlaybackOutcome::SynthesisFailed;
            }
        };

        if !self.state.borrow().holds(&ticket) {
            debug!(message_id = %ticket.message_id, "playback superseded during synthesis");
            return PlaybackOutcome::Superseded;
        }

        let handle = match self.output.start(clip).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(message_id = %ticket.message_id, "audio playback failed to start: {e}");
                self.release(&ticket);
                return PlaybackOutcome::StartFailed;
            }
        };
        info!(message_id = %ticket.message_id, origin = ?request.origin, "playback started");

        let state = Arc::clone(&self.state);
        let watched = ticket.clone();
        let finished = tokio::spawn(async move {
            let signal = handle.finished().await;
            if let PlaybackSignal::Failed(reason) = &signal {
                warn!(message_id = %watched.message_id, "audio playback error: {reason}");
            }
            state.send_if_modified(|s| s.finish(&watched));
            signal
        });

        PlaybackOutcome::Started { ticket, finished }
    }

    /// Stop whatever is playing and free the slot.
    pub fn stop(&self) {
        if self.state.send_if_modified(PlaybackState::clear) {
            debug!("playback stopped");
        }
        self.output.stop();
    }

    fn release(&self, ticket: &PlaybackTicket) {
        self.state.send_if_modified(|s| s.finish(ticket));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_begin_is_dropped_while_active() {
        let mut state = PlaybackState::default();
        let first = state.begin("m1", PlaybackOrigin::Auto).unwrap();
        assert!(state.begin("m2", PlaybackOrigin::Auto).is_none());
        assert_eq!(state.active_message_id(), Some("m1"));
        assert!(state.finish(&first));
        assert!(!state.is_active());
    }

    #[test]
    fn test_stale_ticket_does_not_clear_newer_playback() {
        let mut state = PlaybackState::default();
        let first = state.begin("m1", PlaybackOrigin::Auto).unwrap();
        let second = state.begin("m2", PlaybackOrigin::User).unwrap();
        assert!(!state.finish(&first));
        assert_eq!(state.active_message_id(), Some("m2"));
        assert!(state.finish(&second));
    }

    #[test]
    fn test_replaying_same_message_gets_a_fresh_ticket() {
        let mut state = PlaybackState::default();
        let first = state.begin("m1", PlaybackOrigin::User).unwrap();
        let second = state.begin("m1", PlaybackOrigin::User).unwrap();
        assert_ne!(first, second);
        assert!(!state.finish(&first));
        assert_eq!(state.active_message_id(), Some("m1"));
    }

    #[tokio::test]
    async fn test_dropped_notifier_reports_failure() {
        let (notifier, handle) = PlaybackHandle::channel();
        drop(notifier);
        assert!(matches!(handle.finished().await, PlaybackSignal::Failed(_)));
    }
}

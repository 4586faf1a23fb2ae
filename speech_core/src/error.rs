use thiserror::Error;

/// Errors raised by the speech relays and the audio/recognition capabilities.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("relay returned {status}: {message}")]
    Relay { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected relay response: {0}")]
    UnexpectedResponse(String),

    #[error("audio playback error: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, SpeechError>;

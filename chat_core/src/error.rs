use thiserror::Error;

/// Failures of a chat request. Decode problems inside the stream never show
/// up here; they are skipped by the decoder.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("relay returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream error: {0}")]
    Stream(String),
}

impl ChatError {
    /// Build the error for a non-success relay response.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("Request failed: {status}"));
        match status {
            429 => ChatError::RateLimited(message),
            402 => ChatError::QuotaExceeded(message),
            _ => ChatError::Status { status, message },
        }
    }

    /// Text for the error notice shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::RateLimited(msg)
            | ChatError::QuotaExceeded(msg)
            | ChatError::Status { message: msg, .. } => msg.clone(),
            ChatError::Transport(_) | ChatError::Stream(_) => "Failed to get response".to_string(),
        }
    }
}

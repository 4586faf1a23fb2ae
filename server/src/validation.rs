use chat_core::{ChatRelayRequest, Role};

use crate::error::ApiError;

/// Maximum text length for TTS requests
const MAX_TTS_TEXT_LENGTH: usize = 5000;
/// Maximum size of the user's new turn
const MAX_TURN_LENGTH: usize = 10_000;

/// Validate TTS request
pub fn validate_tts_request(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text is required".to_string()));
    }
    if text.chars().count() > MAX_TTS_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TTS_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// Validate a chat relay request before it is forwarded upstream.
pub fn validate_chat_request(request: &ChatRelayRequest) -> Result<(), ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::InvalidInput("Messages cannot be empty".to_string()));
    }
    // History must end with the user's turn, otherwise there is nothing to answer.
    let Some(latest) = request.messages.last().filter(|t| t.role == Role::User) else {
        return Err(ApiError::InvalidInput(
            "Last message must be from the user".to_string(),
        ));
    };
    // Earlier turns were accepted when they were sent; only the new one is checked.
    if latest.content.chars().count() > MAX_TURN_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Message too long (max {} characters)",
            MAX_TURN_LENGTH
        )));
    }
    Ok(())
}

/// Audio uploads must be non-empty and within the configured limit.
pub fn validate_audio_upload(bytes: &[u8], max_bytes: usize) -> Result<(), ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::InvalidInput("No audio file provided".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::InvalidInput(format!(
            "Audio file too large (max {} bytes)",
            max_bytes
        )));
    }
    Ok(())
}

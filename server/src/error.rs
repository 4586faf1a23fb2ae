use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} is not configured")]
    Configuration(&'static str),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded,

    #[error("Usage limit reached. Please add credits.")]
    QuotaExceeded,

    #[error("{service} error: {status}")]
    Upstream { service: &'static str, status: u16 },

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            ApiError::Configuration(_)
            | ApiError::Upstream { .. }
            | ApiError::Transport(_)
            | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Configuration(_) | ApiError::Transport(_) | ApiError::InternalError(_) => {
                tracing::error!("{}", self);
            }
            ApiError::Upstream { .. } => tracing::warn!("{}", self),
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_errors_keep_their_status() {
        assert_eq!(ApiError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::QuotaExceeded.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            ApiError::Configuration("ELEVENLABS_API_KEY").to_string(),
            "ELEVENLABS_API_KEY is not configured"
        );
        assert_eq!(
            ApiError::Upstream { service: "AI gateway", status: 503 }.to_string(),
            "AI gateway error: 503"
        );
    }
}

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chat_core::{prompt::system_prompt, ChatRelayRequest};
use speech_core::{catalog, resolve_tts_voice_id, VoiceOption};

use crate::error::ApiError;
use crate::metrics::{MetricsResponse, RelayEndpointMetrics, SystemMetrics};
use crate::upstream::AudioUpload;
use crate::validation::{validate_audio_upload, validate_chat_request, validate_tts_request};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    voice_key: Option<String>,
}

#[derive(Serialize)]
pub struct SttResponse {
    text: String,
}

/// Count a failed relay call against its endpoint.
fn observe<T>(endpoint: &RelayEndpointMetrics, result: Result<T, ApiError>) -> Result<T, ApiError> {
    match &result {
        Err(
            ApiError::RateLimitExceeded
            | ApiError::QuotaExceeded
            | ApiError::Upstream { .. }
            | ApiError::Transport(_),
        ) => endpoint.record_upstream_error(),
        Err(_) => endpoint.record_error(),
        Ok(_) => {}
    }
    result
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices() -> Json<Vec<VoiceOption>> {
    Json(catalog())
}

pub async fn chat_relay(
    State(state): State<AppState>,
    Json(request): Json<ChatRelayRequest>,
) -> Result<Response, ApiError> {
    let timer = state.metrics.chat.start();
    let result = observe(&state.metrics.chat, open_chat(&state, &request).await);
    timer.finish();
    result
}

async fn open_chat(state: &AppState, request: &ChatRelayRequest) -> Result<Response, ApiError> {
    validate_chat_request(request)?;
    info!(
        voice = request.voice_name.as_deref().unwrap_or("-"),
        accent = request.voice_accent.as_deref().unwrap_or("-"),
        language = request.target_language.as_str(),
        turns = request.messages.len(),
        "chat request"
    );

    let prompt = system_prompt(
        request.voice_name.as_deref(),
        request.voice_accent.as_deref(),
        request.target_language,
    );
    let upstream = state.upstream.open_chat_stream(request, &prompt).await?;

    // The completion stream is passed through untouched.
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}

pub async fn tts_relay(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let timer = state.metrics.tts.start();
    let result = observe(&state.metrics.tts, synthesize(&state, &request).await);
    timer.finish();
    result
}

async fn synthesize(state: &AppState, request: &TtsRequest) -> Result<Response, ApiError> {
    validate_tts_request(&request.text)?;

    let voice_id = resolve_tts_voice_id(request.voice_key.as_deref());
    info!(
        voice_key = request.voice_key.as_deref().unwrap_or("-"),
        voice_id,
        chars = request.text.chars().count(),
        "generating speech"
    );

    let audio = state.upstream.synthesize(&request.text, voice_id).await?;
    state.metrics.record_tts_audio(audio.len());

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

pub async fn stt_relay(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SttResponse>, ApiError> {
    let timer = state.metrics.stt.start();
    let result = observe(&state.metrics.stt, transcribe(&state, multipart).await);
    timer.finish();
    result
}

async fn transcribe(state: &AppState, mut multipart: Multipart) -> Result<Json<SttResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("recording.webm").to_string();
        let mime = field.content_type().unwrap_or("audio/webm").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("Malformed upload: {e}")))?;
        upload = Some(AudioUpload {
            bytes: bytes.to_vec(),
            file_name,
            mime,
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::InvalidInput("No audio file provided".to_string()))?;
    validate_audio_upload(&upload.bytes, state.config.max_upload_bytes)?;

    let text = state.upstream.transcribe(upload).await?;
    if text.is_empty() {
        warn!("transcription returned no text");
    }
    Ok(Json(SttResponse { text }))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let system_load = {
        #[cfg(unix)]
        {
            std::fs::read_to_string("/proc/loadavg")
                .ok()
                .and_then(|l| l.split_whitespace().next().and_then(|s| s.parse::<f64>().ok()))
        }
        #[cfg(not(unix))]
        None
    };

    Json(state.metrics.snapshot(SystemMetrics {
        cpu_usage_percent: system.global_cpu_info().cpu_usage(),
        memory_used_mb: memory_used / 1024 / 1024,
        memory_total_mb: memory_total / 1024 / 1024,
        memory_usage_percent,
        request_count: state.metrics.total_requests(),
        uptime_seconds: state.started.elapsed().as_secs(),
        system_load,
    }))
}

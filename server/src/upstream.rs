//! Clients for the AI services behind the relays: an OpenAI-compatible chat
//! completions gateway and ElevenLabs for speech.

use bytes::Bytes;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use chat_core::{ChatRelayRequest, ConversationTurn};

use crate::config::UpstreamConfig;
use crate::error::ApiError;

const TTS_MODEL_ID: &str = "eleven_multilingual_v2";
const TTS_OUTPUT_FORMAT: &str = "mp3_44100_128";
const STT_MODEL_ID: &str = "scribe_v1";

#[derive(Serialize)]
struct SystemTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CompletionMessage<'a> {
    System(SystemTurn<'a>),
    Turn(&'a ConversationTurn),
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.5,
            use_speaker_boost: true,
        }
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'static str,
    voice_settings: VoiceSettings,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// An uploaded audio file on its way to speech-to-text.
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn elevenlabs_key(&self) -> Result<&str, ApiError> {
        self.config
            .elevenlabs_api_key
            .as_deref()
            .ok_or(ApiError::Configuration("ELEVENLABS_API_KEY"))
    }

    fn elevenlabs_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.elevenlabs_base_url.trim_end_matches('/'),
            path
        )
    }

    /// Open a streaming completion. The returned response has a success
    /// status; its body is the upstream event stream.
    pub async fn open_chat_stream(
        &self,
        request: &ChatRelayRequest,
        system_prompt: &str,
    ) -> Result<Response, ApiError> {
        let key = self
            .config
            .chat_api_key
            .as_deref()
            .ok_or(ApiError::Configuration("CHAT_API_KEY"))?;

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(CompletionMessage::System(SystemTurn {
            role: "system",
            content: system_prompt,
        }));
        messages.extend(request.messages.iter().map(CompletionMessage::Turn));

        let body = CompletionRequest {
            model: &self.config.chat_model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&self.config.chat_api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimitExceeded),
            StatusCode::PAYMENT_REQUIRED => Err(ApiError::QuotaExceeded),
            status => {
                let detail = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), %detail, "AI gateway error");
                Err(ApiError::Upstream {
                    service: "AI gateway",
                    status: status.as_u16(),
                })
            }
        }
    }

    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Bytes, ApiError> {
        let key = self.elevenlabs_key()?;
        let url = self.elevenlabs_url(&format!("v1/text-to-speech/{voice_id}"));

        let response = self
            .client
            .post(url)
            .query(&[("output_format", TTS_OUTPUT_FORMAT)])
            .header("xi-api-key", key)
            .json(&SynthesisRequest {
                text,
                model_id: TTS_MODEL_ID,
                voice_settings: VoiceSettings::default(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %detail, "ElevenLabs TTS error");
            return Err(ApiError::Upstream {
                service: "ElevenLabs API",
                status: status.as_u16(),
            });
        }

        let audio = response.bytes().await?;
        info!(bytes = audio.len(), "generated audio");
        Ok(audio)
    }

    pub async fn transcribe(&self, upload: AudioUpload) -> Result<String, ApiError> {
        let key = self.elevenlabs_key()?;
        debug!(file = %upload.file_name, size = upload.bytes.len(), "transcribing audio");

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid audio content type: {e}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("model_id", STT_MODEL_ID);

        let response = self
            .client
            .post(self.elevenlabs_url("v1/speech-to-text"))
            .header("xi-api-key", key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %detail, "ElevenLabs STT error");
            return Err(ApiError::Upstream {
                service: "ElevenLabs API",
                status: status.as_u16(),
            });
        }

        let transcription: TranscriptionResponse = response.json().await?;
        Ok(transcription.text.unwrap_or_default())
    }
}

//! Clients for the speech relays (text-to-speech and speech-to-text).

use async_trait::async_trait;
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SpeechError};
use crate::playback::AudioClip;

/// Where the relay service lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8085".to_string(),
            api_key: None,
        }
    }
}

impl RelayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("VOICE_CHAT_RELAY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| Self::default().base_url);

        let api_key = std::env::var("VOICE_CHAT_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self { base_url, api_key }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Attach the publishable key both as `apikey` and as a bearer token.
    pub fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }
}

/// `{ "error": "..." }` body returned by every relay on failure.
#[derive(Debug, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
}

/// Read the relay's `{error}` body, falling back to a status-only message.
pub async fn relay_error(response: Response) -> SpeechError {
    let status = response.status().as_u16();
    let message = match response.json::<RelayErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("Request failed: {status}"),
    };
    SpeechError::Relay { status, message }
}

#[async_trait]
pub trait TtsRelay: Send + Sync {
    async fn synthesize(&self, text: &str, voice_key: &str) -> Result<AudioClip>;
}

#[async_trait]
pub trait SttRelay: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str, mime: &str) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TtsRelayRequest<'a> {
    text: &'a str,
    voice_key: &'a str,
}

#[derive(Deserialize)]
struct SttRelayResponse {
    text: Option<String>,
    error: Option<String>,
}

/// reqwest-backed client for both speech relays.
#[derive(Debug, Clone)]
pub struct HttpSpeechRelay {
    config: RelayConfig,
    client: Client,
}

impl HttpSpeechRelay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn with_client(config: RelayConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl TtsRelay for HttpSpeechRelay {
    async fn synthesize(&self, text: &str, voice_key: &str) -> Result<AudioClip> {
        let url = self.config.endpoint("tts");
        debug!(voice_key, chars = text.len(), "requesting speech synthesis");

        let response = self
            .config
            .authorize(self.client.post(&url))
            .json(&TtsRelayRequest { text, voice_key })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(relay_error(response).await);
        }

        let mime = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !mime.starts_with("audio/") {
            // A success status with a JSON body is still an `{error}` from the relay.
            let body = response.text().await?;
            warn!(%mime, "tts relay answered without audio");
            let message = serde_json::from_str::<RelayErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(SpeechError::UnexpectedResponse(message));
        }

        let bytes = response.bytes().await?;
        Ok(AudioClip { bytes, mime })
    }
}

#[async_trait]
impl SttRelay for HttpSpeechRelay {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str, mime: &str) -> Result<String> {
        let url = self.config.endpoint("stt");
        let part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new().part("audio", part);

        let response = self
            .config
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(relay_error(response).await);
        }

        let body: SttRelayResponse = response.json().await?;
        match (body.text, body.error) {
            (_, Some(error)) => Err(SpeechError::UnexpectedResponse(error)),
            (Some(text), None) => Ok(text),
            (None, None) => Ok(String::new()),
        }
    }
}

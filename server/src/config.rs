// Configuration for the relay server

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            max_upload_bytes: 25 * 1024 * 1024,
            cors_allowed_origins: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            cors_allowed_origins,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Upstream AI services the relays forward to.
///
/// Missing keys are not a startup error: each relay reports a configuration
/// error when it is called without its key.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub chat_api_key: Option<String>,
    pub chat_api_url: String,
    pub chat_model: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            chat_api_key: None,
            chat_api_url: "https://ai.gateway.lovable.dev/v1/chat/completions".to_string(),
            chat_model: "google/gemini-2.5-flash".to_string(),
            elevenlabs_api_key: None,
            elevenlabs_base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chat_api_key: env_non_empty("CHAT_API_KEY").or_else(|| env_non_empty("LOVABLE_API_KEY")),
            chat_api_url: env_non_empty("CHAT_API_URL").unwrap_or(defaults.chat_api_url),
            chat_model: env_non_empty("CHAT_MODEL").unwrap_or(defaults.chat_model),
            elevenlabs_api_key: env_non_empty("ELEVENLABS_API_KEY"),
            elevenlabs_base_url: env_non_empty("ELEVENLABS_BASE_URL")
                .unwrap_or(defaults.elevenlabs_base_url),
        }
    }
}

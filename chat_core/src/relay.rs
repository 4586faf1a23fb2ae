//! Client for the chat relay.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::Client;
use speech_core::relay::{RelayConfig, RelayErrorBody};
use tracing::{debug, error};

use crate::error::ChatError;
use crate::types::ChatRelayRequest;

/// Raw response body of a successful chat request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

#[async_trait]
pub trait ChatRelay: Send + Sync {
    /// Start a chat completion and return its SSE body.
    async fn open_stream(&self, request: &ChatRelayRequest) -> Result<ByteStream, ChatError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatRelay {
    config: RelayConfig,
    client: Client,
}

impl HttpChatRelay {
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
impl ChatRelay for HttpChatRelay {
    async fn open_stream(&self, request: &ChatRelayRequest) -> Result<ByteStream, ChatError> {
        let url = self.config.endpoint("chat");
        debug!(turns = request.messages.len(), "opening chat stream");

        let response = self
            .config
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.json::<RelayErrorBody>().await.ok().map(|b| b.error);
            error!(status = status.as_u16(), ?message, "chat relay rejected request");
            return Err(ChatError::from_status(status.as_u16(), message));
        }

        // The connection was established; a failure from here on is a broken body.
        Ok(Box::pin(
            response
                .bytes_stream()
                .map_err(|e| ChatError::Stream(e.to_string())),
        ))
    }
}

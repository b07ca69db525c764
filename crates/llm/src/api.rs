//! HTTP client for the chat-completion service.
//!
//! Wraps an OpenAI-compatible `POST /chat/completions` endpoint using
//! [`reqwest`]. Calls are never retried here; a failed call is reported
//! to the stage that made it.

use async_trait::async_trait;
use quill_core::config::LlmConfig;

use crate::messages::{ChatMessage, ChatRequest, ChatResponse};

/// Errors from the chat-completion layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Chat API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response envelope carried no message content.
    #[error("Chat API returned no completion content")]
    EmptyCompletion,
}

/// Anything that can turn a conversation into a single text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmApiError>;
}

/// HTTP client for one chat-completion endpoint.
pub struct ChatApi {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatApi {
    /// Build a client from configuration, applying the request timeout.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(
            client,
            config.endpoint(),
            config.api_key.clone(),
            config.model.clone(),
        ))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    ///
    /// * `endpoint` - Full completions URL, e.g. `https://host/chat/completions`.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`LlmApiError::ApiError`] carrying status and body on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LlmApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for ChatApi {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmApiError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        tracing::debug!(
            model = %self.model,
            temperature,
            message_count = messages.len(),
            "Requesting chat completion",
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let envelope: ChatResponse = Self::ensure_success(response).await?.json().await?;
        let content = envelope.into_content().ok_or(LlmApiError::EmptyCompletion)?;

        tracing::debug!(chars = content.chars().count(), "Chat completion received");
        Ok(content)
    }
}

//! Client for the external vision-capable chat-completion API.
//!
//! [`VisionClient`] is the seam the analysis worker calls through;
//! [`OpenAiClient`] is the production implementation speaking the OpenAI
//! `chat/completions` protocol over `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::openai::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport failure, deadline exceeded, or an undecodable body.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("status code: {status}, message: {message}")]
    Api { status: u16, message: String },

    /// The provider answered 2xx but without any text choice.
    #[error("completion response contained no text content")]
    EmptyResponse,
}

/// A model that answers a text prompt about one image.
#[async_trait]
pub trait VisionClient: Send + Sync + 'static {
    /// Send `prompt` together with the image at `image_url` (usually a
    /// `data:` URI) and return the text of the first choice.
    async fn complete(&self, prompt: &str, image_url: &str) -> Result<String, CompletionError>;
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Build a client from the server configuration. The configured timeout
    /// bounds each completion call end to end.
    pub fn from_config(cfg: &Config) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .user_agent(concat!("metafarm-server/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.openai_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.openai_base_url.clone(),
            api_key: cfg.openai_key.clone(),
            model: cfg.openai_model.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl VisionClient for OpenAiClient {
    async fn complete(&self, prompt: &str, image_url: &str) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest::vision(&self.model, prompt, image_url);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .first_content()
            .ok_or(CompletionError::EmptyResponse)?;
        debug!(model = %self.model, content_len = content.len(), "completion received");
        Ok(content)
    }
}

/// Pull `error.message` out of an OpenAI error envelope, falling back to the
/// raw body.
fn api_error_message(raw: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(raw) {
        Ok(envelope) => envelope.error.message,
        Err(_) if raw.trim().is_empty() => "empty error body".to_owned(),
        Err(_) => raw.trim().to_owned(),
    }
}

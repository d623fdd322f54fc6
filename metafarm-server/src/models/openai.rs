//! OpenAI chat-completion request / response types.
//!
//! Only the subset needed for a single multimodal user turn is modelled.
//! Unknown response fields are ignored so any OpenAI-compatible provider
//! works.

use serde::{Deserialize, Serialize};

// ── Request ──────────────────────────────────────────────────────────────────

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// The model identifier, e.g. `"gpt-4o-mini"`.
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    /// `"system"`, `"user"` or `"assistant"`.
    pub role: &'a str,
    pub content: Vec<ContentPart<'a>>,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

/// An image reference; a `data:` URI carries the bytes inline.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl<'a> {
    pub url: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    /// One user turn made of `prompt` followed by the image at `image_url`.
    pub fn vision(model: &'a str, prompt: &'a str, image_url: &'a str) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Response body of a non-streaming chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantMessage {
    /// `None` when the provider returned a refusal or tool call instead of text.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any.
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

//! Conversation message types and gateway request/response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::sampling::SamplingParams;

/// The author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender
    pub role: Role,

    /// Plain text, or an ordered list of content parts for multimodal input
    pub content: MessageContent,
}

impl ChatMessage {
    /// A user message with plain text content.
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message built from ordered content parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message content: a bare string or a sequence of tagged parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of a multimodal message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text part
    Text { text: String },
    /// Embedded image, addressed by URL or `data:` URI
    ImageUrl { image_url: ImageUrl },
}

/// Image reference carried inside an [`ContentPart::ImageUrl`] part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Body of the text-modality generation endpoints.
///
/// Sampling fields ride flattened next to `messages`, all optional;
/// bounds are checked here at the boundary, never downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    /// The conversation so far, oldest message first
    #[validate(length(min = 1, message = "messages array is required and cannot be empty"))]
    pub messages: Vec<ChatMessage>,

    /// Per-request overrides of the model's default sampling parameters
    #[serde(flatten)]
    #[validate(nested)]
    pub params: SamplingParams,
}

/// Body of every single-shot generation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text
    pub response: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use validator::Validate;

    use super::*;

    #[test]
    fn chat_request_deserializes_with_flattened_params() {
        let request: ChatRequest = serde_json::from_value(json!({
            "messages": [
                {"role": "user", "content": "What is the capital of France?"}
            ],
            "temperature": 0.7,
            "max_tokens": 100
        }))
        .unwrap();

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.params.temperature, Some(0.7));
        assert_eq!(request.params.max_tokens, Some(100));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn chat_request_rejects_empty_messages() {
        let request: ChatRequest = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn multimodal_content_serializes_tagged_parts() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: "describe".into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".into(),
                },
            },
        ]);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "describe"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                ]
            })
        );
    }

    #[test]
    fn plain_content_round_trips_as_string() {
        let message: ChatMessage =
            serde_json::from_value(json!({"role": "assistant", "content": "Hello"})).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, MessageContent::Text("Hello".into()));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "assistant", "content": "Hello"})
        );
    }
}

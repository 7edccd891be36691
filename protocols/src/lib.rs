//! Wire-format protocol definitions for the inference gateway.
//!
//! This crate holds the types shared between the HTTP boundary and the
//! model backends: conversation messages, sampling parameters, and the
//! request/response bodies of the gateway endpoints.

pub mod chat;
pub mod sampling;

pub use chat::{
    ChatMessage, ChatRequest, ContentPart, GenerationResponse, ImageUrl, MessageContent, Role,
};
pub use sampling::{JsonSchemaFormat, ResponseFormat, SamplingParams};

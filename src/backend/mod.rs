//! Backend invocation client.
//!
//! The engines consume model backends exclusively through the
//! [`CompletionBackend`] trait: a single-shot call returning candidate
//! completions and a streaming call returning an ordered, finite chunk
//! sequence. Admission control (the per-endpoint concurrency ceiling)
//! and reconnect retries live entirely behind this seam.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use chat_protocol::{ChatMessage, SamplingParams};
use futures_util::stream::BoxStream;
use serde::Deserialize;
use thiserror::Error;

pub use http::HttpBackend;

/// Ordered chunk sequence produced by a streaming call. Finite, not
/// restartable; an `Err` item terminates the sequence.
pub type ChunkStream = BoxStream<'static, Result<String, BackendError>>;

/// One completion returned by a single-shot call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    /// The generated text
    pub response: String,
}

/// Everything a streaming call needs, owned so the stream can outlive
/// the caller's borrows.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub base_url: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Credential forwarded to the backend; empty means none
    pub api_key: String,
    /// Overall request deadline; `None` means unlimited
    pub timeout: Option<Duration>,
    /// Connection attempts before giving up
    pub max_retries: u32,
    pub params: SamplingParams,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to model backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model backend returned {status}: {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed backend payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("stream connection failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Contract between the inference engines and a model backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Perform one chat completion and return all candidates. An empty
    /// list is a valid outcome, not an error.
    async fn single_shot(
        &self,
        base_url: &str,
        model: &str,
        messages: &[ChatMessage],
        max_concurrency: usize,
        params: &SamplingParams,
    ) -> Result<Vec<Candidate>, BackendError>;

    /// Open a streaming chat completion. Chunks are yielded in backend
    /// order with no coalescing; the consumer controls the pace.
    async fn stream(&self, request: StreamRequest) -> Result<ChunkStream, BackendError>;
}

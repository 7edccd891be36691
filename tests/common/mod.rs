//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use llm_gateway::{
    backend::{BackendError, Candidate, ChunkStream, CompletionBackend, StreamRequest},
    config::{AppConfig, CorsConfig, Environment, ModelEndpointConfig, ServerConfig},
    protocols::{ChatMessage, SamplingParams},
};

/// Scripted stand-in for the model backend. Records every call and
/// replays configured candidates/chunks.
#[derive(Default)]
pub struct MockBackend {
    /// Candidates returned by every single-shot call
    pub candidates: Vec<Candidate>,
    /// Chunk script replayed by every streaming call; `Err` carries the
    /// upstream failure message
    pub chunk_script: Vec<Result<String, String>>,
    /// Fail the streaming call before any chunk is produced
    pub fail_stream_open: bool,
    pub single_calls: Mutex<Vec<SingleShotCall>>,
    pub stream_calls: Mutex<Vec<StreamRequest>>,
}

#[derive(Debug, Clone)]
pub struct SingleShotCall {
    pub base_url: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_concurrency: usize,
    pub params: SamplingParams,
}

fn upstream_error(message: &str) -> BackendError {
    BackendError::UpstreamStatus {
        status: reqwest::StatusCode::BAD_GATEWAY,
        body: message.to_string(),
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn single_shot(
        &self,
        base_url: &str,
        model: &str,
        messages: &[ChatMessage],
        max_concurrency: usize,
        params: &SamplingParams,
    ) -> Result<Vec<Candidate>, BackendError> {
        self.single_calls.lock().unwrap().push(SingleShotCall {
            base_url: base_url.to_string(),
            model: model.to_string(),
            messages: messages.to_vec(),
            max_concurrency,
            params: params.clone(),
        });
        Ok(self.candidates.clone())
    }

    async fn stream(&self, request: StreamRequest) -> Result<ChunkStream, BackendError> {
        self.stream_calls.lock().unwrap().push(request.clone());
        if self.fail_stream_open {
            return Err(upstream_error("backend unavailable"));
        }
        let items = self
            .chunk_script
            .clone()
            .into_iter()
            .map(|chunk| chunk.map_err(|message| upstream_error(&message)));
        Ok(futures_util::stream::iter(items).boxed())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        api_key: "test-key".to_string(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 1999,
            log_level: "info".to_string(),
            cors: CorsConfig {
                allow_origins: vec!["*".to_string()],
                allow_credentials: false,
                allow_methods: vec!["*".to_string()],
                allow_headers: vec!["*".to_string()],
            },
        },
        text_model: ModelEndpointConfig {
            model_name: "test-llm".to_string(),
            base_url: "http://localhost:8000/v1".to_string(),
            max_concurrency: 10,
            llm_args: SamplingParams {
                temperature: Some(0.7),
                max_tokens: Some(256),
                ..Default::default()
            },
        },
        image_model: ModelEndpointConfig {
            model_name: "test-vlm".to_string(),
            base_url: "http://localhost:8001/v1".to_string(),
            max_concurrency: 4,
            llm_args: SamplingParams::default(),
        },
    }
}

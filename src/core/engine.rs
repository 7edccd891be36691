//! Per-modality inference engines.
//!
//! Each engine owns one immutable [`ModelEndpointConfig`] and a handle
//! to the backend invocation client. Engines hold no other state, so
//! they are freely shared across concurrent requests; admission control
//! belongs to the backend.

use std::{path::Path, sync::Arc};

use chat_protocol::{ChatMessage, SamplingParams};
use futures_util::{future, stream, stream::BoxStream, StreamExt};
use tracing::error;

use super::{multimodal, EngineError};
use crate::{
    backend::{CompletionBackend, StreamRequest},
    config::ModelEndpointConfig,
};

/// Connection attempts granted to the backend streaming call.
pub const STREAM_MAX_RETRIES: u32 = 3;

/// Event sequence produced by a streaming completion. Finite and
/// ordered; a `Failed` event is always terminal.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// One element of a completion stream.
///
/// Failures are a tagged variant rather than a stream error so the
/// transport sees a well-formed sequence ending in a terminal event;
/// the request layer decides how to render `Failed` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental model output, forwarded in backend order
    Chunk(String),
    /// Terminal failure notice; no further events follow
    Failed(String),
}

/// Text-modality engine, also the dispatch core for [`VisionEngine`].
pub struct ChatEngine {
    config: ModelEndpointConfig,
    backend: Arc<dyn CompletionBackend>,
}

impl ChatEngine {
    pub fn new(config: ModelEndpointConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        ChatEngine { config, backend }
    }

    pub fn config(&self) -> &ModelEndpointConfig {
        &self.config
    }

    /// Run a single-shot completion over `messages` and return the
    /// first candidate's text, or an empty string when the backend
    /// returns no candidates.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        overrides: Option<&SamplingParams>,
    ) -> Result<String, EngineError> {
        let params = self.config.llm_args.merge_over(overrides);
        let candidates = self
            .backend
            .single_shot(
                &self.config.base_url,
                &self.config.model_name,
                &messages,
                self.config.max_concurrency,
                &params,
            )
            .await
            .map_err(|e| {
                error!(model = %self.config.model_name, error = %e, "completion request failed");
                e
            })?;

        Ok(candidates
            .into_iter()
            .next()
            .map(|candidate| candidate.response)
            .unwrap_or_default())
    }

    /// Open a streaming completion over `messages`.
    ///
    /// Chunks pass through unbuffered in backend order. Any backend
    /// failure, before or during the stream, is logged and degraded to
    /// one terminal [`StreamEvent::Failed`].
    pub async fn complete_stream(
        &self,
        messages: Vec<ChatMessage>,
        overrides: Option<&SamplingParams>,
    ) -> EventStream {
        let params = self.config.llm_args.merge_over(overrides);
        let request = StreamRequest {
            base_url: self.config.base_url.clone(),
            model: self.config.model_name.clone(),
            messages,
            api_key: String::new(),
            timeout: None,
            max_retries: STREAM_MAX_RETRIES,
            params,
        };

        let model = self.config.model_name.clone();
        match self.backend.stream(request).await {
            Ok(chunks) => chunks
                .scan(false, move |failed, item| {
                    if *failed {
                        return future::ready(None);
                    }
                    let event = match item {
                        Ok(text) => StreamEvent::Chunk(text),
                        Err(e) => {
                            *failed = true;
                            error!(model = %model, error = %e, "stream failed mid-sequence");
                            StreamEvent::Failed(e.to_string())
                        }
                    };
                    future::ready(Some(event))
                })
                .boxed(),
            Err(e) => {
                error!(model = %self.config.model_name, error = %e, "failed to open completion stream");
                failed_stream(e.to_string())
            }
        }
    }
}

/// Vision-modality engine: builds the multimodal message list from an
/// uploaded asset, then dispatches through the shared core.
pub struct VisionEngine {
    engine: ChatEngine,
}

impl VisionEngine {
    pub fn new(config: ModelEndpointConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        VisionEngine {
            engine: ChatEngine::new(config, backend),
        }
    }

    pub fn config(&self) -> &ModelEndpointConfig {
        self.engine.config()
    }

    /// Single-shot image analysis. A failure to read the asset
    /// propagates; the caller owns asset cleanup.
    pub async fn complete(
        &self,
        image_path: &Path,
        prompt: &str,
        overrides: Option<&SamplingParams>,
    ) -> Result<String, EngineError> {
        let messages = multimodal::image_messages(image_path, prompt).await?;
        self.engine.complete(messages, overrides).await
    }

    /// Streaming image analysis. If the message list cannot be built,
    /// the stream opens with a single terminal failure event instead.
    pub async fn complete_stream(
        &self,
        image_path: &Path,
        prompt: &str,
        overrides: Option<&SamplingParams>,
    ) -> EventStream {
        match multimodal::image_messages(image_path, prompt).await {
            Ok(messages) => self.engine.complete_stream(messages, overrides).await,
            Err(e) => {
                error!(model = %self.engine.config.model_name, error = %e, "failed to build image messages");
                failed_stream(e.to_string())
            }
        }
    }
}

fn failed_stream(message: String) -> EventStream {
    stream::once(future::ready(StreamEvent::Failed(message))).boxed()
}

//! OpenAI-compatible HTTP backend.
//!
//! Speaks `POST {base_url}/chat/completions` for both call shapes.
//! Streaming responses arrive as SSE `data:` frames carrying chunk
//! objects, terminated by a `[DONE]` frame.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use chat_protocol::{ChatMessage, SamplingParams};
use dashmap::DashMap;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::warn;

use super::{BackendError, Candidate, ChunkStream, CompletionBackend, StreamRequest};

/// Delay before the first stream reconnect attempt; doubles per retry.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Backend client for OpenAI-compatible model servers.
///
/// One instance serves every endpoint; admission control is a
/// per-base-URL semaphore sized on first use from the endpoint's
/// configured ceiling.
pub struct HttpBackend {
    client: Client,
    limits: DashMap<String, Arc<Semaphore>>,
}

impl HttpBackend {
    pub fn new() -> Self {
        HttpBackend {
            client: Client::new(),
            limits: DashMap::new(),
        }
    }

    fn limiter(&self, base_url: &str, max_concurrency: usize) -> Arc<Semaphore> {
        self.limits
            .entry(base_url.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(max_concurrency)))
            .clone()
    }

    async fn connect_stream(&self, request: &StreamRequest) -> Result<reqwest::Response, BackendError> {
        let payload = ChatPayload {
            model: &request.model,
            messages: &request.messages,
            stream: true,
            params: &request.params,
        };
        let mut builder = self
            .client
            .post(chat_completions_url(&request.base_url))
            .json(&payload);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if !request.api_key.is_empty() {
            builder = builder.bearer_auth(&request.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::UpstreamStatus { status, body });
        }
        Ok(response)
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn single_shot(
        &self,
        base_url: &str,
        model: &str,
        messages: &[ChatMessage],
        max_concurrency: usize,
        params: &SamplingParams,
    ) -> Result<Vec<Candidate>, BackendError> {
        let limiter = self.limiter(base_url, max_concurrency);
        // Limiter semaphores are never closed.
        let _permit = limiter
            .acquire_owned()
            .await
            .expect("limiter semaphore closed");

        let payload = ChatPayload {
            model,
            messages,
            stream: false,
            params,
        };
        let response = self
            .client
            .post(chat_completions_url(base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::UpstreamStatus { status, body });
        }

        let completion: ChatCompletionResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(completion
            .choices
            .into_iter()
            .map(|choice| Candidate {
                response: choice.message.content.unwrap_or_default(),
            })
            .collect())
    }

    async fn stream(&self, request: StreamRequest) -> Result<ChunkStream, BackendError> {
        let attempts = request.max_retries.max(1);
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1;

        let response = loop {
            match self.connect_stream(&request).await {
                Ok(response) => break response,
                Err(e) if attempt < attempts => {
                    warn!(
                        model = %request.model,
                        attempt,
                        error = %e,
                        "stream connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(BackendError::RetriesExhausted {
                        attempts,
                        last: e.to_string(),
                    });
                }
            }
        };

        let bytes = response.bytes_stream().boxed();
        let stream = futures_util::stream::unfold(
            (bytes, SseFrames::default()),
            |(mut bytes, mut frames)| async move {
                loop {
                    if let Some(event) = frames.events.pop_front() {
                        return Some((event, (bytes, frames)));
                    }
                    if frames.done {
                        return None;
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => frames.push(&chunk),
                        Some(Err(e)) => {
                            frames.done = true;
                            return Some((Err(BackendError::Transport(e)), (bytes, frames)));
                        }
                        None => return None,
                    }
                }
            },
        );
        Ok(stream.boxed())
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
    #[serde(flatten)]
    params: &'a SamplingParams,
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental SSE frame decoder for the upstream chunk stream.
#[derive(Default)]
struct SseFrames {
    buf: String,
    events: VecDeque<Result<String, BackendError>>,
    done: bool,
}

impl SseFrames {
    fn push(&mut self, bytes: &[u8]) {
        // CRs only ever come from transport framing; JSON payloads
        // carry escaped control characters.
        self.buf
            .push_str(&String::from_utf8_lossy(bytes).replace('\r', ""));
        while let Some(pos) = self.buf.find("\n\n") {
            let frame: String = self.buf.drain(..pos + 2).collect();
            self.handle_frame(frame.trim_end());
            if self.done {
                return;
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        for line in frame.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.done = true;
                return;
            }
            match serde_json::from_str::<ChatCompletionChunk>(data) {
                Ok(chunk) => {
                    let content = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content);
                    match content {
                        Some(text) if !text.is_empty() => self.events.push_back(Ok(text)),
                        _ => {}
                    }
                }
                Err(e) => {
                    self.events.push_back(Err(BackendError::Payload(e)));
                    self.done = true;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(frames: &mut SseFrames) -> Vec<String> {
        frames
            .events
            .drain(..)
            .map(|e| e.expect("unexpected decode error"))
            .collect()
    }

    #[test]
    fn decodes_content_deltas_in_order() {
        let mut frames = SseFrames::default();
        frames.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        );
        assert_eq!(drain(&mut frames), vec!["Hel", "lo"]);
        assert!(!frames.done);
    }

    #[test]
    fn done_frame_terminates() {
        let mut frames = SseFrames::default();
        frames.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\ndata: [DONE]\n\n");
        assert_eq!(drain(&mut frames), vec!["x"]);
        assert!(frames.done);
    }

    #[test]
    fn reassembles_frames_split_across_reads() {
        let mut frames = SseFrames::default();
        frames.push(b"data: {\"choices\":[{\"delta\":{\"con");
        assert!(frames.events.is_empty());
        frames.push(b"tent\":\"joined\"}}]}\n\n");
        assert_eq!(drain(&mut frames), vec!["joined"]);
    }

    #[test]
    fn skips_role_only_deltas() {
        let mut frames = SseFrames::default();
        frames.push(b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
        assert!(frames.events.is_empty());
    }

    #[test]
    fn handles_crlf_framing() {
        let mut frames = SseFrames::default();
        frames.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n");
        assert_eq!(drain(&mut frames), vec!["ok"]);
    }

    #[test]
    fn malformed_payload_yields_error_and_stops() {
        let mut frames = SseFrames::default();
        frames.push(b"data: not json\n\ndata: {\"choices\":[]}\n\n");
        assert!(matches!(
            frames.events.pop_front(),
            Some(Err(BackendError::Payload(_)))
        ));
        assert!(frames.done);
    }

    #[test]
    fn joins_chat_completions_url() {
        assert_eq!(
            chat_completions_url("http://localhost:8000/v1/"),
            "http://localhost:8000/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("http://localhost:8000/v1"),
            "http://localhost:8000/v1/chat/completions"
        );
    }
}

//! Wire rendering of completion event streams.
//!
//! Streams go out as `text/event-stream` bodies of raw UTF-8 chunks.
//! A terminal failure event is rendered inline as `Error: <message>` so
//! the transport stream always completes cleanly; consumers cannot
//! distinguish it from model output by status code (see the endpoint
//! docs).

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

use super::{asset::UploadedAsset, error as router_error};
use crate::core::{EventStream, StreamEvent};

/// Buffered chunks between the producer task and the client connection.
const STREAM_CHANNEL_SIZE: usize = 128;

fn render_event(event: StreamEvent) -> Bytes {
    match event {
        StreamEvent::Chunk(text) => Bytes::from(text),
        StreamEvent::Failed(message) => Bytes::from(format!("Error: {message}")),
    }
}

/// Stream `events` straight to the client.
pub fn event_stream_response(events: EventStream) -> Response {
    let body = Body::from_stream(
        events.map(|event| Ok::<_, std::convert::Infallible>(render_event(event))),
    );
    sse_response(body)
}

/// Stream `events` to the client while holding `asset` alive, then
/// delete it. The producer task stops pulling as soon as the consumer
/// disconnects, and the asset is removed on that path too — cleanup is
/// not conditional on the stream reaching its natural end.
pub fn event_stream_response_with_asset(events: EventStream, asset: UploadedAsset) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(STREAM_CHANNEL_SIZE);

    tokio::spawn(async move {
        let mut events = events;
        while let Some(event) = events.next().await {
            if tx.send(Ok(render_event(event))).await.is_err() {
                break;
            }
        }
        drop(events);
        asset.remove().await;
    });

    sse_response(Body::from_stream(ReceiverStream::new(rx)))
}

fn sse_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .unwrap_or_else(|e| {
            error!("Failed to build streaming response: {}", e);
            router_error::internal_error("response_build_failed", "Failed to build response")
        })
}

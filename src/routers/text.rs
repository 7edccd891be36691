//! Text-modality inference endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::{ChatRequest, GenerationResponse};
use validator::Validate;

use super::{error, streaming};
use crate::server::AppState;

/// `POST /text_model/chat/completion`
pub async fn completion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error::unprocessable_entity("invalid_request", e.to_string());
    }

    match state
        .text_engine
        .complete(request.messages, Some(&request.params))
        .await
    {
        Ok(response) => (StatusCode::OK, Json(GenerationResponse { response })).into_response(),
        Err(e) => error::internal_error("completion_failed", e.to_string()),
    }
}

/// `POST /text_model/chat/stream`
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error::unprocessable_entity("invalid_request", e.to_string());
    }

    let events = state
        .text_engine
        .complete_stream(request.messages, Some(&request.params))
        .await;
    streaming::event_stream_response(events)
}

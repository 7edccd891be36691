//! API-key authentication for the inference endpoints.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use super::error;
use crate::server::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Reject requests whose `X-API-Key` header is absent or does not match
/// the configured key. A missing credential and a wrong credential are
/// distinct outcomes (401 vs 403). Comparison is constant-time.
pub async fn verify_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(provided) = request.headers().get(API_KEY_HEADER) else {
        return error::unauthorized(
            "missing_api_key",
            "Missing API Key. Please provide X-API-Key header.",
        );
    };

    let matches: bool = provided
        .as_bytes()
        .ct_eq(state.config.api_key.as_bytes())
        .into();
    if !matches {
        return error::forbidden("invalid_api_key", "Invalid API Key");
    }

    next.run(request).await
}

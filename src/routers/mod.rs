//! HTTP request layer: route declarations, authentication, CORS, and
//! wire serialization of engine output.

pub mod asset;
pub mod auth;
pub mod error;
mod health;
pub mod streaming;
mod text;
mod vision;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::CorsConfig, server::AppState};

/// Largest accepted request body; image uploads dominate.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Assemble the gateway router. Inference routes sit behind the API-key
/// check; health probes do not.
pub fn app(state: Arc<AppState>) -> Router {
    let inference = Router::new()
        .route("/text_model/chat/completion", post(text::completion))
        .route("/text_model/chat/stream", post(text::stream))
        .route("/image_model/chat/completion", post(vision::completion))
        .route("/image_model/chat/stream", post(vision::stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::verify_api_key,
        ));

    Router::new()
        .merge(inference)
        .route("/health", get(health::health_check))
        .route("/", get(health::root_route))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config.server.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allow_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    let methods = if config.allow_methods.iter().any(|m| m == "*") {
        AllowMethods::any()
    } else {
        AllowMethods::list(
            config
                .allow_methods
                .iter()
                .filter_map(|m| m.parse::<Method>().ok()),
        )
    };
    let headers = if config.allow_headers.iter().any(|h| h == "*") {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            config
                .allow_headers
                .iter()
                .filter_map(|h| h.parse::<HeaderName>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials)
}

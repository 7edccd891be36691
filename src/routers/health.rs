use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

pub async fn root_route() -> impl IntoResponse {
    Json(json!({"message": "Hello, World!"}))
}

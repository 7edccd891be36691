//! Vision-modality inference endpoints.
//!
//! Input arrives as multipart form data: an `image` file part, a
//! `prompt` text field, and optional sampling fields (with
//! `response_format` as a JSON-encoded string, parsed here at the
//! boundary). The upload is materialized to scratch storage for the
//! duration of the call and deleted on every exit path.

use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::{GenerationResponse, ResponseFormat, SamplingParams};
use validator::Validate;

use super::{asset::UploadedAsset, error, streaming};
use crate::server::AppState;

const DEFAULT_PROMPT: &str = "Describe this image";

struct VisionForm {
    asset: UploadedAsset,
    prompt: String,
    params: SamplingParams,
}

/// `POST /image_model/chat/completion`
pub async fn completion(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match parse_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let result = state
        .vision_engine
        .complete(form.asset.path(), &form.prompt, Some(&form.params))
        .await;
    form.asset.remove().await;

    match result {
        Ok(response) => (StatusCode::OK, Json(GenerationResponse { response })).into_response(),
        Err(e) => error::internal_error("completion_failed", e.to_string()),
    }
}

/// `POST /image_model/chat/stream`
pub async fn stream(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match parse_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let events = state
        .vision_engine
        .complete_stream(form.asset.path(), &form.prompt, Some(&form.params))
        .await;
    streaming::event_stream_response_with_asset(events, form.asset)
}

async fn parse_form(mut multipart: Multipart) -> Result<VisionForm, Response> {
    let mut asset = None;
    let mut prompt = None;
    let mut params = SamplingParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error::bad_request("malformed_multipart", e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error::bad_request("unreadable_upload", e.to_string()))?;
                let materialized = UploadedAsset::materialize(file_name.as_deref(), &bytes)
                    .await
                    .map_err(|e| error::internal_error("asset_write_failed", e.to_string()))?;
                asset = Some(materialized);
            }
            "prompt" => prompt = Some(text_field(field, &name).await?),
            "temperature" => params.temperature = Some(numeric_field(field, &name).await?),
            "max_tokens" => params.max_tokens = Some(numeric_field(field, &name).await?),
            "top_p" => params.top_p = Some(numeric_field(field, &name).await?),
            "frequency_penalty" => {
                params.frequency_penalty = Some(numeric_field(field, &name).await?)
            }
            "presence_penalty" => params.presence_penalty = Some(numeric_field(field, &name).await?),
            "seed" => params.seed = Some(numeric_field(field, &name).await?),
            "response_format" => {
                let raw = text_field(field, &name).await?;
                let format: ResponseFormat = serde_json::from_str(&raw).map_err(|e| {
                    error::bad_request(
                        "invalid_response_format",
                        format!("response_format is not valid JSON: {e}"),
                    )
                })?;
                params.response_format = Some(format);
            }
            _ => {}
        }
    }

    let Some(asset) = asset else {
        return Err(error::bad_request(
            "missing_image",
            "image file field is required",
        ));
    };

    if let Err(e) = params.validate() {
        asset.remove().await;
        return Err(error::unprocessable_entity("invalid_request", e.to_string()));
    }

    Ok(VisionForm {
        asset,
        prompt: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        params,
    })
}

async fn text_field(field: Field<'_>, name: &str) -> Result<String, Response> {
    field.text().await.map_err(|e| {
        error::bad_request(
            "unreadable_field",
            format!("failed to read field '{name}': {e}"),
        )
    })
}

async fn numeric_field<T>(field: Field<'_>, name: &str) -> Result<T, Response>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = text_field(field, name).await?;
    raw.trim().parse::<T>().map_err(|e| {
        error::bad_request(
            "invalid_field",
            format!("field '{name}' is not a valid number: {e}"),
        )
    })
}

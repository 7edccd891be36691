//! Conversion of an uploaded image plus a prompt into the
//! backend-agnostic multimodal message shape.

use std::{ffi::OsStr, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chat_protocol::{ChatMessage, ContentPart, ImageUrl};

use super::EngineError;

/// MIME type inferred from the asset's file extension. Unknown
/// extensions fall back to JPEG.
pub fn mime_for_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Build the message list for a vision-language completion: exactly one
/// user message whose content is the prompt text followed by the image
/// embedded as a base64 `data:` URI.
///
/// Fails if the asset cannot be read; the caller decides whether to
/// surface the failure or degrade. Never retried.
pub async fn image_messages(path: &Path, prompt: &str) -> Result<Vec<ChatMessage>, EngineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| EngineError::AssetRead {
            path: path.to_path_buf(),
            source,
        })?;
    let url = format!(
        "data:{};base64,{}",
        mime_for_extension(path),
        STANDARD.encode(bytes)
    );

    Ok(vec![ChatMessage::user_parts(vec![
        ContentPart::Text {
            text: prompt.to_owned(),
        },
        ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        },
    ])])
}

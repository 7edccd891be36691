//! Core inference layer: parameter normalization, multimodal message
//! construction, and dispatch to the backend invocation client.

mod engine;
pub mod multimodal;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::{ChatEngine, EventStream, StreamEvent, VisionEngine, STREAM_MAX_RETRIES};

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to read image asset {path}: {source}")]
    AssetRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

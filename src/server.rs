//! Shared application state, constructed once at startup.

use std::sync::Arc;

use crate::{
    backend::{CompletionBackend, HttpBackend},
    config::AppConfig,
    core::{ChatEngine, VisionEngine},
};

/// Everything the request layer needs, behind one `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub text_engine: ChatEngine,
    pub vision_engine: VisionEngine,
}

impl AppState {
    /// Wire the engines to the production HTTP backend.
    pub fn new(config: AppConfig) -> Self {
        Self::with_backend(config, Arc::new(HttpBackend::new()))
    }

    /// Wire the engines to an arbitrary backend implementation.
    pub fn with_backend(config: AppConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let text_engine = ChatEngine::new(config.text_model.clone(), backend.clone());
        let vision_engine = VisionEngine::new(config.image_model.clone(), backend);
        AppState {
            config,
            text_engine,
            vision_engine,
        }
    }
}

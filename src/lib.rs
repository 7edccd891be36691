//! HTTP inference gateway for text and vision chat models.
//!
//! One front door accepts chat-style requests, authenticates them,
//! normalizes per-request sampling parameters against per-model
//! defaults, and dispatches to an OpenAI-compatible model backend —
//! single-shot or streamed.

pub mod backend;
pub mod config;
pub mod core;
pub mod routers;
pub mod server;

pub use chat_protocol as protocols;

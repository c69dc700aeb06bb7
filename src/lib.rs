//! ai-assist-proxy: editor AI routes in front of an OpenAI-compatible provider
//!
//! Features:
//! - Streaming command completions relayed chunk by chunk
//! - Short copilot suggestions that stop upstream work when the caller leaves
//! - Per-request credentials with environment defaults
//! - Stats logging per request

pub mod api;
pub mod config;
pub mod provider;
pub mod proxy;
pub mod stats;

pub use config::AppConfig;
pub use provider::{CompletionProvider, OpenAiProvider};
pub use proxy::run_server;

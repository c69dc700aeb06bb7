//! Main proxy server implementation

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::command::command_handler;
use super::copilot::copilot_handler;
use crate::config::AppConfig;
use crate::provider::{CompletionProvider, OpenAiProvider};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state for the proxy
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<dyn CompletionProvider>,
}

impl ProxyState {
    pub fn new(config: AppConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}

/// Build the router serving the AI routes
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/ai/command", post(command_handler))
        .route("/api/ai/copilot", post(copilot_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = OpenAiProvider::from_config(&config.provider)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!("Default provider endpoint: {}", config.provider.base_url());
    tracing::info!("Default model: {}", config.provider.model);
    if config.provider.api_key.is_none() {
        tracing::warn!("No default API key configured; requests must supply apiKey");
    }
    tracing::info!(framing = ?config.streaming.framing, "Stream framing");

    let state = ProxyState::new(config, Arc::new(provider));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ai-assist-proxy listening on {}", addr);

    Ok(axum::serve(listener, app).await?)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

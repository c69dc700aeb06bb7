//! Copilot route: short single-shot completion with caller cancellation

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::credentials::{resolve_endpoint, resolve_model};
use super::error::AssistError;
use super::parse_body;
use super::server::ProxyState;
use crate::api::{
    CallerCredentials, ChatCompletionRequest, ChatCompletionResponse, CompletionResult,
    CopilotRequest, Message, Role,
};
use crate::provider::{CompletionProvider, Endpoint, ProviderError};
use crate::stats::{format_copilot_log, log_metrics, Outcome, RequestMetrics, Route};

/// Output cap for inline suggestions
pub const COPILOT_MAX_TOKENS: u32 = 50;
/// Sampling temperature for inline suggestions
pub const COPILOT_TEMPERATURE: f32 = 0.7;

/// `POST /api/ai/copilot`
///
/// axum drops this future when the client disconnects; the drop guard then
/// cancels the token and the in-flight provider call with it.
pub async fn copilot_handler(State(state): State<ProxyState>, body: Bytes) -> Response {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match handle_copilot(&state, &body, cancel).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Run one copilot request; `cancel` stands for the liveness of the inbound connection
pub async fn handle_copilot(
    state: &ProxyState,
    body: &[u8],
    cancel: CancellationToken,
) -> Result<Response, AssistError> {
    let creds: CallerCredentials = parse_body(body)?;
    let endpoint = resolve_endpoint(
        creds.api_key.as_deref(),
        creds.base_url.as_deref(),
        &state.config.provider,
    )?;
    let req: CopilotRequest = parse_body(body)?;
    let model = resolve_model(req.model.as_deref(), &state.config.provider);

    tracing::info!("{}", format_copilot_log(&req, &model));

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = req.system.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(Message::new(Role::System, system));
    }
    messages.push(Message::new(Role::User, req.prompt));

    let request = ChatCompletionRequest {
        model: model.clone(),
        messages,
        temperature: Some(COPILOT_TEMPERATURE),
        max_tokens: Some(COPILOT_MAX_TOKENS),
        stream: None,
        stream_options: None,
    };

    let mut metrics = RequestMetrics::new(Route::Copilot, model);
    let result = complete_cancellable(state.provider.clone(), endpoint, request, cancel).await;

    let outcome = match result {
        Ok(resp) => {
            metrics.record_usage(resp.usage);
            let result = CompletionResult::from(resp);
            metrics.record_finish_reason(Some(result.finish_reason.as_str()));
            metrics.record_output(&result.text);
            metrics.finish(Outcome::Completed);
            Ok(Json(result).into_response())
        }
        Err(ProviderError::Cancelled) => {
            tracing::info!("Copilot request cancelled by client");
            metrics.finish(Outcome::Cancelled);
            Err(AssistError::Cancelled)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                class = e.class(),
                provider = state.provider.name(),
                "Copilot completion failed"
            );
            metrics.finish(Outcome::Failed);
            Err(AssistError::Upstream(e))
        }
    };

    if state.config.stats.enabled {
        log_metrics(&metrics, state.config.stats.format);
    }
    outcome
}

/// Run a completion on its own task, racing it against `cancel`
///
/// When the token fires first the provider future is dropped, which aborts
/// the outbound HTTP request.
pub async fn complete_cancellable(
    provider: Arc<dyn CompletionProvider>,
    endpoint: Endpoint,
    request: ChatCompletionRequest,
    cancel: CancellationToken,
) -> Result<ChatCompletionResponse, ProviderError> {
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = provider.complete_chat(&endpoint, request) => result,
        }
    });

    match task.await {
        Ok(result) => result,
        Err(e) => Err(ProviderError::Upstream(format!("completion task failed: {}", e))),
    }
}

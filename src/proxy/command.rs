//! Command route: streaming chat completion relayed to the editor

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::credentials::{resolve_endpoint, resolve_model};
use super::error::AssistError;
use super::framing::{FrameEncoder, DATA_STREAM_HEADER};
use super::parse_body;
use super::server::ProxyState;
use crate::api::{
    normalize_messages, CallerCredentials, ChatCompletionRequest, CommandRequest, StreamOptions,
};
use crate::config::{StatsConfig, StreamFraming};
use crate::provider::{EventStream, StreamEvent};
use crate::stats::{format_command_log, log_metrics, Outcome, RequestMetrics, Route};

/// Output budget for command completions
pub const COMMAND_MAX_TOKENS: u32 = 2048;

/// `POST /api/ai/command`
pub async fn command_handler(State(state): State<ProxyState>, body: Bytes) -> Response {
    match handle_command(&state, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle_command(state: &ProxyState, body: &[u8]) -> Result<Response, AssistError> {
    let creds: CallerCredentials = parse_body(body)?;
    let endpoint = resolve_endpoint(
        creds.api_key.as_deref(),
        creds.base_url.as_deref(),
        &state.config.provider,
    )?;
    let req: CommandRequest = parse_body(body)?;
    let model = resolve_model(req.model.as_deref(), &state.config.provider);

    tracing::info!("{}", format_command_log(&req, &model));

    let request = ChatCompletionRequest {
        model: model.clone(),
        messages: normalize_messages(&req.messages, req.system.as_deref()),
        temperature: None,
        max_tokens: Some(COMMAND_MAX_TOKENS),
        stream: Some(true),
        stream_options: Some(StreamOptions { include_usage: true }),
    };

    let mut metrics = RequestMetrics::new(Route::Command, model.clone());

    let events = match state.provider.stream_chat(&endpoint, request).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(
                error = %e,
                class = e.class(),
                provider = state.provider.name(),
                "Failed to open provider stream"
            );
            metrics.finish(Outcome::Failed);
            if state.config.stats.enabled {
                log_metrics(&metrics, state.config.stats.format);
            }
            return Err(e.into());
        }
    };

    Ok(relay_stream(
        events,
        FrameEncoder::new(state.config.streaming.framing, model),
        state.config.streaming.framing,
        state.config.streaming.channel_capacity,
        metrics,
        state.config.stats.clone(),
    ))
}

/// Pump provider events through a bounded channel into the response body
///
/// The pump waits while the channel is full, and stops (dropping the provider
/// stream) as soon as the client side of the channel is gone.
fn relay_stream(
    mut events: EventStream,
    encoder: FrameEncoder,
    framing: StreamFraming,
    capacity: usize,
    mut metrics: RequestMetrics,
    stats: StatsConfig,
) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(capacity.max(1));
    let content_type = encoder.content_type();

    tokio::spawn(async move {
        let mut outcome = Outcome::Completed;

        if let Some(frame) = encoder.start() {
            if tx.send(Ok(frame)).await.is_err() {
                outcome = Outcome::ClientClosed;
            }
        }

        while outcome == Outcome::Completed {
            let Some(item) = events.next().await else {
                break;
            };

            let (frame, last) = match item {
                Ok(StreamEvent::TextDelta(text)) => {
                    metrics.record_chunk(&text);
                    (encoder.text(&text), false)
                }
                Ok(StreamEvent::Finish { finish_reason, usage }) => {
                    metrics.record_finish_reason(finish_reason.as_deref());
                    metrics.record_usage(usage);
                    (encoder.finish(finish_reason.as_deref(), usage), true)
                }
                Err(e) => {
                    tracing::error!(error = %e, class = e.class(), "Provider stream failed");
                    outcome = Outcome::Failed;
                    (encoder.error(), true)
                }
            };

            if tx.send(Ok(frame)).await.is_err() && outcome == Outcome::Completed {
                tracing::debug!("Client disconnected, dropping provider stream");
                outcome = Outcome::ClientClosed;
            }
            if last {
                break;
            }
        }

        drop(events);
        metrics.finish(outcome);
        tracing::debug!(chunks = metrics.chunks, outcome = ?outcome, "Stream relay finished");
        if stats.enabled {
            log_metrics(&metrics, stats.format);
        }
    });

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache");
    if framing == StreamFraming::DataStream {
        response = response.header(DATA_STREAM_HEADER, "v1");
    }

    response
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build streaming response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

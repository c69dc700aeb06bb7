//! OpenAI-compatible provider client

use async_trait::async_trait;
use axum::http::header;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;

use super::{CompletionProvider, Endpoint, EventStream, ProviderError, SseDecoder, StreamEvent};
use crate::api::{ChatCompletionRequest, ChatCompletionResponse, StreamChunk, Usage};
use crate::config::ProviderConfig;

/// Longest provider error body kept for logging
const ERROR_BODY_PREVIEW: usize = 500;

/// Talks to `{base_url}/chat/completions` over a pooled HTTP client
#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Build a provider with timeout and TLS settings from config
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(build_http_client(config)?))
    }

    /// List model ids exposed by the provider (`GET {base_url}/models`)
    pub async fn list_models(&self, endpoint: &Endpoint) -> Result<Vec<String>, ProviderError> {
        let resp = self
            .http_client
            .get(format!("{}/models", endpoint.base_url()))
            .bearer_auth(&endpoint.api_key)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(json
            .get("data")
            .and_then(|d| d.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("id").and_then(|i| i.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn post(&self, endpoint: &Endpoint, request: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        self.http_client
            .post(endpoint.chat_completions_url())
            .bearer_auth(&endpoint.api_key)
            .json(request)
    }
}

/// Build an HTTP client with TLS configuration
fn build_http_client(config: &ProviderConfig) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    let mut client_builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .pool_max_idle_per_host(10);

    if let Some(ref tls) = config.tls {
        if tls.accept_invalid_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
            tracing::warn!("TLS: Accepting invalid certificates (use only for development/testing)");
        }

        if let Some(ref ca_path) = tls.ca_cert_path {
            let ca_cert = std::fs::read(ca_path)?;
            let ca_cert = reqwest::Certificate::from_pem(&ca_cert)?;
            client_builder = client_builder.add_root_certificate(ca_cert);
            tracing::info!("TLS: Loaded custom CA certificate from {}", ca_path);
        }
    }

    Ok(client_builder.build()?)
}

/// Turn a non-2xx response into `ProviderError::Status`, keeping a body preview
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: preview,
    })
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream_chat(
        &self,
        endpoint: &Endpoint,
        mut request: ChatCompletionRequest,
    ) -> Result<EventStream, ProviderError> {
        request.stream = Some(true);

        let resp = self.post(endpoint, &request).send().await?;
        let resp = check_status(resp).await?;

        tracing::debug!(
            status = %resp.status(),
            content_type = ?resp.headers().get(header::CONTENT_TYPE),
            "Provider stream opened"
        );

        Ok(decode_stream(resp.bytes_stream().boxed()))
    }

    async fn complete_chat(
        &self,
        endpoint: &Endpoint,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        request.stream = None;
        request.stream_options = None;

        let resp = self.post(endpoint, &request).send().await?;
        let resp = check_status(resp).await?;

        let body = resp.bytes().await?;
        let json: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if let Some(error) = json.get("error") {
            return Err(ProviderError::Upstream(error.to_string()));
        }
        serde_json::from_value(json).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Decoding state carried between polls of the event stream
struct ChunkState {
    upstream: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    finished: bool,
    /// Error to report once the already decoded events are out
    failed: Option<ProviderError>,
}

impl ChunkState {
    /// Handle one `data` payload
    fn ingest(&mut self, data: &str) -> Result<(), ProviderError> {
        if self.finished {
            return Ok(());
        }
        if data == "[DONE]" {
            self.finish();
            return Ok(());
        }

        let json: serde_json::Value =
            serde_json::from_str(data).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if let Some(error) = json.get("error") {
            return Err(ProviderError::Upstream(error.to_string()));
        }
        let chunk: StreamChunk =
            serde_json::from_value(json).map_err(|e| ProviderError::Decode(e.to_string()))?;

        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.pending.push_back(StreamEvent::TextDelta(content));
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.pending.push_back(StreamEvent::Finish {
            finish_reason: self.finish_reason.take(),
            usage: self.usage.take(),
        });
        self.finished = true;
    }
}

/// Convert the provider's SSE byte stream into ordered `StreamEvent`s
///
/// The stream ends after a `Finish` event or after the first error. Deltas
/// decoded before a failure are still yielded ahead of the error.
fn decode_stream(upstream: BoxStream<'static, reqwest::Result<Bytes>>) -> EventStream {
    let state = ChunkState {
        upstream,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finish_reason: None,
        usage: None,
        finished: false,
        failed: None,
    };

    futures::stream::unfold(Some(state), |state| async move {
        let mut st = state?;
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), Some(st)));
            }
            if let Some(e) = st.failed.take() {
                return Some((Err(e), None));
            }
            if st.finished {
                return None;
            }

            match st.upstream.next().await {
                Some(Ok(bytes)) => {
                    tracing::trace!("Raw SSE chunk ({} bytes)", bytes.len());
                    st.decoder.push(&bytes);
                    while let Some(data) = st.decoder.next_data() {
                        if let Err(e) = st.ingest(&data) {
                            st.failed = Some(e);
                            break;
                        }
                    }
                }
                Some(Err(e)) => st.failed = Some(ProviderError::Transport(e)),
                None => {
                    if let Some(data) = st.decoder.finish() {
                        if let Err(e) = st.ingest(&data) {
                            st.failed = Some(e);
                            continue;
                        }
                    }
                    if !st.finished {
                        tracing::debug!("Provider stream closed without [DONE]");
                        st.finish();
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Message, Role};
    use axum::{
        body::Body,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        auth: Arc<Mutex<Option<String>>>,
        body: Arc<Mutex<Option<serde_json::Value>>>,
    }

    /// Start a one-route mock provider on an ephemeral port
    async fn mock_provider(
        captured: Captured,
        reply: fn(serde_json::Value) -> Response,
    ) -> String {
        async fn handle(
            State((captured, reply)): State<(Captured, fn(serde_json::Value) -> Response)>,
            headers: HeaderMap,
            Json(body): Json<serde_json::Value>,
        ) -> Response {
            *captured.auth.lock().unwrap() = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            *captured.body.lock().unwrap() = Some(body.clone());
            reply(body)
        }

        let app = Router::new()
            .route("/v1/chat/completions", post(handle))
            .with_state((captured, reply));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn sse_reply(_: serde_json::Value) -> Response {
        let body = concat!(
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"One\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" two\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" three\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":3,\"total_tokens\":8}}\n\n",
            "data: [DONE]\n\n"
        );
        Response::builder()
            .header(header::CONTENT_TYPE, "text/event-stream")
            .body(Body::from(body))
            .unwrap()
    }

    fn json_reply(_: serde_json::Value) -> Response {
        Json(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "blue."}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6}
        }))
        .into_response()
    }

    fn error_reply(_: serde_json::Value) -> Response {
        (StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"slow down"}}"#).into_response()
    }

    fn request(max_tokens: u32) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![Message::new(Role::User, "count")],
            temperature: None,
            max_tokens: Some(max_tokens),
            stream: None,
            stream_options: None,
        }
    }

    #[tokio::test]
    async fn test_stream_chat_yields_deltas_in_order() {
        let captured = Captured::default();
        let base_url = mock_provider(captured.clone(), sse_reply).await;
        let provider = OpenAiProvider::new(reqwest::Client::new());

        let stream = provider
            .stream_chat(&Endpoint::new("sk-test", base_url), request(2048))
            .await
            .unwrap();
        let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("One".to_string()),
                StreamEvent::TextDelta(" two".to_string()),
                StreamEvent::TextDelta(" three".to_string()),
                StreamEvent::Finish {
                    finish_reason: Some("stop".to_string()),
                    usage: Some(Usage {
                        prompt_tokens: 5,
                        completion_tokens: 3,
                        total_tokens: 8
                    }),
                },
            ]
        );

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn test_complete_chat_parses_response() {
        let captured = Captured::default();
        let base_url = mock_provider(captured.clone(), json_reply).await;
        let provider = OpenAiProvider::new(reqwest::Client::new());

        let mut req = request(50);
        req.temperature = Some(0.7);
        let resp = provider
            .complete_chat(&Endpoint::new("sk-copilot", base_url), req)
            .await
            .unwrap();

        assert_eq!(resp.choices[0].message.as_ref().unwrap().content.as_deref(), Some("blue."));
        let body = captured.body.lock().unwrap().clone().unwrap();
        assert!(body.get("stream").is_none());
        assert_eq!(body["max_tokens"], 50);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer sk-copilot"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base_url = mock_provider(Captured::default(), error_reply).await;
        let provider = OpenAiProvider::new(reqwest::Client::new());

        let err = provider
            .complete_chat(&Endpoint::new("sk-test", base_url.clone()), request(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
        assert_eq!(err.class(), "rate_limit");

        let err = provider
            .stream_chat(&Endpoint::new("sk-test", base_url), request(2048))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transport_error() {
        let provider = OpenAiProvider::new(reqwest::Client::new());
        let err = provider
            .complete_chat(&Endpoint::new("sk-test", "http://127.0.0.1:1/v1"), request(50))
            .await
            .unwrap_err();
        assert_eq!(err.class(), "transport");
    }

    fn byte_stream(parts: &[&'static str]) -> BoxStream<'static, reqwest::Result<Bytes>> {
        let items: Vec<reqwest::Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_decode_stream_without_done_marker() {
        let stream = decode_stream(byte_stream(&[
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"b\"},\"finish_reason\":\"length\"}]}",
        ]));
        let events: Vec<StreamEvent> = stream.map(|e| e.unwrap()).collect().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], StreamEvent::TextDelta("b".to_string()));
        assert_eq!(
            events[2],
            StreamEvent::Finish {
                finish_reason: Some("length".to_string()),
                usage: None
            }
        );
    }

    #[tokio::test]
    async fn test_decode_stream_stops_on_malformed_chunk() {
        let stream = decode_stream(byte_stream(&[
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {not json\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"never\"}}]}\n\n",
        ]));
        let events: Vec<Result<StreamEvent, ProviderError>> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_decode_stream_yields_deltas_before_error_in_same_read() {
        let stream = decode_stream(byte_stream(&[
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"a\"}}]}\n\ndata: {bad\n\n",
        ]));
        let events: Vec<Result<StreamEvent, ProviderError>> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::TextDelta("a".to_string()));
        assert!(matches!(events[1], Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_decode_stream_reports_inline_error() {
        let stream = decode_stream(byte_stream(&["data: {\"error\":{\"message\":\"overloaded\"}}\n\n"]));
        let events: Vec<Result<StreamEvent, ProviderError>> = stream.collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(ProviderError::Upstream(_))));
    }
}

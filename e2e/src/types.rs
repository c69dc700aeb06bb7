//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response the provider will serve for the next request to /v1/chat/completions
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
    /// Wait this long before answering
    pub delay_ms: u64,
}

impl MockResponse {
    /// Create a standard JSON chat completion response
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "application/json".to_string(),
            delay_ms: 0,
        }
    }

    /// Create an SSE stream response (whole body sent at once)
    pub fn sse(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/event-stream".to_string(),
            delay_ms: 0,
        }
    }

    /// Create an error response
    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "application/json".to_string(),
            delay_ms: 0,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Shared state for the mock provider server
#[derive(Debug, Default)]
pub struct BackendState {
    /// Queue of responses to serve - tests push responses, the mock pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All requests received by the mock (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A request received by the mock provider
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ReceivedRequest {
    pub path: String,
    /// Value of the Authorization header, if any
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// Result of a proxy request read to the end
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: u16,
    pub text: String,
    /// Parsed body, `Null` when the body is not JSON
    pub body: serde_json::Value,
}

impl ProxyResponse {
    /// Get a nested field using dot notation (e.g. "usage.totalTokens")
    pub fn get(&self, path: &str) -> Option<&serde_json::Value> {
        let mut current = &self.body;
        for part in path.split('.') {
            current = if let Ok(idx) = part.parse::<usize>() {
                current.as_array()?.get(idx)?
            } else {
                current.as_object()?.get(part)?
            };
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }
}

/// One `<code>:<json>` part of a data stream response
#[derive(Debug, Clone)]
pub struct StreamPart {
    pub code: char,
    pub value: serde_json::Value,
}

/// Result of a streaming command request
#[derive(Debug)]
pub struct StreamingResponse {
    pub content_type: String,
    pub protocol: Option<String>,
    pub parts: Vec<StreamPart>,
}

impl StreamingResponse {
    /// Text deltas in the order they were received
    pub fn text_deltas(&self) -> Vec<String> {
        self.parts
            .iter()
            .filter(|p| p.code == '0')
            .filter_map(|p| p.value.as_str().map(str::to_string))
            .collect()
    }

    pub fn accumulated_text(&self) -> String {
        self.text_deltas().concat()
    }

    /// The `d:` part closing the message
    pub fn finish(&self) -> Option<&serde_json::Value> {
        self.parts.iter().rev().find(|p| p.code == 'd').map(|p| &p.value)
    }

    /// The `3:` error part, if the stream failed
    pub fn error(&self) -> Option<&str> {
        self.parts
            .iter()
            .find(|p| p.code == '3')
            .and_then(|p| p.value.as_str())
    }
}

/// Result of a single test case
#[derive(Debug)]
#[allow(dead_code)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

//! Per-request metrics for the AI routes

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

use crate::api::Usage;

/// Which route served the request
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Command,
    Copilot,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Command => "command",
            Route::Copilot => "copilot",
        }
    }
}

/// How the request ended
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// Caller cancelled a single-shot request
    Cancelled,
    /// Caller went away while a stream was being relayed
    ClientClosed,
    Failed,
}

/// Collected metrics from a request/response cycle
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    /// Unique request ID
    pub request_id: String,
    /// Timestamp of the request
    pub timestamp: DateTime<Utc>,
    pub route: Route,
    /// Model name
    pub model: String,
    /// Number of prompt tokens, when the provider reported usage
    pub prompt_tokens: Option<u64>,
    /// Number of completion tokens, when the provider reported usage
    pub completion_tokens: Option<u64>,
    /// Text chunks relayed to the client (streaming only)
    pub chunks: u64,
    /// Output length (characters)
    pub output_len: usize,
    /// Finish reason
    pub finish_reason: String,
    pub outcome: Outcome,
    /// Request duration in ms
    pub duration_ms: f64,
    #[serde(skip)]
    started: Instant,
}

impl RequestMetrics {
    pub fn new(route: Route, model: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            route,
            model: model.into(),
            prompt_tokens: None,
            completion_tokens: None,
            chunks: 0,
            output_len: 0,
            finish_reason: "unknown".to_string(),
            outcome: Outcome::Completed,
            duration_ms: 0.0,
            started: Instant::now(),
        }
    }

    /// Record the whole output of a single-shot completion
    pub fn record_output(&mut self, text: &str) {
        self.output_len = text.chars().count();
    }

    /// Record one relayed text chunk
    pub fn record_chunk(&mut self, text: &str) {
        self.chunks += 1;
        self.output_len += text.chars().count();
    }

    pub fn record_usage(&mut self, usage: Option<Usage>) {
        if let Some(u) = usage {
            self.prompt_tokens = Some(u.prompt_tokens);
            self.completion_tokens = Some(u.completion_tokens);
        }
    }

    pub fn record_finish_reason(&mut self, reason: Option<&str>) {
        if let Some(reason) = reason {
            self.finish_reason = reason.to_string();
        }
    }

    /// Stamp the outcome and elapsed time
    pub fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
    }
}

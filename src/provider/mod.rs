//! Completion provider abstraction

mod openai;
mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

use crate::api::{ChatCompletionRequest, ChatCompletionResponse, Usage};

pub use openai::OpenAiProvider;
pub use sse::SseDecoder;

/// Resolved provider credentials for a single request
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub api_key: String,
    pub base_url: String,
}

impl Endpoint {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("api_key", &redact_key(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Shorten a secret for logs: keeps the last four characters
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// One event of a streamed completion, in provider arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental output text
    TextDelta(String),
    /// End of generation
    Finish {
        finish_reason: Option<String>,
        usage: Option<Usage>,
    },
}

pub type EventStream = BoxStream<'static, Result<StreamEvent, ProviderError>>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("provider reported an error: {0}")]
    Upstream(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Coarse failure class, used for logging only
    pub fn class(&self) -> &'static str {
        match self {
            ProviderError::Transport(_) => "transport",
            ProviderError::Status { status, .. } => match status {
                401 | 403 => "auth",
                429 => "rate_limit",
                500..=599 => "provider_outage",
                _ => "rejected",
            },
            ProviderError::Decode(_) => "decode",
            ProviderError::Upstream(_) => "provider_error",
            ProviderError::Cancelled => "cancelled",
        }
    }
}

/// An OpenAI-compatible chat completion service
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streaming completion; resolves once the provider has accepted the request
    async fn stream_chat(
        &self,
        endpoint: &Endpoint,
        request: ChatCompletionRequest,
    ) -> Result<EventStream, ProviderError>;

    /// Run a completion to the end and return the whole response
    async fn complete_chat(
        &self,
        endpoint: &Endpoint,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError>;

    /// Provider name (for logging)
    fn name(&self) -> &'static str;
}

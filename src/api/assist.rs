//! Request and response bodies of the editor-facing AI routes

use serde::{Deserialize, Serialize};

use super::openai::{ChatCompletionResponse, Message, Role, Usage};

/// Credential fields shared by both route bodies
///
/// Read on its own so the key check does not depend on the rest of the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerCredentials {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, rename = "baseURL")]
    pub base_url: Option<String>,
}

/// Body of `POST /api/ai/command`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, rename = "baseURL")]
    pub base_url: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
}

/// Body of `POST /api/ai/copilot`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopilotRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, rename = "baseURL")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
}

/// A conversation turn as the editor's chat hook sends it
///
/// Extra fields (`id`, `createdAt`, annotations) are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub parts: Option<Vec<ContentPart>>,
}

/// Message content - can be string or array of content parts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part of a structured message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

fn join_text_parts(parts: &[ContentPart]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter(|p| p.part_type == "text")
        .filter_map(|p| p.text.as_deref())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}

impl ChatMessage {
    /// Text of the turn: string content first, then text parts
    pub fn text(&self) -> Option<String> {
        match &self.content {
            Some(MessageContent::Text(text)) if !text.is_empty() => return Some(text.clone()),
            Some(MessageContent::Parts(parts)) => {
                if let Some(text) = join_text_parts(parts) {
                    return Some(text);
                }
            }
            _ => {}
        }
        self.parts.as_deref().and_then(join_text_parts)
    }
}

/// Convert editor chat turns into provider messages
///
/// A non-empty `system` instruction is placed first. Turns with an unsupported
/// role or without text are dropped.
pub fn normalize_messages(messages: &[ChatMessage], system: Option<&str>) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len() + 1);

    if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
        out.push(Message::new(Role::System, system));
    }

    for msg in messages {
        let Some(role) = Role::parse(&msg.role) else {
            tracing::debug!(role = %msg.role, "Dropping message with unsupported role");
            continue;
        };
        match msg.text() {
            Some(text) => out.push(Message::new(role, text)),
            None => tracing::debug!(role = %msg.role, "Dropping message without text content"),
        }
    }

    out
}

/// Token usage in the shape the editor expects
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(u: Usage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// Provider response metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub id: String,
    pub model_id: String,
}

/// Body returned by the copilot route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub text: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
    pub response: ResponseInfo,
}

impl From<ChatCompletionResponse> for CompletionResult {
    fn from(resp: ChatCompletionResponse) -> Self {
        let first = resp.choices.into_iter().next();
        let finish_reason = first
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let text = first
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Self {
            text,
            finish_reason,
            usage: resp.usage.map(TokenUsage::from).unwrap_or_default(),
            response: ResponseInfo {
                id: resp.id,
                model_id: resp.model,
            },
        }
    }
}

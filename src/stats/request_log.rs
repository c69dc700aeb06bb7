//! Request logging formatter

use crate::api::{ChatMessage, CommandRequest, CopilotRequest};
use crate::provider::redact_key;

/// Format a command request log line in compact format
pub fn format_command_log(req: &CommandRequest, model: &str) -> String {
    let mut parts = vec![
        "command".to_string(),
        format!("model={}", model),
        format!("msgs={}", req.messages.len()),
        "stream".to_string(),
    ];

    push_overrides(&mut parts, req.api_key.as_deref(), req.base_url.as_deref());

    if let Some(msg) = extract_last_user_message(&req.messages) {
        parts.push(format!("\"{}\"", msg));
    }

    format!("→ {}", parts.join(" "))
}

/// Format a copilot request log line in compact format
pub fn format_copilot_log(req: &CopilotRequest, model: &str) -> String {
    let mut parts = vec!["copilot".to_string(), format!("model={}", model)];

    push_overrides(&mut parts, req.api_key.as_deref(), req.base_url.as_deref());

    let prompt = normalize_whitespace(&req.prompt);
    if !prompt.is_empty() {
        parts.push(format!("\"{}\"", truncate_message(&prompt)));
    }

    format!("→ {}", parts.join(" "))
}

/// Note caller-supplied credentials without printing them
fn push_overrides(parts: &mut Vec<String>, api_key: Option<&str>, base_url: Option<&str>) {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        parts.push(format!("key={}", redact_key(key)));
    }
    if let Some(url) = base_url.filter(|u| !u.is_empty()) {
        parts.push(format!("base={}", url));
    }
}

/// Extract and format the most recent user message with truncation
fn extract_last_user_message(messages: &[ChatMessage]) -> Option<String> {
    let msg = messages.iter().rev().find(|m| m.role == "user")?;
    let content = msg.text()?;
    let normalized = normalize_whitespace(&content);
    Some(truncate_message(&normalized))
}

/// Convert newlines and tabs to single spaces, collapse multiple spaces
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate message according to rules:
/// - If <= 100 chars: show all
/// - If > 100 chars: first 25 + " ... " + last 75
fn truncate_message(s: &str) -> String {
    const MAX_TOTAL: usize = 100;
    const PREFIX_LEN: usize = 25;
    const SUFFIX_LEN: usize = 75;
    const ELLIPSIS: &str = " ... ";

    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= MAX_TOTAL {
        return s.to_string();
    }

    let prefix: String = chars[..PREFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - SUFFIX_LEN..].iter().collect();

    format!("{}{}{}", prefix, ELLIPSIS, suffix)
}

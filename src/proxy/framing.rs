//! Wire framing for relayed completion streams
//!
//! `DataStream` writes the newline-delimited `<type>:<json>` parts the editor's
//! chat hook consumes; `Sse` writes OpenAI-style chunks. Each provider delta
//! becomes exactly one frame so the relayed order matches arrival order.

use bytes::Bytes;
use serde_json::json;

use crate::api::Usage;
use crate::config::StreamFraming;

/// Text of the error part written when the provider fails mid-stream
pub const STREAM_ERROR_MESSAGE: &str = "An error occurred.";

/// Header advertising the data stream protocol version
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Encodes stream events for one response
pub struct FrameEncoder {
    framing: StreamFraming,
    message_id: String,
    model: String,
    created: i64,
}

impl FrameEncoder {
    pub fn new(framing: StreamFraming, model: impl Into<String>) -> Self {
        Self {
            framing,
            message_id: format!("msg-{}", uuid::Uuid::new_v4().simple()),
            model: model.into(),
            created: chrono::Utc::now().timestamp(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.framing {
            StreamFraming::DataStream => "text/plain; charset=utf-8",
            StreamFraming::Sse => "text/event-stream",
        }
    }

    /// Frame sent before any text, if the framing has one
    pub fn start(&self) -> Option<Bytes> {
        match self.framing {
            StreamFraming::DataStream => Some(part('f', &json!({ "messageId": self.message_id }))),
            StreamFraming::Sse => None,
        }
    }

    pub fn text(&self, text: &str) -> Bytes {
        match self.framing {
            StreamFraming::DataStream => part('0', &json!(text)),
            StreamFraming::Sse => self.sse_chunk(json!({ "content": text }), None, None),
        }
    }

    /// Closing frames carrying the finish reason and token usage
    pub fn finish(&self, finish_reason: Option<&str>, usage: Option<Usage>) -> Bytes {
        match self.framing {
            StreamFraming::DataStream => {
                let reason = data_stream_finish_reason(finish_reason);
                let usage = usage.unwrap_or_default();
                let usage = json!({
                    "promptTokens": usage.prompt_tokens,
                    "completionTokens": usage.completion_tokens,
                });
                let mut out = part(
                    'e',
                    &json!({ "finishReason": reason, "usage": usage, "isContinued": false }),
                )
                .to_vec();
                out.extend_from_slice(&part('d', &json!({ "finishReason": reason, "usage": usage })));
                Bytes::from(out)
            }
            StreamFraming::Sse => {
                let mut out = self
                    .sse_chunk(json!({}), Some(finish_reason.unwrap_or("stop")), usage)
                    .to_vec();
                out.extend_from_slice(b"data: [DONE]\n\n");
                Bytes::from(out)
            }
        }
    }

    /// Terminal error frame; carries no provider detail
    pub fn error(&self) -> Bytes {
        match self.framing {
            StreamFraming::DataStream => part('3', &json!(STREAM_ERROR_MESSAGE)),
            StreamFraming::Sse => {
                let event = json!({ "error": { "message": STREAM_ERROR_MESSAGE } });
                Bytes::from(format!("data: {}\n\n", event))
            }
        }
    }

    fn sse_chunk(&self, delta: serde_json::Value, finish_reason: Option<&str>, usage: Option<Usage>) -> Bytes {
        let mut chunk = json!({
            "id": self.message_id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }],
        });
        if let Some(usage) = usage {
            chunk["usage"] = json!(usage);
        }
        Bytes::from(format!("data: {}\n\n", chunk))
    }
}

/// One `<code>:<json>\n` data stream part
fn part(code: char, value: &serde_json::Value) -> Bytes {
    Bytes::from(format!("{}:{}\n", code, value))
}

/// Map OpenAI finish reasons to the data stream vocabulary
fn data_stream_finish_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("stop") => "stop",
        Some("length") => "length",
        Some("content_filter") => "content-filter",
        Some("tool_calls") | Some("function_call") => "tool-calls",
        Some(_) => "other",
        None => "unknown",
    }
}

//! Common test helpers and JSON builders

use serde_json::{json, Value};

// ─── Request builders ────────────────────────────────────────────────────────

/// Build a command request with one user turn
pub fn command_request(prompt: &str, api_key: Option<&str>) -> Value {
    let mut req = json!({
        "messages": [{"id": "m1", "role": "user", "content": prompt}]
    });
    if let Some(key) = api_key {
        req["apiKey"] = json!(key);
    }
    req
}

/// Build a copilot request
pub fn copilot_request(prompt: &str, api_key: Option<&str>) -> Value {
    let mut req = json!({ "prompt": prompt });
    if let Some(key) = api_key {
        req["apiKey"] = json!(key);
    }
    req
}

// ─── Response builders ────────────────────────────────────────────────────────

/// Build a normal text completion response from the provider
pub fn provider_text_response(content: &str) -> String {
    json!({
        "id": "chatcmpl-test001",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
    .to_string()
}

/// Build an SSE body streaming `chunks` one delta at a time, then usage and `[DONE]`
pub fn provider_sse_stream(chunks: &[&str]) -> String {
    let mut body = String::new();
    let mut push = |event: Value| body.push_str(&format!("data: {}\n\n", event));

    push(json!({
        "id": "chatcmpl-stream", "object": "chat.completion.chunk", "model": "test-model",
        "choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}, "finish_reason": null}]
    }));
    for chunk in chunks {
        push(json!({
            "id": "chatcmpl-stream", "object": "chat.completion.chunk", "model": "test-model",
            "choices": [{"index": 0, "delta": {"content": chunk}, "finish_reason": null}]
        }));
    }
    push(json!({
        "id": "chatcmpl-stream", "object": "chat.completion.chunk", "model": "test-model",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    }));
    push(json!({
        "id": "chatcmpl-stream", "object": "chat.completion.chunk", "model": "test-model",
        "choices": [],
        "usage": {"prompt_tokens": 12, "completion_tokens": chunks.len(), "total_tokens": 12 + chunks.len()}
    }));
    body.push_str("data: [DONE]\n\n");
    body
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert the response status
pub fn assert_status(actual: u16, expected: u16) -> anyhow::Result<()> {
    assert_true(actual == expected, &format!("Expected {expected}, got {actual}"))
}

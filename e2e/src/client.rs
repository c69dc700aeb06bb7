//! HTTP client that simulates how the editor talks to the proxy

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;

use crate::types::{ProxyResponse, StreamPart, StreamingResponse};

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

/// POST a JSON body to the proxy and read the whole response
pub async fn post_json(
    client: &Client,
    proxy_addr: &str,
    path: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<ProxyResponse> {
    let url = format!("http://{proxy_addr}{path}");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send request to proxy: {}", e))?;

    let status = resp.status().as_u16();
    let text = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read proxy response: {}", e))?;
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

    Ok(ProxyResponse { status, text, body })
}

/// POST a command request and collect every data stream part
pub async fn post_command_stream(
    client: &Client,
    proxy_addr: &str,
    request_body: serde_json::Value,
) -> anyhow::Result<StreamingResponse> {
    let url = format!("http://{proxy_addr}/api/ai/command");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send streaming request to proxy: {}", e))?;

    let status = resp.status().as_u16();
    if status != 200 {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("Proxy returned error {}: {}", status, body));
    }

    let header = |name: &str| {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header("content-type").unwrap_or_default();
    let protocol = header("x-vercel-ai-data-stream");

    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        all_bytes.extend_from_slice(&chunk);
    }

    let body_text = String::from_utf8_lossy(&all_bytes);
    let parts = parse_data_stream(&body_text)?;

    Ok(StreamingResponse {
        content_type,
        protocol,
        parts,
    })
}

/// Parse data stream body text into parts
///
/// Each line is `<code>:<json>`.
fn parse_data_stream(text: &str) -> anyhow::Result<Vec<StreamPart>> {
    let mut parts = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let (code, json) = line
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("Data stream line without code: {:?}", line))?;
        let mut chars = code.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(anyhow::anyhow!("Bad data stream part code: {:?}", line)),
        };
        let value = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Data stream JSON parse error: {}: {}", e, json))?;
        parts.push(StreamPart { code, value });
    }

    Ok(parts)
}

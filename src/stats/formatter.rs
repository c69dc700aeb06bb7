//! Stats formatting for different output formats

use super::{Outcome, RequestMetrics};
use crate::config::StatsFormat;

/// Format metrics according to the configured format
pub fn format_metrics(metrics: &RequestMetrics, format: StatsFormat) -> String {
    match format {
        StatsFormat::Pretty => format_pretty(metrics),
        StatsFormat::Json => format_json(metrics),
        StatsFormat::Compact => format_compact(metrics),
    }
}

/// Log metrics with the layout each format expects
pub fn log_metrics(metrics: &RequestMetrics, format: StatsFormat) {
    let formatted = format_metrics(metrics, format);
    match format {
        StatsFormat::Pretty => tracing::info!("\n{}", formatted),
        _ => tracing::info!("{}", formatted),
    }
}

fn tokens_str(m: &RequestMetrics) -> String {
    match (m.prompt_tokens, m.completion_tokens) {
        (Some(p), Some(c)) => format!("{}/{}", p, c),
        _ => "N/A".to_string(),
    }
}

fn outcome_str(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Completed => "completed",
        Outcome::Cancelled => "cancelled",
        Outcome::ClientClosed => "client_closed",
        Outcome::Failed => "failed",
    }
}

/// Pretty box format for terminal output
fn format_pretty(m: &RequestMetrics) -> String {
    format!(
        r#"┌──────────────────────────────────────────────────────────────────┐
│ AI Request Metrics                                               │
├──────────────────────────────────────────────────────────────────┤
│ Route: {:56}│
│ Model: {:56}│
│ Time:  {:56}│
├──────────────────────────────────────────────────────────────────┤
│ Tokens (in/out): {:46}│
│ Chunks: {:8} │ Output chars: {:26}│
│ Finish: {:56}│
│ Outcome: {:55}│
│ Duration: {:51.1}ms│
└──────────────────────────────────────────────────────────────────┘
"#,
        m.route.as_str(),
        truncate(&m.model, 56),
        m.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        tokens_str(m),
        m.chunks,
        m.output_len,
        truncate(&m.finish_reason, 56),
        outcome_str(m.outcome),
        m.duration_ms,
    )
}

/// JSON format for structured logging
fn format_json(m: &RequestMetrics) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

/// Compact single-line format
fn format_compact(m: &RequestMetrics) -> String {
    format!(
        "[{}] {} model={} tokens={} chunks={} finish={} outcome={} dur={:.1}ms",
        m.timestamp.format("%H:%M:%S"),
        m.route.as_str(),
        m.model,
        tokens_str(m),
        m.chunks,
        m.finish_reason,
        outcome_str(m.outcome),
        m.duration_ms
    )
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

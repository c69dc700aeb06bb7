//! Test runner - executes scenarios against the proxy and reports results

use colored::Colorize;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{SharedBackendState, TestResult};

type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single test case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

impl TestCase {
    /// Route group, the part of the name before the first `/`
    fn group(&self) -> &'static str {
        self.name.split('/').next().unwrap_or(self.name)
    }
}

/// Everything a scenario needs: where the proxy listens and the mock provider's state
#[derive(Clone)]
pub struct TestContext {
    pub proxy_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

impl TestContext {
    /// Forget queued responses and recorded requests from the previous scenario
    fn reset_provider(&self) {
        let mut state = self.backend_state.lock().unwrap();
        state.response_queue.clear();
        state.received_requests.clear();
    }
}

/// Run the selected cases one after another and print a report
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    print_banner(&ctx.proxy_addr, selected.len());

    let suite_start = Instant::now();
    let mut results = Vec::with_capacity(selected.len());
    let mut current_group = "";

    for case in selected {
        if case.group() != current_group {
            current_group = case.group();
            println!("  {}", current_group.bright_white().underline());
        }

        ctx.reset_provider();
        print!("    {} {} ... ", "▶".bright_blue(), case.name.bright_white());

        let start = Instant::now();
        let outcome = (case.run)(ctx.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(()) => {
                println!("{} ({duration_ms}ms)", "PASS".bright_green().bold());
                None
            }
            Err(e) => {
                println!("{} ({duration_ms}ms)", "FAIL".bright_red().bold());
                for (depth, cause) in e.chain().enumerate() {
                    let label = if depth == 0 { "Error:" } else { "Caused by:" };
                    println!("      {} {}", label.bright_red(), cause);
                }
                Some(e.to_string())
            }
        };

        results.push(TestResult {
            name: case.name.to_string(),
            passed: error.is_none(),
            error,
            duration_ms,
        });
    }

    print_summary(&results, suite_start.elapsed().as_millis());
    results
}

fn print_banner(proxy_addr: &str, count: usize) {
    println!("\n{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("{}", "  ai-assist-proxy End-to-End Tests".bright_white().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("  Proxy:   {}", proxy_addr.bright_cyan());
    println!("  Running: {} test(s)\n", count.to_string().bright_cyan());
}

fn print_summary(results: &[TestResult], total_ms: u128) {
    let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
    let passed = results.len() - failed.len();

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed in {}ms", passed, failed.len(), total_ms);
    if failed.is_empty() {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
        for r in failed {
            println!("    {} {}", "✗".bright_red(), r.name);
        }
    }
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());
}

/// Print every registered test, grouped by route
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    let mut current_group = "";
    for case in cases {
        if case.group() != current_group {
            current_group = case.group();
            println!("  {}", current_group.bright_white().underline());
        }
        println!("    {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}

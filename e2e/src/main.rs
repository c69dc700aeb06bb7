//! ai-assist-proxy e2e test runner
//!
//! Default (no args): finds the proxy binary, starts a mock provider, spawns
//! the proxy against it, runs every scenario, then stops the proxy.
//!
//!   cargo run                          # auto-detect proxy binary, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- attach                # use an already-running proxy
//!   cargo run -- spawn [opts]          # explicit binary / config / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use runner::{list_tests, run_tests, TestContext};
use std::path::Path;
use tests::all_tests;
use tokio::process::{Child, Command as ProcessCommand};

/// Proxy binary candidates, tried in order
const DEFAULT_PROXY_BINS: &[&str] = &["../target/release/ai-assist-proxy", "../target/debug/ai-assist-proxy"];

const DEFAULT_PROXY_CONFIG: &str = "test_configs/proxy.yaml";
const DEFAULT_PROVIDER_PORT: u16 = 18080;
const DEFAULT_PROXY_PORT: u16 = 18066;

/// Variables the proxy would otherwise pick up as default credentials
const PROVIDER_ENV: &[&str] = &["OPENAI_API_KEY", "OPENAI_BASE_URL", "OPENAI_MODEL"];

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for ai-assist-proxy",
    long_about = "Runs all e2e tests by default (no arguments needed).\n\
                  Spawns the proxy against a mock provider, runs tests, then stops it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List all available tests
    List,

    /// Run against an already-running proxy (its provider must be the mock)
    Attach {
        /// Address of the running proxy
        #[arg(long, default_value = "127.0.0.1:18066")]
        proxy_addr: String,

        /// Port for the mock provider
        #[arg(long, default_value_t = DEFAULT_PROVIDER_PORT)]
        provider_port: u16,
    },

    /// Spawn the proxy binary, run all tests, then stop it
    Spawn(SpawnArgs),
}

#[derive(Args)]
struct SpawnArgs {
    /// Path to the ai-assist-proxy binary
    #[arg(long)]
    proxy_bin: Option<String>,

    /// Proxy config YAML; its provider.base_url must point at the mock provider
    #[arg(long, default_value = DEFAULT_PROXY_CONFIG)]
    proxy_config: String,

    /// Port for the mock provider - must match config
    #[arg(long, default_value_t = DEFAULT_PROVIDER_PORT)]
    provider_port: u16,

    /// Proxy listen port - must match config
    #[arg(long, default_value_t = DEFAULT_PROXY_PORT)]
    proxy_port: u16,
}

impl Default for SpawnArgs {
    fn default() -> Self {
        Self {
            proxy_bin: None,
            proxy_config: DEFAULT_PROXY_CONFIG.to_string(),
            provider_port: DEFAULT_PROVIDER_PORT,
            proxy_port: DEFAULT_PROXY_PORT,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = cli.filter.as_deref();

    let failed = match cli.command {
        Some(Command::List) => {
            list_tests(&all_tests());
            false
        }
        Some(Command::Attach {
            proxy_addr,
            provider_port,
        }) => {
            let ctx = context(proxy_addr, provider_port).await?;
            suite_failed(run_tests(all_tests(), ctx, filter).await)
        }
        Some(Command::Spawn(args)) => spawn_and_run(args, filter).await?,
        None => spawn_and_run(SpawnArgs::default(), filter).await?,
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Start the mock provider and build the shared test context
async fn context(proxy_addr: String, provider_port: u16) -> anyhow::Result<TestContext> {
    println!("Starting mock provider on port {}...", provider_port);
    let backend_state = backend::start(provider_port).await?;
    println!("Mock provider running on 127.0.0.1:{}", provider_port);

    Ok(TestContext {
        proxy_addr,
        backend_state,
        http_client: client::build_client(),
    })
}

/// Spawn the proxy, run the suite, stop the proxy; returns true when a test failed
async fn spawn_and_run(args: SpawnArgs, filter: Option<&str>) -> anyhow::Result<bool> {
    let proxy_bin = match args.proxy_bin {
        Some(p) => p,
        None => find_proxy_bin()?,
    };
    let proxy_addr = format!("127.0.0.1:{}", args.proxy_port);
    let ctx = context(proxy_addr.clone(), args.provider_port).await?;

    let mut proxy = spawn_proxy(&proxy_bin, &args.proxy_config)?;
    println!("Waiting for proxy at {}...", proxy_addr);
    wait_for_proxy(&proxy_addr).await?;
    println!("Proxy is ready!\n");

    let results = run_tests(all_tests(), ctx, filter).await;

    proxy.kill().await.ok();
    Ok(suite_failed(results))
}

/// Launch `<bin> run --config <config>` with no provider variables in its environment
fn spawn_proxy(proxy_bin: &str, proxy_config: &str) -> anyhow::Result<Child> {
    println!("Spawning proxy: {} run --config {}", proxy_bin, proxy_config);

    let mut cmd = ProcessCommand::new(proxy_bin);
    cmd.arg("run").arg("--config").arg(proxy_config).kill_on_drop(true);
    for var in PROVIDER_ENV {
        cmd.env_remove(var);
    }

    cmd.spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", proxy_bin, e))
}

/// Find the proxy binary, trying release then debug builds
fn find_proxy_bin() -> anyhow::Result<String> {
    DEFAULT_PROXY_BINS
        .iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(|candidate| {
            println!("Using proxy binary: {}", candidate.bright_cyan());
            candidate.to_string()
        })
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No proxy binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
                DEFAULT_PROXY_BINS.join(", ")
            )
        })
}

fn suite_failed(results: Vec<types::TestResult>) -> bool {
    results.iter().any(|r| !r.passed)
}

/// Poll `/health` until the proxy answers
async fn wait_for_proxy(addr: &str) -> anyhow::Result<()> {
    let client = client::build_client();
    let health_url = format!("http://{}/health", addr);

    for attempt in 0..30 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200 + attempt * 100)).await;
        if let Ok(resp) = client.get(&health_url).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
    }

    Err(anyhow::anyhow!(
        "Proxy did not start within timeout. Is the binary correct? Check: {}",
        addr
    ))
}

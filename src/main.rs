//! ai-assist-proxy: editor AI routes in front of an OpenAI-compatible provider
//!
//! Serves `/api/ai/command` (streamed) and `/api/ai/copilot` (single shot),
//! filling in credentials from the environment when callers omit them.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log line layout
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

use ai_assist_proxy::{
    config::AppConfig,
    provider::{redact_key, Endpoint, OpenAiProvider},
    run_server,
};

#[derive(Parser)]
#[command(name = "ai-assist-proxy")]
#[command(version = "0.1.0")]
#[command(about = "Editor AI routes in front of an OpenAI-compatible provider")]
#[command(long_about = "
ai-assist-proxy serves the editor's AI endpoints:
  - POST /api/ai/command  streaming chat completion (max 2048 tokens)
  - POST /api/ai/copilot  short inline suggestion (max 50 tokens)

Callers may pass apiKey/baseURL per request; otherwise OPENAI_API_KEY,
OPENAI_BASE_URL and OPENAI_MODEL are used.

Example usage:
  ai-assist-proxy run --config config.yaml
  OPENAI_API_KEY=sk-... ai-assist-proxy run --port 3001
")]
struct Cli {
    /// Path to config file (optional; defaults apply when missing)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Log line format (text, json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Run {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override default provider base URL (e.g., "http://localhost:8080/v1")
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Validate configuration
    CheckConfig,

    /// Test connection to the default provider
    TestProvider,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    let filter = tracing_subscriber::EnvFilter::new(&level_filter);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    match cli.command {
        Commands::Run { port, base_url } => {
            run_proxy(&cli.config, port, base_url).await?;
        }
        Commands::CheckConfig => {
            check_config(&cli.config);
        }
        Commands::TestProvider => {
            test_provider(&cli.config).await?;
        }
    }

    Ok(())
}

/// Run the proxy server
async fn run_proxy(
    config_path: &Path,
    port_override: Option<u16>,
    base_url_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path);

    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = base_url_override {
        config.provider.base_url = url;
    }
    if let Err(e) = config.validate() {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }

    run_server(config).await
}

/// Validate configuration
fn check_config(config_path: &Path) {
    let config = load_config_or_exit(config_path);

    if let Err(e) = config.validate() {
        eprintln!("✗ Configuration error: {}", e);
        std::process::exit(1);
    }

    println!("✓ Configuration is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("\nProvider:");
    println!("  URL: {}", config.provider.base_url());
    println!("  Model: {}", config.provider.model);
    println!(
        "  API key: {}",
        config
            .provider
            .api_key
            .as_deref()
            .map(redact_key)
            .unwrap_or_else(|| "(none, callers must send apiKey)".to_string())
    );
    println!("  TLS: {}", if config.provider.is_tls() { "enabled" } else { "disabled" });
    if let Some(ref tls) = config.provider.tls {
        if tls.accept_invalid_certs {
            println!("  TLS: Accepting invalid certificates");
        }
        if let Some(ref ca) = tls.ca_cert_path {
            println!("  TLS CA: {}", ca);
        }
    }
    println!("  Timeout: {}s", config.provider.timeout_seconds);
    println!("\nStreaming:");
    println!("  Framing: {:?}", config.streaming.framing);
    println!("  Channel capacity: {}", config.streaming.channel_capacity);
    println!("\nStats:");
    println!("  Enabled: {}", config.stats.enabled);
    println!("  Format: {:?}", config.stats.format);
}

/// Test connection to the default provider
async fn test_provider(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_or_exit(config_path);

    let Some(api_key) = config.provider.api_key.clone() else {
        eprintln!("✗ No default API key (set OPENAI_API_KEY or provider.api_key)");
        std::process::exit(1);
    };

    let endpoint = Endpoint::new(api_key, config.provider.base_url());
    println!("Testing provider: {}/models", endpoint.base_url());
    println!("  Key: {}", redact_key(&endpoint.api_key));

    let provider = OpenAiProvider::from_config(&config.provider)?;
    match provider.list_models(&endpoint).await {
        Ok(models) => {
            println!("✓ Provider is reachable");
            println!("  Available models: {}", models.len());
            for model in models.iter().take(5) {
                println!("    - {}", model);
            }
            if !models.is_empty() && !models.contains(&config.provider.model) {
                println!("  ! Default model {} not listed", config.provider.model);
            }
        }
        Err(e) => {
            println!("✗ Provider check failed ({}): {}", e.class(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Load configuration plus environment overrides, or exit with error
fn load_config_or_exit(config_path: &Path) -> AppConfig {
    match AppConfig::load_or_default(Some(config_path)) {
        Ok(mut config) => {
            config.apply_env();
            config
        }
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("\nYou can start from config.yaml.default:");
            eprintln!("  cp config.yaml.default config.yaml");
            std::process::exit(1);
        }
    }
}

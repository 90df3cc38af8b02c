//! Sahayak server binary.
//!
//! Loads configuration, wires the embeddings and chat providers into the
//! query engine, and serves the HTTP API.

mod server;

use clap::Parser;
use sahayak_core::{
    ChatModel, Embedder, QueryEngine, create_chat_model, create_embedder, load_config,
};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Sahayak: question answering over a multilingual PDF corpus
#[derive(Parser, Debug)]
#[command(name = "sahayak", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Set up tracing: human-readable stderr + optional JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let (json_layer, _guard) = match config.logging.log_dir.as_deref() {
        Some(log_dir) => {
            let _ = std::fs::create_dir_all(log_dir);
            let file_appender = tracing_appender::rolling::daily(log_dir, "sahayak.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    for warning in config.validate() {
        warn!("{warning}");
    }

    let embedder = create_embedder(&config.embedding)?;
    let chat = create_chat_model(&config.chat)?;
    info!(
        embedding_model = embedder.model_name(),
        chat_model = chat.model_name(),
        "Model providers ready"
    );

    let engine = Arc::new(QueryEngine::new(&config, embedder, chat));
    let languages: Vec<String> = engine
        .corpus()
        .language_keys()
        .map(str::to_string)
        .collect();
    info!(
        host = %config.server.host,
        port = config.server.port,
        languages = ?languages,
        "Starting Sahayak server"
    );

    server::run(AppState { engine }, &config.server).await?;
    Ok(())
}

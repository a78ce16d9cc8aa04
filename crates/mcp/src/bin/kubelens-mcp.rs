// Standalone MCP server binary (JSON-RPC over stdio)

use anyhow::{anyhow, Result};
use clap::Parser;
use kubelens_core::KubeConnector;
use kubelens_mcp::{KubelensConfig, McpServer};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kubelens-mcp")]
#[command(about = "Read-only Kubernetes introspection over the Model Context Protocol", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kubelens.toml", env = "KUBELENS_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kubelens=info".into());

    // stdout carries the protocol, so logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    init_logging(args.json_logs);

    tracing::info!("Kubelens MCP server starting");

    let config = KubelensConfig::load(&args.config)?;
    let connector = Arc::new(KubeConnector::new(config.kubernetes.clone()));
    let server = McpServer::new(&config.server, connector);

    server.serve_stdio().await
}

//! Server binary for the payment agent
//!
//! Loads configuration, performs the sandbox credential handshake that
//! gates the action adapter, and serves the chat surface until shutdown.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use paymate_core::config::ConfigLoader;
use paymate_core::factory::AgentFactory;
use paymate_server::{build_router, shutdown_signal, AppState, ServerConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Paymate server - sandbox payment agent over HTTP")]
struct Cli {
    #[clap(long, short, default_value = "paymate.yaml", help = "Path to the YAML configuration file")]
    config: String,

    #[clap(long, default_value = "127.0.0.1:3001")]
    bind_addr: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Disable permissive CORS headers")]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    log::info!("Loading configuration from: {}", cli.config);
    let config = ConfigLoader::from_file(&cli.config).await?;
    log::info!("Configuration loaded for agent: {}", config.agent.name);

    let factory = AgentFactory::from_config(config)?;

    // The handshake gates the adapter's ability to execute. A failure here
    // is surfaced immediately rather than on the first user request.
    match factory.provider().authenticate().await {
        Ok(()) => log::info!("[SANDBOX] Payment provider handshake succeeded"),
        Err(e) => log::warn!(
            "[SANDBOX] Payment provider handshake failed: {}. Action calls will return \
             errors until credentials are fixed",
            e
        ),
    }

    let bind_addr: SocketAddr = cli
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cli.bind_addr, e))?;

    let server_config = ServerConfig::default()
        .with_bind_addr(bind_addr)
        .with_cors(!cli.no_cors);
    let router = build_router(AppState::new(factory), &server_config);

    let listener = TcpListener::bind(server_config.bind_addr).await?;
    log::info!("Paymate server listening on {}", server_config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

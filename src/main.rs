//! Querygate - a read-only SQL gateway for LLM-generated queries.

use std::net::SocketAddr;

use querygate::cli::Cli;
use querygate::config::AppConfig;
use querygate::error::Result;
use querygate::http::{serve, AppState};
use querygate::logging::init_logging;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    init_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration file
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = AppConfig::load_from_file(&config_path)?;

    // CLI arguments override the config file
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match &config.legacy {
        Some(conn) => info!("Legacy connection: {}", conn.display_string()),
        None => warn!("No legacy database connection configured"),
    }
    info!("Configured agents: {}", config.agents.len());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            querygate::error::QuerygateError::config(format!("Invalid bind address: {e}"))
        })?;

    let state = AppState::new(config);
    serve(state, addr)
        .await
        .map_err(|e| querygate::error::QuerygateError::internal(e.to_string()))?;

    Ok(())
}

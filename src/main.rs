//! memrydb - An In-Memory, Sharded Key-Value Store
//!
//! This is the main entry point for the memrydb server.
//! It loads the configuration, sets up logging and the storage engine, and
//! serves connections until Ctrl+C.

use anyhow::Context;
use memrydb::cli::Cli;
use memrydb::error::AppError;
use memrydb::{Config, Server};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG takes precedence over --verbose
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::from_sources(&cli)
        .map_err(AppError::from)
        .context("failed to load configuration")?;

    let server = Server::from_config(&config);
    info!(
        version = memrydb::VERSION,
        shards = server.storage().shard_count(),
        max_connections = config.max_number_of_connexion,
        read_timeout_secs = config.server.read_timeout_secs,
        "Storage engine initialized"
    );
    if config.max_memory_usage > 0 {
        warn!(
            max_memory_usage = config.max_memory_usage,
            "max_memory_usage is not enforced"
        );
    }

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(AppError::from)
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on {}", address);

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run(listener, shutdown).await;

    let stats = server.storage().stats();
    info!(
        keys = stats.keys,
        gets = stats.gets,
        sets = stats.sets,
        removes = stats.removes,
        "Server shutdown complete"
    );
    Ok(())
}

//! # Shelf Scout CLI
//!
//! Entry point for the `scout` binary.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load scout.toml, then environment overrides
//! 3. Open the SQLite store and run migrations
//! 4. Probe the API host for the initial connectivity reading
//! 5. Build the engine and dispatch the command

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use scout_db::{Database, DbConfig};
use scout_sync::network::probe_reachability;
use scout_sync::{HttpApi, NetworkMonitor, ScoutConfig, ScoutEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

/// Upper bound on the startup reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Config commands must work before a database exists.
    if let Command::Config(command) = &cli.command {
        return commands::config::run(command, cli.config.clone());
    }

    let config = ScoutConfig::load(cli.config.clone()).context("Failed to load scout config")?;
    let engine = build_engine(&config, cli.offline).await?;

    let result = commands::dispatch(cli.command, &engine, &config).await;
    engine.db.close().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=scout=trace` - Show trace for scout crates only
/// - Default: INFO, with scout crates at DEBUG
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scout=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_engine(config: &ScoutConfig, offline: bool) -> Result<ScoutEngine> {
    let db_path = config
        .database_path()
        .context("Could not determine app data directory")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(?db_path, "Opening scout store");

    let db = Database::new(DbConfig::new(db_path)).await?;
    let api = HttpApi::from_config(config)?;

    let online = if offline {
        false
    } else {
        probe_reachability(api.base_url(), PROBE_TIMEOUT).await
    };
    debug!(online, base_url = %api.base_url(), "Initial connectivity");

    let engine = ScoutEngine::builder()
        .with_config(config)
        .with_database(db)
        .with_api(Arc::new(api))
        .with_network(NetworkMonitor::new(online))
        .build()?;
    Ok(engine)
}

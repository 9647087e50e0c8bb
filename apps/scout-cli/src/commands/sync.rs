//! # Sync Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sync    - drain the queue and trigger server reconciliation now       │
//! │  status  - poll the server and merge in the local queue count          │
//! │  agent   - run the orchestrator loop plus a reachability probe         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::{Context, Result};
use scout_sync::network::spawn_probe;
use scout_sync::{ScoutConfig, ScoutEngine, SyncError};
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use super::print_json;

/// How often the agent sweeps expired cache entries.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub async fn force(engine: &ScoutEngine) -> Result<()> {
    match engine.orchestrator.force_sync_now().await {
        Ok(report) => print_json(&report),
        Err(SyncError::OfflineOperationRejected) => {
            anyhow::bail!("Cannot sync while offline; scans stay queued")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn status(engine: &ScoutEngine) -> Result<()> {
    let status = match engine.orchestrator.poll_status().await {
        Ok(status) => status,
        Err(e) => {
            // Offline or unreachable: report what is known locally.
            warn!(error = %e, "Server status unavailable");
            let mut status = engine.orchestrator.status().await;
            status.local_pending = engine.queue.count().await?;
            status.total_pending = status.local_pending + status.server_pending;
            status.last_error = Some(e.to_string());
            status
        }
    };
    print_json(&status)
}

/// Runs until Ctrl+C (or SIGTERM on unix).
pub async fn agent(engine: &ScoutEngine, config: &ScoutConfig) -> Result<()> {
    let probe_url = Url::parse(&config.api.base_url).context("Invalid API base URL")?;
    let probe = spawn_probe(engine.network.clone(), probe_url, config.poll_interval());

    let subscription = engine.orchestrator.subscribe(|status| {
        info!(
            online = status.is_online,
            pending = status.total_pending,
            syncing = status.syncing,
            quota_exceeded = status.quota_exceeded,
            "Sync status changed"
        );
    });

    let handle = engine.orchestrator.spawn();
    info!(device_id = %config.device_id(), "Scout agent running");

    let mut maintenance = tokio::time::interval(MAINTENANCE_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = maintenance.tick() => {
                if let Err(e) = engine.orchestrator.run_maintenance().await {
                    error!(error = %e, "Maintenance sweep failed");
                }
            }
            _ = &mut shutdown => break,
        }
    }

    probe.abort();
    subscription.unsubscribe();
    handle.shutdown().await;
    info!("Scout agent stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping agent...");
}

//! Local store maintenance.

use anyhow::Result;
use scout_sync::ScoutEngine;
use serde_json::json;
use tracing::info;

use super::print_json;

pub async fn stats(engine: &ScoutEngine) -> Result<()> {
    print_json(&engine.db.stats().await?)
}

pub async fn sweep(engine: &ScoutEngine) -> Result<()> {
    print_json(&engine.orchestrator.run_maintenance().await?)
}

pub async fn clear(engine: &ScoutEngine) -> Result<()> {
    engine.db.clear_all().await?;
    info!("Local caches cleared");
    print_json(&json!({
        "cleared": true,
        "pendingScans": engine.queue.count().await?,
    }))
}

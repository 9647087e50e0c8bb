//! Pending-scan queue commands.

use anyhow::Result;
use scout_sync::ScoutEngine;
use serde_json::json;

use super::print_json;
use crate::cli::QueueCommand;

pub async fn run(engine: &ScoutEngine, command: QueueCommand) -> Result<()> {
    match command {
        QueueCommand::List => print_json(&engine.queue.list().await?),
        QueueCommand::Count => print_json(&json!({
            "pending": engine.queue.count().await?,
            "retryCeiling": engine.queue.retry_ceiling(),
        })),
        QueueCommand::Quarantined { limit } => print_json(&engine.queue.quarantined(limit).await?),
        QueueCommand::Clear => {
            let cleared = engine.queue.clear().await?;
            print_json(&json!({ "cleared": cleared }))
        }
    }
}

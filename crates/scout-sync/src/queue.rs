//! # Scan Queue
//!
//! Durable write-behind queue for scans the server has not acknowledged.
//!
//! ## Drain Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          drain()                                        │
//! │                                                                         │
//! │  for entry in queue (enqueue order, one at a time):                    │
//! │                                                                         │
//! │     POST /scans ──► 2xx ─────────► remove            synced += 1       │
//! │          │                                                              │
//! │          ├──────► 403 ─────────► STOP (retries untouched)              │
//! │          │                         quota_exceeded = true               │
//! │          │                                                              │
//! │          └──────► other error ──► retries += 1       failed += 1       │
//! │                                      │                                  │
//! │                                      └─ retries ≥ ceiling ──►          │
//! │                                           quarantine  abandoned += 1   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `enqueue` returns only after the row is committed; storage runs with
//! `synchronous = FULL`, so a returned scan survives a crash.

use scout_core::types::{NewScan, QuarantinedScan, QueuedScan};
use scout_core::validation::validate_scan;
use scout_db::ScanQueueRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::ScoutApi;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Entries the server acknowledged.
    pub synced: u32,
    /// Failed attempts in this pass, including those that ended in quarantine.
    pub failed: u32,
    /// Entries moved to quarantine in this pass.
    pub abandoned: u32,
    /// The server refused on quota; the rest of the queue was left alone.
    pub quota_exceeded: bool,
}

/// The Scan Queue service.
///
/// Cheap to clone; clones share the same drain lock, so two drains never
/// interleave.
#[derive(Clone)]
pub struct ScanQueue {
    repo: ScanQueueRepository,
    api: Arc<dyn ScoutApi>,
    retry_ceiling: u32,
    drain_lock: Arc<Mutex<()>>,
}

impl ScanQueue {
    pub fn new(repo: ScanQueueRepository, api: Arc<dyn ScoutApi>, retry_ceiling: u32) -> Self {
        ScanQueue {
            repo,
            api,
            retry_ceiling: retry_ceiling.max(1),
            drain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn retry_ceiling(&self) -> u32 {
        self.retry_ceiling
    }

    /// Validates and persists a scan; returns once it is durable.
    pub async fn enqueue(&self, scan: &NewScan) -> SyncResult<QueuedScan> {
        let scan = validate_scan(scan)?;
        let entry = self.repo.enqueue(&scan).await?;
        info!(id = %entry.id, isbn = %entry.isbn, "Scan queued");
        Ok(entry)
    }

    /// Persists an entry built elsewhere, keeping its id.
    ///
    /// Used when a direct submission fails so the resend carries the same
    /// idempotency key as the first attempt.
    pub async fn enqueue_entry(&self, entry: &QueuedScan) -> SyncResult<()> {
        self.repo.insert(entry).await?;
        info!(id = %entry.id, isbn = %entry.isbn, "Scan queued after failed submit");
        Ok(())
    }

    /// Sends every queued scan to the server, oldest first.
    pub async fn drain(&self) -> SyncResult<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let entries = self.repo.list().await?;
        let mut report = DrainReport::default();
        if entries.is_empty() {
            return Ok(report);
        }

        debug!(count = entries.len(), "Draining scan queue");

        for entry in entries {
            match self.api.create_scan(&entry).await {
                Ok(()) => {
                    self.repo.remove(&entry.id).await?;
                    report.synced += 1;
                }
                Err(SyncError::QuotaExceeded(message)) => {
                    warn!(id = %entry.id, %message, "Scan quota exceeded, stopping drain");
                    report.quota_exceeded = true;
                    break;
                }
                Err(e) if !e.is_retryable() => {
                    // The entry is left as-is; retrying cannot fix this.
                    error!(id = %entry.id, error = %e, "Scan rejected permanently, stopping drain");
                    return Err(e);
                }
                Err(e) => {
                    report.failed += 1;
                    let message = e.to_string();
                    let retries = self.repo.record_failure(&entry.id, &message).await?;
                    warn!(id = %entry.id, retries, error = %message, "Queued scan failed to sync");

                    if retries >= self.retry_ceiling {
                        let abandoned = SyncError::RetryCeilingExceeded {
                            id: entry.id.clone(),
                            retries,
                            last_error: message.clone(),
                        };
                        error!(isbn = %entry.isbn, "{}", abandoned);
                        self.repo.quarantine(&entry.id, &message).await?;
                        report.abandoned += 1;
                    }
                }
            }
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            abandoned = report.abandoned,
            quota_exceeded = report.quota_exceeded,
            "Scan queue drained"
        );
        Ok(report)
    }

    /// Current queue length.
    pub async fn count(&self) -> SyncResult<u64> {
        Ok(self.repo.count().await?)
    }

    /// Pending entries in enqueue order.
    pub async fn list(&self) -> SyncResult<Vec<QueuedScan>> {
        Ok(self.repo.list().await?)
    }

    /// Abandoned entries, newest first.
    pub async fn quarantined(&self, limit: Option<u32>) -> SyncResult<Vec<QuarantinedScan>> {
        Ok(self.repo.list_quarantined(limit).await?)
    }

    /// Drops every pending and quarantined entry.
    pub async fn clear(&self) -> SyncResult<u64> {
        let _guard = self.drain_lock.lock().await;
        let pending = self.repo.clear().await?;
        let quarantined = self.repo.clear_quarantine().await?;
        info!(pending, quarantined, "Scan queue cleared");
        Ok(pending)
    }
}

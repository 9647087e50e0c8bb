//! # Sync Orchestrator
//!
//! Watches connectivity and drives queue draining plus server reconciliation.
//!
//! ## Orchestrator Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SyncOrchestrator::spawn()                          │
//! │                                                                         │
//! │   ┌────────────────┐   ┌────────────────┐   ┌─────────────────────┐    │
//! │   │ poll timer     │   │ network watch  │   │ shutdown channel    │    │
//! │   │ (10s default)  │   │ (online flips) │   │                     │    │
//! │   └───────┬────────┘   └───────┬────────┘   └──────────┬──────────┘    │
//! │           ▼                    ▼                       ▼               │
//! │   GET /sync/status      went online?             stop the loop         │
//! │   merge local count      └─► trigger_sync()                            │
//! │   pending > 0?           went offline?                                 │
//! │    └─► trigger_sync()    └─► notify only                               │
//! │                                                                         │
//! │   trigger_sync = drain local queue, then POST /sync/trigger            │
//! │   one cycle at a time (in-flight flag); a busy tick is skipped         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//! - Background cycles log and swallow every error; the next tick retries.
//! - Failed status polls back off exponentially with jitter until one
//!   succeeds.
//! - `force_sync_now` surfaces everything to the caller.
//!
//! ## Listeners
//! Listeners receive a [`SyncStatus`] snapshot on every change. Each call is
//! isolated: a panicking listener is logged and the others still run.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use scout_core::CachePolicy;
use scout_db::Database;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ScoutConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::NetworkMonitor;
use crate::queue::{DrainReport, ScanQueue};
use crate::transport::ScoutApi;

// =============================================================================
// Sync Status
// =============================================================================

/// Snapshot handed to listeners and returned by [`SyncOrchestrator::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    /// Scans waiting in the local queue.
    pub local_pending: u64,
    /// Deferred work the server reported at the last poll.
    pub server_pending: u64,
    /// `local_pending + server_pending`; what the UI shows.
    pub total_pending: u64,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// A sync cycle is running.
    pub syncing: bool,
    /// The last drain stopped on the scan quota.
    pub quota_exceeded: bool,
}

impl SyncStatus {
    fn recompute_total(&mut self) {
        self.total_pending = self.local_pending + self.server_pending;
    }
}

/// Result of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub drain: DrainReport,
    /// Server-side items reconciled by `POST /sync/trigger`.
    pub server_reconciled: u64,
}

/// Counts removed by a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub prices_removed: u64,
    pub images_removed: u64,
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    pub force_sync_timeout: Duration,
    pub status_backoff_initial: Duration,
    pub status_backoff_max: Duration,
    /// Retentions used by [`SyncOrchestrator::run_maintenance`].
    pub cache: CachePolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        OrchestratorSettings {
            poll_interval: Duration::from_secs(10),
            force_sync_timeout: Duration::from_secs(30),
            status_backoff_initial: Duration::from_millis(1000),
            status_backoff_max: Duration::from_secs(120),
            cache: CachePolicy::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &ScoutConfig) -> Self {
        OrchestratorSettings {
            poll_interval: config.poll_interval(),
            force_sync_timeout: Duration::from_secs(config.sync.force_sync_timeout_secs),
            status_backoff_initial: Duration::from_millis(config.sync.status_backoff_initial_ms),
            status_backoff_max: Duration::from_secs(config.sync.status_backoff_max_secs),
            cache: config.cache_policy(),
        }
    }
}

/// Delay until the next status poll.
///
/// Every poll waits `poll_interval`. Consecutive failures add a jittered
/// exponential backoff on top, which a successful poll clears.
struct PollSchedule {
    interval: Duration,
    ceiling: Duration,
    backoff: ExponentialBackoff,
}

impl PollSchedule {
    fn new(settings: &OrchestratorSettings) -> Self {
        PollSchedule {
            interval: settings.poll_interval,
            ceiling: settings.status_backoff_max,
            backoff: ExponentialBackoff {
                initial_interval: settings.status_backoff_initial,
                max_interval: settings.status_backoff_max,
                multiplier: 2.0,
                max_elapsed_time: None,
                ..Default::default()
            },
        }
    }

    /// Delay while offline; the failure streak is kept.
    fn idle(&self) -> Duration {
        self.interval
    }

    fn after_success(&mut self) -> Duration {
        self.backoff.reset();
        self.interval
    }

    fn after_failure(&mut self) -> Duration {
        let extra = self.backoff.next_backoff().unwrap_or(self.ceiling);
        self.interval + extra
    }
}

// =============================================================================
// Listeners
// =============================================================================

/// Status-change callback.
pub type StatusListener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Returned by [`SyncOrchestrator::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Removes the listener. Returns false if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut listeners = inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}

/// Clears the in-flight flag when a cycle ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

struct Inner {
    db: Database,
    queue: ScanQueue,
    api: Arc<dyn ScoutApi>,
    network: NetworkMonitor,
    settings: OrchestratorSettings,
    status: RwLock<SyncStatus>,
    listeners: Mutex<Vec<(u64, StatusListener)>>,
    next_listener_id: AtomicU64,
    in_flight: AtomicBool,
    /// Last connectivity value acted upon; repeats are ignored.
    last_seen_online: AtomicBool,
}

/// Long-lived sync service. Clones share state.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(
        db: Database,
        queue: ScanQueue,
        api: Arc<dyn ScoutApi>,
        network: NetworkMonitor,
        settings: OrchestratorSettings,
    ) -> Self {
        let online = network.is_online();
        let status = SyncStatus {
            is_online: online,
            ..Default::default()
        };

        SyncOrchestrator {
            inner: Arc::new(Inner {
                db,
                queue,
                api,
                network,
                settings,
                status: RwLock::new(status),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                in_flight: AtomicBool::new(false),
                last_seen_online: AtomicBool::new(online),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.network.is_online()
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.inner.network
    }

    pub fn queue(&self) -> &ScanQueue {
        &self.inner.queue
    }

    /// Current status snapshot.
    pub async fn status(&self) -> SyncStatus {
        self.inner.status.read().await.clone()
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Registers a listener for status changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: StatusListener = Arc::new(listener);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn notify(&self, status: &SyncStatus) {
        // Snapshot so a listener may subscribe or unsubscribe without deadlocking.
        let listeners: Vec<(u64, StatusListener)> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                error!(listener_id = id, "Status listener panicked");
            }
        }
    }

    /// Applies a change to the status, then notifies listeners.
    async fn update_status<F>(&self, change: F) -> SyncStatus
    where
        F: FnOnce(&mut SyncStatus),
    {
        let snapshot = {
            let mut status = self.inner.status.write().await;
            change(&mut status);
            status.recompute_total();
            status.clone()
        };
        self.notify(&snapshot);
        snapshot
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Feeds a connectivity reading (platform "became online/offline" event).
    pub async fn set_online(&self, online: bool) {
        self.inner.network.set_online(online);
        self.handle_connectivity(online).await;
    }

    async fn handle_connectivity(&self, online: bool) {
        let previous = self.inner.last_seen_online.swap(online, Ordering::AcqRel);
        if previous == online {
            return;
        }

        info!(online, "Sync orchestrator connectivity transition");
        self.update_status(|s| s.is_online = online).await;

        if online {
            self.trigger_sync().await;
        }
    }

    // =========================================================================
    // Sync Cycles
    // =========================================================================

    /// Background sync: drain, then server trigger.
    ///
    /// Returns `None` when offline, when another cycle is running, or when the
    /// cycle failed (the error is logged and kept in `last_error`).
    pub async fn trigger_sync(&self) -> Option<SyncReport> {
        if !self.is_online() {
            debug!("Offline, sync not triggered");
            return None;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            debug!("Sync already in flight, skipping");
            return None;
        };

        self.update_status(|s| s.syncing = true).await;
        let result = self.run_cycle().await;
        self.finish_cycle(&result).await;

        match result {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Sync cycle failed");
                None
            }
        }
    }

    /// Explicit user sync. Fails fast offline; bounded by the force-sync timeout.
    pub async fn force_sync_now(&self) -> SyncResult<SyncReport> {
        if !self.is_online() {
            return Err(SyncError::OfflineOperationRejected);
        }
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            return Err(SyncError::SyncInProgress);
        };

        info!("Forced sync requested");
        self.update_status(|s| s.syncing = true).await;

        let limit = self.inner.settings.force_sync_timeout;
        let result = match tokio::time::timeout(limit, self.run_cycle()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::SyncTimeout(limit.as_secs())),
        };
        self.finish_cycle(&result).await;
        result
    }

    async fn run_cycle(&self) -> SyncResult<SyncReport> {
        // Local durability first, then remote reconciliation.
        let drain = self.inner.queue.drain().await?;
        let server_reconciled = self.inner.api.trigger_sync().await?;
        Ok(SyncReport {
            drain,
            server_reconciled,
        })
    }

    async fn finish_cycle(&self, result: &SyncResult<SyncReport>) {
        let local_pending = match self.inner.queue.count().await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Could not count queued scans");
                None
            }
        };

        self.update_status(|s| {
            s.syncing = false;
            if let Some(n) = local_pending {
                s.local_pending = n;
            }
            match result {
                Ok(report) => {
                    s.last_sync = Some(Utc::now());
                    s.last_error = None;
                    s.quota_exceeded = report.drain.quota_exceeded;
                }
                Err(e) => s.last_error = Some(e.to_string()),
            }
        })
        .await;

        if let Ok(report) = result {
            info!(
                synced = report.drain.synced,
                failed = report.drain.failed,
                server_reconciled = report.server_reconciled,
                "Sync cycle complete"
            );
        }
    }

    // =========================================================================
    // Status Polling
    // =========================================================================

    /// Polls `GET /sync/status` and merges in the local queue count.
    pub async fn poll_status(&self) -> SyncResult<SyncStatus> {
        if !self.is_online() {
            return Err(SyncError::OfflineOperationRejected);
        }

        let server = self.inner.api.sync_status().await?;
        let local = self.inner.queue.count().await?;
        debug!(server_pending = server.pending_sync, local_pending = local, "Polled sync status");

        Ok(self
            .update_status(|s| {
                s.server_pending = server.pending_sync;
                s.local_pending = local;
                if server.last_sync.is_some() {
                    s.last_sync = server.last_sync;
                }
            })
            .await)
    }

    /// One periodic tick: poll, then sync if anything is outstanding.
    pub async fn tick(&self) -> SyncResult<()> {
        let status = self.poll_status().await?;
        if status.total_pending > 0 {
            self.trigger_sync().await;
        }
        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Runs both cache sweeps with the configured retentions.
    pub async fn run_maintenance(&self) -> SyncResult<SweepReport> {
        let cache = &self.inner.settings.cache;
        let prices_removed = self
            .inner
            .db
            .prices()
            .sweep_expired(cache.price_retention())
            .await?;
        let images_removed = self
            .inner
            .db
            .images()
            .sweep_expired(cache.image_retention())
            .await?;

        info!(prices_removed, images_removed, "Maintenance sweep complete");
        Ok(SweepReport {
            prices_removed,
            images_removed,
        })
    }

    // =========================================================================
    // Background Task
    // =========================================================================

    /// Starts the poll/connectivity loop on the current runtime.
    pub fn spawn(&self) -> OrchestratorHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.clone().run(shutdown_rx));
        OrchestratorHandle {
            shutdown_tx,
            task,
            orchestrator: self.clone(),
        }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        let poll_interval = self.inner.settings.poll_interval;
        info!(?poll_interval, "Sync orchestrator starting");

        let mut network_rx = self.inner.network.subscribe();
        let mut schedule = PollSchedule::new(&self.inner.settings);
        let mut next_poll = Instant::now();

        // Readings pushed before the loop subscribed.
        let online = *network_rx.borrow_and_update();
        self.handle_connectivity(online).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_poll) => {
                    if !self.is_online() {
                        next_poll = Instant::now() + schedule.idle();
                        continue;
                    }
                    match self.tick().await {
                        Ok(()) => {
                            next_poll = Instant::now() + schedule.after_success();
                        }
                        Err(e) => {
                            let delay = schedule.after_failure();
                            warn!(error = %e, ?delay, "Status poll failed, backing off");
                            self.update_status(|s| s.last_error = Some(e.to_string())).await;
                            next_poll = Instant::now() + delay;
                        }
                    }
                }
                changed = network_rx.changed() => {
                    if changed.is_err() {
                        warn!("Connectivity signal closed");
                        break;
                    }
                    let online = *network_rx.borrow_and_update();
                    self.handle_connectivity(online).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Sync orchestrator received shutdown");
                    break;
                }
            }
        }

        info!("Sync orchestrator stopped");
    }
}

// =============================================================================
// Orchestrator Handle
// =============================================================================

/// Controls a spawned orchestrator loop.
pub struct OrchestratorHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
    orchestrator: SyncOrchestrator,
}

impl OrchestratorHandle {
    pub async fn status(&self) -> SyncStatus {
        self.orchestrator.status().await
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Signals the loop to stop and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = %e, "Sync orchestrator task ended abnormally");
        }
    }
}

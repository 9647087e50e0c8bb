//! Shared fixtures for scout-sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use scout_core::money::Money;
use scout_core::types::{BookMetadata, Confidence, NewScan, QueuedScan};
use scout_db::{Database, DbConfig};
use scout_sync::transport::{LookupResult, PriceLookupRequest, ScoutApi, ServerSyncStatus};
use scout_sync::{NetworkMonitor, ScoutEngine, SyncError, SyncResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake answers `POST /scans`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Accept,
    Fail,
    Quota,
    /// Fails with an error no retry can fix.
    Reject,
}

/// In-process backend that records calls and replays scripted answers.
pub struct FakeApi {
    scan_mode: Mutex<ScanMode>,
    /// One-shot answers consumed before falling back to `scan_mode`.
    scripted_scans: Mutex<VecDeque<ScanMode>>,
    /// Delay before answering `POST /scans`.
    scan_delay: Mutex<Option<Duration>>,
    pub received_scans: Mutex<Vec<QueuedScan>>,
    cache_results: Mutex<HashMap<String, LookupResult>>,
    live_results: Mutex<HashMap<String, LookupResult>>,
    fail_lookups: Mutex<bool>,
    status: Mutex<Option<ServerSyncStatus>>,
    trigger_count: Mutex<u64>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    pub cache_lookup_calls: AtomicUsize,
    pub live_lookup_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub trigger_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        FakeApi {
            scan_mode: Mutex::new(ScanMode::Accept),
            scripted_scans: Mutex::new(VecDeque::new()),
            scan_delay: Mutex::new(None),
            received_scans: Mutex::new(Vec::new()),
            cache_results: Mutex::new(HashMap::new()),
            live_results: Mutex::new(HashMap::new()),
            fail_lookups: Mutex::new(false),
            status: Mutex::new(Some(ServerSyncStatus::default())),
            trigger_count: Mutex::new(0),
            images: Mutex::new(HashMap::new()),
            cache_lookup_calls: AtomicUsize::new(0),
            live_lookup_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            trigger_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_scan_mode(&self, mode: ScanMode) {
        *self.scan_mode.lock().unwrap() = mode;
    }

    pub fn script_scans(&self, modes: &[ScanMode]) {
        self.scripted_scans.lock().unwrap().extend(modes.iter().copied());
    }

    pub fn set_scan_delay(&self, delay: Duration) {
        *self.scan_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_cache_result(&self, isbn: &str, result: LookupResult) {
        self.cache_results.lock().unwrap().insert(isbn.to_string(), result);
    }

    pub fn set_live_result(&self, isbn: &str, result: LookupResult) {
        self.live_results.lock().unwrap().insert(isbn.to_string(), result);
    }

    pub fn fail_lookups(&self, fail: bool) {
        *self.fail_lookups.lock().unwrap() = fail;
    }

    /// `None` makes `GET /sync/status` fail.
    pub fn set_status(&self, status: Option<ServerSyncStatus>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_trigger_count(&self, count: u64) {
        *self.trigger_count.lock().unwrap() = count;
    }

    pub fn set_image(&self, url: &str, bytes: &[u8]) {
        self.images.lock().unwrap().insert(url.to_string(), bytes.to_vec());
    }

    pub fn received_isbns(&self) -> Vec<String> {
        self.received_scans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.isbn.clone())
            .collect()
    }

    pub fn network_calls(&self) -> usize {
        self.cache_lookup_calls.load(Ordering::SeqCst)
            + self.live_lookup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoutApi for FakeApi {
    async fn create_scan(&self, scan: &QueuedScan) -> SyncResult<()> {
        let delay = *self.scan_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mode = self
            .scripted_scans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.scan_mode.lock().unwrap());
        match mode {
            ScanMode::Accept => {
                self.received_scans.lock().unwrap().push(scan.clone());
                Ok(())
            }
            ScanMode::Fail => Err(SyncError::transport(Some(503), "service unavailable")),
            ScanMode::Quota => Err(SyncError::QuotaExceeded("monthly scan limit reached".into())),
            ScanMode::Reject => Err(SyncError::InvalidUrl("relative URL without a base".into())),
        }
    }

    async fn cache_lookup(&self, request: &PriceLookupRequest) -> SyncResult<LookupResult> {
        self.cache_lookup_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_lookups.lock().unwrap() {
            return Err(SyncError::transport(None, "connection reset"));
        }
        self.cache_results
            .lock()
            .unwrap()
            .get(&request.isbn)
            .cloned()
            .ok_or_else(|| SyncError::transport(Some(404), "not cached"))
    }

    async fn live_lookup(&self, isbn: &str) -> SyncResult<LookupResult> {
        self.live_lookup_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_lookups.lock().unwrap() {
            return Err(SyncError::transport(None, "timed out"));
        }
        self.live_results
            .lock()
            .unwrap()
            .get(isbn)
            .cloned()
            .ok_or_else(|| SyncError::transport(Some(404), "unknown isbn"))
    }

    async fn sync_status(&self) -> SyncResult<ServerSyncStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let status = *self.status.lock().unwrap();
        status.ok_or_else(|| SyncError::transport(Some(500), "status unavailable"))
    }

    async fn trigger_sync(&self) -> SyncResult<u64> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.trigger_count.lock().unwrap())
    }

    async fn fetch_image(&self, url: &str) -> SyncResult<Vec<u8>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.images
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| SyncError::transport(Some(404), "no such image"))
    }
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Engine over an in-memory database and the given fake.
pub async fn engine(api: Arc<FakeApi>, online: bool) -> ScoutEngine {
    engine_with_db(memory_db().await, api, online)
}

pub fn engine_with_db(db: Database, api: Arc<FakeApi>, online: bool) -> ScoutEngine {
    ScoutEngine::builder()
        .with_database(db)
        .with_api(api)
        .with_network(NetworkMonitor::new(online))
        .build()
        .unwrap()
}

pub fn scan(isbn: &str, title: &str, author: &str) -> NewScan {
    NewScan {
        isbn: isbn.to_string(),
        title: title.to_string(),
        author: author.to_string(),
    }
}

pub fn priced(ebay_cents: i64, amazon_cents: Option<i64>) -> LookupResult {
    LookupResult {
        ebay_price: Some(Money::from_cents(ebay_cents)),
        amazon_price: amazon_cents.map(Money::from_cents),
        metadata: BookMetadata::default(),
        confidence: None,
        demo: false,
    }
}

pub fn graded(ebay_cents: i64, confidence: Confidence) -> LookupResult {
    LookupResult {
        confidence: Some(confidence),
        ..priced(ebay_cents, None)
    }
}

//! Sync orchestrator: transitions, listeners, forced sync and the loop.

mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{engine, memory_db, scan, FakeApi, ScanMode};
use scout_core::money::Money;
use scout_core::types::{PriceCacheEntry, PriceSource};
use scout_sync::transport::ServerSyncStatus;
use scout_sync::{
    NetworkMonitor, OrchestratorSettings, ScoutEngine, SyncError, SyncStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder(engine: &ScoutEngine) -> Arc<Mutex<Vec<SyncStatus>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    // Kept registered for the engine's lifetime.
    let _subscription = engine
        .orchestrator
        .subscribe(move |status| sink.lock().unwrap().push(status.clone()));
    seen
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn queue_two(engine: &ScoutEngine) {
    engine
        .queue
        .enqueue(&scan("9780140449136", "The Odyssey", "Homer"))
        .await
        .unwrap();
    engine
        .queue
        .enqueue(&scan("9780261103573", "The Hobbit", "J.R.R. Tolkien"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_going_online_drains_and_notifies() {
    let api = FakeApi::new();
    api.set_trigger_count(2);
    let engine = engine(api.clone(), false).await;
    let seen = recorder(&engine);
    queue_two(&engine).await;

    engine.orchestrator.set_online(true).await;

    assert_eq!(engine.queue.count().await.unwrap(), 0);
    assert_eq!(api.received_isbns().len(), 2);
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);

    let seen = seen.lock().unwrap();
    assert!(seen.first().unwrap().is_online);
    let last = seen.last().unwrap();
    assert!(last.is_online);
    assert!(!last.syncing);
    assert_eq!(last.local_pending, 0);
    assert!(last.last_sync.is_some());
    assert!(last.last_error.is_none());
}

#[tokio::test]
async fn test_going_offline_notifies_without_network() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), true).await;
    let seen = recorder(&engine);

    engine.orchestrator.set_online(false).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].is_online);
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repeated_reading_is_not_a_transition() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), false).await;
    let seen = recorder(&engine);

    engine.orchestrator.set_online(false).await;
    assert!(seen.lock().unwrap().is_empty());

    engine.orchestrator.set_online(true).await;
    let after_first = seen.lock().unwrap().len();
    engine.orchestrator.set_online(true).await;
    assert_eq!(seen.lock().unwrap().len(), after_first);
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_listener_is_isolated() {
    let api = FakeApi::new();
    let engine = engine(api, false).await;

    let _bad = engine
        .orchestrator
        .subscribe(|_| panic!("listener bug"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let _good = engine.orchestrator.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    engine.orchestrator.set_online(true).await;
    assert!(calls.load(Ordering::SeqCst) > 0);

    // The orchestrator keeps working afterwards.
    let report = engine.orchestrator.force_sync_now().await.unwrap();
    assert_eq!(report.drain.synced, 0);
}

#[tokio::test]
async fn test_unsubscribe_stops_notifications() {
    let api = FakeApi::new();
    let engine = engine(api, false).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let subscription = engine.orchestrator.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(engine.orchestrator.listener_count(), 1);

    assert!(subscription.unsubscribe());
    assert!(!subscription.unsubscribe());
    assert_eq!(engine.orchestrator.listener_count(), 0);

    engine.orchestrator.set_online(true).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_force_sync_offline_is_rejected() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), false).await;
    queue_two(&engine).await;

    let err = engine.orchestrator.force_sync_now().await.unwrap_err();
    assert!(matches!(err, SyncError::OfflineOperationRejected));
    assert!(api.received_isbns().is_empty());
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.queue.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_force_sync_reports_both_sides() {
    let api = FakeApi::new();
    api.set_trigger_count(4);
    let engine = engine(api.clone(), true).await;
    queue_two(&engine).await;

    let report = engine.orchestrator.force_sync_now().await.unwrap();
    assert_eq!(report.drain.synced, 2);
    assert_eq!(report.server_reconciled, 4);

    let status = engine.orchestrator.status().await;
    assert_eq!(status.local_pending, 0);
    assert!(!status.syncing);
}

#[tokio::test]
async fn test_force_sync_reports_quota() {
    let api = FakeApi::new();
    api.set_scan_mode(ScanMode::Quota);
    let engine = engine(api, true).await;
    queue_two(&engine).await;

    let report = engine.orchestrator.force_sync_now().await.unwrap();
    assert!(report.drain.quota_exceeded);
    assert!(engine.orchestrator.status().await.quota_exceeded);
    assert_eq!(engine.queue.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sync_in_flight_is_not_doubled() {
    let api = FakeApi::new();
    api.set_scan_delay(Duration::from_millis(300));
    let engine = engine(api.clone(), true).await;
    engine
        .queue
        .enqueue(&scan("9780140449136", "The Odyssey", "Homer"))
        .await
        .unwrap();

    let background = engine.orchestrator.clone();
    let running = tokio::spawn(async move { background.trigger_sync().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = engine.orchestrator.force_sync_now().await.unwrap_err();
    assert!(matches!(err, SyncError::SyncInProgress));
    assert!(engine.orchestrator.trigger_sync().await.is_none());

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.drain.synced, 1);
    assert_eq!(api.received_isbns().len(), 1);
}

#[tokio::test]
async fn test_force_sync_times_out() {
    let api = FakeApi::new();
    api.set_scan_delay(Duration::from_secs(5));
    let engine = ScoutEngine::builder()
        .with_database(memory_db().await)
        .with_api(api)
        .with_network(NetworkMonitor::new(true))
        .with_settings(OrchestratorSettings {
            force_sync_timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .build()
        .unwrap();
    engine
        .queue
        .enqueue(&scan("9780140449136", "The Odyssey", "Homer"))
        .await
        .unwrap();

    let err = engine.orchestrator.force_sync_now().await.unwrap_err();
    assert!(matches!(err, SyncError::SyncTimeout(_)));

    let status = engine.orchestrator.status().await;
    assert!(!status.syncing);
    assert!(status.last_error.is_some());
    assert_eq!(engine.queue.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_poll_merges_server_and_local_counts() {
    let api = FakeApi::new();
    let last_sync = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    api.set_status(Some(ServerSyncStatus {
        pending_sync: 3,
        last_sync: Some(last_sync),
    }));
    let engine = engine(api, false).await;
    queue_two(&engine).await;
    let seen = recorder(&engine);

    // Flip the raw signal only, so no sync cycle runs first.
    engine.network.set_online(true);
    let status = engine.orchestrator.poll_status().await.unwrap();

    assert_eq!(status.server_pending, 3);
    assert_eq!(status.local_pending, 2);
    assert_eq!(status.total_pending, 5);
    assert_eq!(status.last_sync, Some(last_sync));
    assert_eq!(seen.lock().unwrap().last().unwrap().total_pending, 5);
}

#[tokio::test]
async fn test_poll_offline_is_rejected() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), false).await;
    let err = engine.orchestrator.poll_status().await.unwrap_err();
    assert!(matches!(err, SyncError::OfflineOperationRejected));
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tick_syncs_when_work_is_pending() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), false).await;
    queue_two(&engine).await;
    engine.network.set_online(true);

    engine.orchestrator.tick().await.unwrap();
    assert_eq!(engine.queue.count().await.unwrap(), 0);
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);

    // Nothing pending: poll only.
    engine.orchestrator.tick().await.unwrap();
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_poll_surfaces_from_tick() {
    let api = FakeApi::new();
    api.set_status(None);
    let engine = engine(api.clone(), true).await;

    let err = engine.orchestrator.tick().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_background_failure_is_swallowed() {
    let api = FakeApi::new();
    api.set_scan_mode(ScanMode::Fail);
    let engine = engine(api, false).await;
    queue_two(&engine).await;

    engine.orchestrator.set_online(true).await;

    let status = engine.orchestrator.status().await;
    assert_eq!(status.local_pending, 2);
    assert!(engine.queue.list().await.unwrap().iter().all(|e| e.retries == 1));
}

#[tokio::test]
async fn test_maintenance_sweeps_old_prices() {
    let api = FakeApi::new();
    let engine = engine(api, true).await;
    let prices = engine.db.prices();

    for (isbn, age_days) in [("9780140449136", 8), ("9780261103573", 1)] {
        prices
            .put(&PriceCacheEntry {
                isbn: isbn.to_string(),
                ebay_price: Some(Money::from_cents(1000)),
                amazon_price: None,
                title: None,
                author: None,
                publisher: None,
                source: PriceSource::Api,
                cached_at: Utc::now() - ChronoDuration::days(age_days),
            })
            .await
            .unwrap();
    }
    engine
        .db
        .images()
        .put("https://covers.example.com/new.jpg", b"jpeg")
        .await
        .unwrap();

    let report = engine.orchestrator.run_maintenance().await.unwrap();
    assert_eq!(report.prices_removed, 1);
    assert_eq!(report.images_removed, 0);
    assert_eq!(prices.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_spawned_loop_follows_connectivity() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), false).await;
    let handle = engine.orchestrator.spawn();
    queue_two(&engine).await;

    engine.network.set_online(true);
    let probe = api.clone();
    wait_for(move || probe.received_isbns().len() == 2).await;

    assert_eq!(engine.queue.count().await.unwrap(), 0);
    assert!(handle.status().await.is_online);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_spawned_loop_polls_immediately() {
    let api = FakeApi::new();
    let engine = engine(api.clone(), true).await;
    engine
        .queue
        .enqueue(&scan("9780140449136", "The Odyssey", "Homer"))
        .await
        .unwrap();

    let handle = engine.orchestrator.spawn();
    let probe = api.clone();
    wait_for(move || probe.received_isbns().len() == 1).await;

    assert!(api.status_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(engine.queue.count().await.unwrap(), 0);
    handle.shutdown().await;
}

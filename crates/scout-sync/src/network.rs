//! # Connectivity
//!
//! The device's online/offline signal.
//!
//! The platform (or the CLI's probe task) pushes transitions into a
//! [`NetworkMonitor`]; the orchestrator and resolver read it. Repeated pushes
//! of the same value are not transitions.
//!
//! ```text
//!   platform signal ──┐
//!                     ├──► NetworkMonitor (watch<bool>) ──► orchestrator loop
//!   probe task ───────┘                                 └─► resolver tiers 2/3
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// Shared online flag with change notification.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    /// Creates a monitor seeded with the platform's current reading.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        NetworkMonitor { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records a reading. Returns true if it was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "Connectivity changed");
        }
        changed
    }

    /// Receiver that wakes on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Checks whether the API host accepts a TCP connection within `timeout`.
pub async fn probe_reachability(url: &Url, timeout: Duration) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let Some(port) = url.port_or_known_default() else {
        return false;
    };

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Reachability probe failed");
            false
        }
        Err(_) => {
            debug!(host, port, "Reachability probe timed out");
            false
        }
    }
}

/// Spawns a task that probes `url` every `interval` and feeds the monitor.
///
/// Abort the returned handle to stop probing.
pub fn spawn_probe(monitor: NetworkMonitor, url: Url, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let online = probe_reachability(&url, interval).await;
            monitor.set_online(online);
        }
    })
}

//! # Engine Wiring
//!
//! Builds every service once, from one database and one transport, so the
//! binary and the tests assemble the same graph.
//!
//! ```text
//!   Database ─┬─► ScanQueue ───────────┬─► SyncOrchestrator
//!             ├─► PricingResolver ─────┤
//!             ├─► ThumbnailCache       └─► ScanRecorder
//!             └─► (stats, clear_all)
//!   ScoutApi ──► shared by all of the above
//!   NetworkMonitor ──► shared by all of the above
//! ```

use scout_core::{CachePolicy, PricingPolicy};
use scout_db::Database;
use std::sync::Arc;

use crate::config::ScoutConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::NetworkMonitor;
use crate::orchestrator::{OrchestratorSettings, SyncOrchestrator};
use crate::pricing::PricingResolver;
use crate::queue::ScanQueue;
use crate::scanner::ScanRecorder;
use crate::thumbnails::ThumbnailCache;
use crate::transport::ScoutApi;

/// All long-lived services, constructed once at startup.
#[derive(Clone)]
pub struct ScoutEngine {
    pub db: Database,
    pub network: NetworkMonitor,
    pub queue: ScanQueue,
    pub resolver: PricingResolver,
    pub recorder: ScanRecorder,
    pub thumbnails: ThumbnailCache,
    pub orchestrator: SyncOrchestrator,
}

impl ScoutEngine {
    /// Starts a builder.
    pub fn builder() -> ScoutEngineBuilder {
        ScoutEngineBuilder::default()
    }
}

/// Builder for [`ScoutEngine`].
#[derive(Default)]
pub struct ScoutEngineBuilder {
    db: Option<Database>,
    api: Option<Arc<dyn ScoutApi>>,
    network: Option<NetworkMonitor>,
    cache: CachePolicy,
    pricing: PricingPolicy,
    settings: Option<OrchestratorSettings>,
}

impl ScoutEngineBuilder {
    /// Takes policies and timings from a loaded config.
    pub fn with_config(mut self, config: &ScoutConfig) -> Self {
        self.cache = config.cache_policy();
        self.pricing = config.pricing_policy();
        self.settings = Some(OrchestratorSettings::from_config(config));
        self
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_api(mut self, api: Arc<dyn ScoutApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_network(mut self, network: NetworkMonitor) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_pricing_policy(mut self, pricing: PricingPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> SyncResult<ScoutEngine> {
        let db = self
            .db
            .ok_or_else(|| SyncError::InvalidConfig("Database required".into()))?;
        let api = self
            .api
            .ok_or_else(|| SyncError::InvalidConfig("API transport required".into()))?;
        let network = self.network.unwrap_or_else(|| NetworkMonitor::new(false));

        let mut settings = self.settings.unwrap_or_default();
        settings.cache = self.cache;

        let queue = ScanQueue::new(db.scan_queue(), api.clone(), self.cache.retry_ceiling);
        let resolver = PricingResolver::new(
            db.prices(),
            api.clone(),
            network.clone(),
            self.cache,
            self.pricing,
        );
        let recorder = ScanRecorder::new(
            db.books(),
            resolver.clone(),
            queue.clone(),
            api.clone(),
            network.clone(),
        );
        let thumbnails = ThumbnailCache::new(db.images(), api.clone(), network.clone());
        let orchestrator =
            SyncOrchestrator::new(db.clone(), queue.clone(), api, network.clone(), settings);

        Ok(ScoutEngine {
            db,
            network,
            queue,
            resolver,
            recorder,
            thumbnails,
            orchestrator,
        })
    }
}

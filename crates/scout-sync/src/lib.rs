//! # scout-sync: Sync Engine for Shelf Scout
//!
//! Offline-first scan recording, tiered pricing and background
//! reconciliation with the scouting backend.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                       ScanRecorder                               │  │
//! │  │  validate → resolve price → upsert record → submit or queue     │  │
//! │  └──────────────┬───────────────────────────────┬───────────────────┘  │
//! │                 ▼                               ▼                       │
//! │  ┌────────────────────────────┐  ┌──────────────────────────────────┐  │
//! │  │     PricingResolver        │  │          ScanQueue               │  │
//! │  │                            │  │                                  │  │
//! │  │ local cache → server cache │  │ durable FIFO, sequential drain,  │  │
//! │  │ → live query → estimate    │  │ retry ceiling → quarantine      │  │
//! │  └────────────────────────────┘  └────────────────┬─────────────────┘  │
//! │                                                   ▲                     │
//! │  ┌────────────────────────────────────────────────┴─────────────────┐  │
//! │  │                     SyncOrchestrator                             │  │
//! │  │  connectivity transitions · periodic status poll · listeners    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Everything network-bound goes through the ScoutApi trait (HttpApi).   │
//! │  Everything durable goes through scout-db.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`engine`] - Wiring for all services
//! - [`error`] - Sync error types
//! - [`network`] - Connectivity monitor and reachability probe
//! - [`orchestrator`] - Connectivity-driven sync loop and listeners
//! - [`pricing`] - Four-tier pricing resolver
//! - [`queue`] - Scan queue service
//! - [`scanner`] - Scan recording flow
//! - [`thumbnails`] - Thumbnail cache
//! - [`transport`] - `ScoutApi` port and HTTP implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scout_sync::{HttpApi, NetworkMonitor, ScoutConfig, ScoutEngine};
//! use scout_db::{Database, DbConfig};
//!
//! let config = ScoutConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new("scout.db")).await?;
//! let engine = ScoutEngine::builder()
//!     .with_config(&config)
//!     .with_database(db)
//!     .with_api(Arc::new(HttpApi::from_config(&config)?))
//!     .with_network(NetworkMonitor::new(true))
//!     .build()?;
//!
//! let outcome = engine.recorder.record(&scan).await?;
//! let handle = engine.orchestrator.spawn();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod pricing;
pub mod queue;
pub mod scanner;
pub mod thumbnails;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ScoutConfig;
pub use engine::{ScoutEngine, ScoutEngineBuilder};
pub use error::{SyncError, SyncResult};
pub use network::NetworkMonitor;
pub use orchestrator::{
    OrchestratorHandle, OrchestratorSettings, Subscription, SweepReport, SyncOrchestrator,
    SyncReport, SyncStatus,
};
pub use pricing::{PricingResolver, Tier, TIER_ORDER};
pub use queue::{DrainReport, ScanQueue};
pub use scanner::{ScanOutcome, ScanRecorder};
pub use thumbnails::ThumbnailCache;
pub use transport::{HttpApi, LookupResult, PriceLookupRequest, ScoutApi, ServerSyncStatus};

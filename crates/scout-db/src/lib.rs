//! # scout-db: Persistent Store for Shelf Scout
//!
//! Durable, asynchronous storage for everything the device owns: scanned-book
//! records, the price cache, the image cache and the scan queue. Backed by a
//! single SQLite file through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Scout Data Flow                            │
//! │                                                                         │
//! │  ScanRecorder / PricingResolver / ScanQueue (scout-sync)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     scout-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ BookRepository     │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ PriceCacheRepo     │  │ 001_init   │  │   │
//! │  │   │ stats()       │    │ ImageCacheRepo     │  │            │  │   │
//! │  │   │ clear_all()   │    │ ScanQueueRepo      │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite file (default: <data dir>/shelf-scout/scout.db)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scout_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("scout.db")).await?;
//!
//! let hit = db.prices().get_valid("9780140449136", chrono::Duration::hours(24)).await?;
//! let recent = db.books().list_by_recency(Some(20)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::books::BookRepository;
pub use repository::images::ImageCacheRepository;
pub use repository::prices::PriceCacheRepository;
pub use repository::scan_queue::ScanQueueRepository;

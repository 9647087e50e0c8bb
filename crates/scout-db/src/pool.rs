//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Pricing lookups for different ISBNs run concurrently;          │
//! │       │ SQLite serializes the writes.                                  │
//! │       ▼                                                                 │
//! │  ScanRecorder / PricingResolver / ScanQueue / SyncOrchestrator         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pragmas
//! - WAL journal: readers never block the writer
//! - `synchronous = FULL`: a committed enqueue survives power loss, not
//!   just a process crash
//! - Foreign keys on

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use scout_core::StorageStats;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::books::BookRepository;
use crate::repository::images::ImageCacheRepository;
use crate::repository::prices::PriceCacheRepository;
use crate::repository::scan_queue::ScanQueueRepository;

// =============================================================================
// Configuration
// =============================================================================

/// How to open the store.
///
/// ```rust,ignore
/// let config = DbConfig::new(data_dir.join("scout.db")).max_connections(2);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; `:memory:` for a throwaway store.
    pub database_path: PathBuf,
    /// Default 4. Concurrent price lookups read in parallel.
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long `acquire` waits for a free connection.
    pub connect_timeout: Duration,
    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,
    /// Apply pending migrations while opening. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed store; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Private in-memory store, one per call. Used by tests.
    pub fn in_memory() -> Self {
        // Every connection to :memory: is its own database, so pin the pool
        // to a single connection that never idles out. `Database::new`
        // disables max_lifetime for every pool.
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let base = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        // Queued scans must be on disk before enqueue returns.
        Ok(base
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// The Persistent Store: pool handle plus repository accessors.
///
/// Constructed once at process start and passed to every service that needs
/// it. Cloning shares the pool.
///
/// ```text
///   Database
///   ├── books()       → scanned-book records
///   ├── prices()      → price cache
///   ├── images()      → thumbnail cache
///   ├── scan_queue()  → pending scans + quarantine
///   ├── stats()       → per-collection counts
///   └── clear_all()   → "clear offline data"
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the store and applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening scout store");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(None)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Store pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the scanned-book repository.
    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.pool.clone())
    }

    /// Returns the price cache repository.
    pub fn prices(&self) -> PriceCacheRepository {
        PriceCacheRepository::new(self.pool.clone())
    }

    /// Returns the image cache repository.
    pub fn images(&self) -> ImageCacheRepository {
        ImageCacheRepository::new(self.pool.clone())
    }

    /// Returns the scan queue repository.
    pub fn scan_queue(&self) -> ScanQueueRepository {
        ScanQueueRepository::new(self.pool.clone())
    }

    /// Counts per collection, for diagnostics.
    pub async fn stats(&self) -> DbResult<StorageStats> {
        let (books, prices, images, queued, quarantined): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM scanned_books),
                    (SELECT COUNT(*) FROM price_cache),
                    (SELECT COUNT(*) FROM image_cache),
                    (SELECT COUNT(*) FROM scan_queue),
                    (SELECT COUNT(*) FROM scan_quarantine)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(StorageStats {
            books: books as u64,
            prices: prices as u64,
            images: images as u64,
            queued_scans: queued as u64,
            quarantined_scans: quarantined as u64,
        })
    }

    /// Hard reset of the book, price and image collections.
    ///
    /// The scan queue is left alone: pending scans have not reached the
    /// server yet, and clearing them is a separate explicit action.
    pub async fn clear_all(&self) -> DbResult<()> {
        info!("Clearing offline data");

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM scanned_books").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM price_cache").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM image_cache").execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        debug!("Closing scout store");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

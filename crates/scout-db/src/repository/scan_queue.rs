//! # Scan Queue Repository
//!
//! Durable FIFO of scans waiting for server acknowledgment, plus the
//! quarantine table for scans abandoned at the retry ceiling.
//!
//! ## Durability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  enqueue(scan)                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO scan_queue … (autocommit)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT flushed to disk (synchronous = FULL)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  return QueuedScan  ← only now may the caller report "saved"           │
//! │                                                                         │
//! │  A process kill at any point after `return` cannot lose the scan.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ordering is by the autoincrement `seq` column, never by wall clock, so two
//! scans within the same millisecond still drain in enqueue order.

use chrono::Utc;
use scout_core::{NewScan, QuarantinedScan, QueuedScan};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{from_millis, to_millis};
use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct QueuedRow {
    id: String,
    isbn: String,
    title: String,
    author: String,
    timestamp_ms: i64,
    retries: i64,
    error: Option<String>,
}

impl From<QueuedRow> for QueuedScan {
    fn from(row: QueuedRow) -> Self {
        QueuedScan {
            id: row.id,
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            timestamp: from_millis(row.timestamp_ms),
            retries: row.retries.max(0) as u32,
            error: row.error,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuarantinedRow {
    id: String,
    isbn: String,
    title: String,
    author: String,
    timestamp_ms: i64,
    retries: i64,
    error: String,
    quarantined_at_ms: i64,
}

impl From<QuarantinedRow> for QuarantinedScan {
    fn from(row: QuarantinedRow) -> Self {
        QuarantinedScan {
            id: row.id,
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            timestamp: from_millis(row.timestamp_ms),
            retries: row.retries.max(0) as u32,
            error: row.error,
            quarantined_at: from_millis(row.quarantined_at_ms),
        }
    }
}

/// Repository for the scan queue and its quarantine.
#[derive(Debug, Clone)]
pub struct ScanQueueRepository {
    pool: SqlitePool,
}

impl ScanQueueRepository {
    /// Creates a new ScanQueueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ScanQueueRepository { pool }
    }

    /// Appends a scan with a fresh UUID and the current time.
    ///
    /// Returns only after the insert has committed.
    pub async fn enqueue(&self, scan: &NewScan) -> DbResult<QueuedScan> {
        let entry = QueuedScan::new(Uuid::new_v4().to_string(), scan, Utc::now());
        self.insert(&entry).await?;
        Ok(entry)
    }

    /// Appends a prepared entry, keeping its id.
    ///
    /// Used when a direct submission already sent this id upstream as its
    /// idempotency key and then failed.
    pub async fn insert(&self, entry: &QueuedScan) -> DbResult<()> {
        debug!(id = %entry.id, isbn = %entry.isbn, "Enqueuing scan");

        sqlx::query(
            r#"
            INSERT INTO scan_queue (id, isbn, title, author, timestamp_ms, retries, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.isbn)
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(to_millis(entry.timestamp))
        .bind(entry.retries as i64)
        .bind(&entry.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every pending entry, oldest first.
    pub async fn list(&self) -> DbResult<Vec<QueuedScan>> {
        let rows = sqlx::query_as::<_, QueuedRow>(
            r#"
            SELECT id, isbn, title, author, timestamp_ms, retries, error
            FROM scan_queue
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QueuedScan::from).collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<QueuedScan>> {
        let row = sqlx::query_as::<_, QueuedRow>(
            r#"
            SELECT id, isbn, title, author, timestamp_ms, retries, error
            FROM scan_queue
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QueuedScan::from))
    }

    /// Increments the retry counter and stores the failure message.
    ///
    /// Returns the new retry count.
    pub async fn record_failure(&self, id: &str, error: &str) -> DbResult<u32> {
        let retries: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE scan_queue SET
                retries = retries + 1,
                error = ?2
            WHERE id = ?1
            RETURNING retries
            "#,
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        match retries {
            Some(n) => Ok(n.max(0) as u32),
            None => Err(DbError::not_found("QueuedScan", id)),
        }
    }

    /// Removes an acknowledged entry. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM scan_queue WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves an entry from the queue into quarantine in one transaction.
    ///
    /// The entry's current retry count is kept; `error` becomes its final
    /// diagnostic message.
    pub async fn quarantine(&self, id: &str, error: &str) -> DbResult<QuarantinedScan> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, QueuedRow>(
            r#"
            SELECT id, isbn, title, author, timestamp_ms, retries, error
            FROM scan_queue
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("QueuedScan", id))?;

        let scan = QueuedScan::from(row);
        let quarantined = QuarantinedScan {
            id: scan.id,
            isbn: scan.isbn,
            title: scan.title,
            author: scan.author,
            timestamp: scan.timestamp,
            retries: scan.retries,
            error: error.to_string(),
            quarantined_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO scan_quarantine (
                id, isbn, title, author, timestamp_ms, retries, error, quarantined_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&quarantined.id)
        .bind(&quarantined.isbn)
        .bind(&quarantined.title)
        .bind(&quarantined.author)
        .bind(to_millis(quarantined.timestamp))
        .bind(quarantined.retries as i64)
        .bind(&quarantined.error)
        .bind(to_millis(quarantined.quarantined_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM scan_queue WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        warn!(
            id = %quarantined.id,
            isbn = %quarantined.isbn,
            retries = quarantined.retries,
            error = %quarantined.error,
            "Scan abandoned after retry ceiling"
        );

        Ok(quarantined)
    }

    /// Quarantined scans, most recent first.
    pub async fn list_quarantined(&self, limit: Option<u32>) -> DbResult<Vec<QuarantinedScan>> {
        let limit = limit.map(i64::from).unwrap_or(-1);
        let rows = sqlx::query_as::<_, QuarantinedRow>(
            r#"
            SELECT id, isbn, title, author, timestamp_ms, retries, error, quarantined_at_ms
            FROM scan_quarantine
            ORDER BY quarantined_at_ms DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QuarantinedScan::from).collect())
    }

    /// Pending entries.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_queue")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    pub async fn count_quarantined(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_quarantine")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Drops every pending entry.
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM scan_queue")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn clear_quarantine(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM scan_quarantine")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn scan(isbn: &str) -> NewScan {
        NewScan {
            isbn: isbn.to_string(),
            title: "Title".to_string(),
            author: "Author".to_string(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_preserves_order() {
        let db = db().await;
        let queue = db.scan_queue();

        let a = queue.enqueue(&scan("9780140449136")).await.unwrap();
        let b = queue.enqueue(&scan("9780261103573")).await.unwrap();
        let c = queue.enqueue(&scan("080442957X")).await.unwrap();

        let ids: Vec<_> = queue.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
        assert_eq!(queue.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let db = db().await;
        let queue = db.scan_queue();
        let a = queue.enqueue(&scan("9780140449136")).await.unwrap();
        let b = queue.enqueue(&scan("9780140449136")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_insert_keeps_id() {
        let db = db().await;
        let queue = db.scan_queue();
        let entry = QueuedScan::new("client-scan-1", &scan("9780140449136"), Utc::now());

        queue.insert(&entry).await.unwrap();
        let stored = queue.get("client-scan-1").await.unwrap().unwrap();
        assert_eq!(stored.isbn, "9780140449136");
        assert_eq!(stored.retries, 0);

        // Same id twice violates the UNIQUE constraint.
        assert!(queue.insert(&entry).await.is_err());
    }

    #[tokio::test]
    async fn test_record_failure_increments() {
        let db = db().await;
        let queue = db.scan_queue();
        let entry = queue.enqueue(&scan("9780140449136")).await.unwrap();

        assert_eq!(queue.record_failure(&entry.id, "HTTP 500").await.unwrap(), 1);
        assert_eq!(queue.record_failure(&entry.id, "HTTP 502").await.unwrap(), 2);

        let stored = queue.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.retries, 2);
        assert_eq!(stored.error.as_deref(), Some("HTTP 502"));

        let missing = queue.record_failure("no-such-id", "x").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove() {
        let db = db().await;
        let queue = db.scan_queue();
        let entry = queue.enqueue(&scan("9780140449136")).await.unwrap();

        assert!(queue.remove(&entry.id).await.unwrap());
        assert!(!queue.remove(&entry.id).await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_quarantine_moves_entry() {
        let db = db().await;
        let queue = db.scan_queue();
        let entry = queue.enqueue(&scan("9780140449136")).await.unwrap();
        queue.record_failure(&entry.id, "HTTP 500").await.unwrap();

        let quarantined = queue.quarantine(&entry.id, "HTTP 500").await.unwrap();
        assert_eq!(quarantined.retries, 1);
        assert_eq!(quarantined.isbn, "9780140449136");

        assert_eq!(queue.count().await.unwrap(), 0);
        assert_eq!(queue.count_quarantined().await.unwrap(), 1);
        let listed = queue.list_quarantined(None).await.unwrap();
        assert_eq!(listed[0].id, entry.id);
        assert_eq!(listed[0].error, "HTTP 500");
    }

    #[tokio::test]
    async fn test_clear() {
        let db = db().await;
        let queue = db.scan_queue();
        queue.enqueue(&scan("9780140449136")).await.unwrap();
        queue.enqueue(&scan("9780261103573")).await.unwrap();

        assert_eq!(queue.clear().await.unwrap(), 2);
        assert_eq!(queue.count().await.unwrap(), 0);
    }
}

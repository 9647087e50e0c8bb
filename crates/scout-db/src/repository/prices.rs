//! # Price Cache Repository
//!
//! Memoized pricing lookups keyed by ISBN.
//!
//! ## Expiry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_valid(isbn, ttl)                                                   │
//! │       │                                                                 │
//! │       ├── no row ───────────────────────────────► None                 │
//! │       │                                                                 │
//! │       ├── now − cached_at <  ttl ───────────────► Some(entry)          │
//! │       │                                                                 │
//! │       └── now − cached_at >= ttl ──► DELETE row ─► None                 │
//! │                                                                         │
//! │  sweep_expired(max_age): DELETE WHERE cached_at < now − max_age        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The expired-row delete is conditional on `cached_at_ms` so a fresh entry
//! written between the read and the delete is left alone.

use chrono::{DateTime, Duration, Utc};
use scout_core::{PriceCacheEntry, PriceSource};
use sqlx::SqlitePool;
use tracing::debug;

use super::{from_cents, from_millis, to_cents, to_millis};
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    isbn: String,
    ebay_price_cents: Option<i64>,
    amazon_price_cents: Option<i64>,
    title: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    source: PriceSource,
    cached_at_ms: i64,
}

impl From<PriceRow> for PriceCacheEntry {
    fn from(row: PriceRow) -> Self {
        PriceCacheEntry {
            isbn: row.isbn,
            ebay_price: from_cents(row.ebay_price_cents),
            amazon_price: from_cents(row.amazon_price_cents),
            title: row.title,
            author: row.author,
            publisher: row.publisher,
            source: row.source,
            cached_at: from_millis(row.cached_at_ms),
        }
    }
}

/// Repository for price cache entries.
#[derive(Debug, Clone)]
pub struct PriceCacheRepository {
    pool: SqlitePool,
}

impl PriceCacheRepository {
    /// Creates a new PriceCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PriceCacheRepository { pool }
    }

    /// Creates or overwrites the entry for `entry.isbn`.
    pub async fn put(&self, entry: &PriceCacheEntry) -> DbResult<()> {
        debug!(isbn = %entry.isbn, source = %entry.source, "Caching price");

        sqlx::query(
            r#"
            INSERT INTO price_cache (
                isbn, ebay_price_cents, amazon_price_cents,
                title, author, publisher, source, cached_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (isbn) DO UPDATE SET
                ebay_price_cents = excluded.ebay_price_cents,
                amazon_price_cents = excluded.amazon_price_cents,
                title = excluded.title,
                author = excluded.author,
                publisher = excluded.publisher,
                source = excluded.source,
                cached_at_ms = excluded.cached_at_ms
            "#,
        )
        .bind(&entry.isbn)
        .bind(to_cents(entry.ebay_price))
        .bind(to_cents(entry.amazon_price))
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(&entry.publisher)
        .bind(entry.source)
        .bind(to_millis(entry.cached_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Raw read with no expiry check.
    pub async fn get(&self, isbn: &str) -> DbResult<Option<PriceCacheEntry>> {
        let row = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT isbn, ebay_price_cents, amazon_price_cents,
                   title, author, publisher, source, cached_at_ms
            FROM price_cache
            WHERE isbn = ?1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PriceCacheEntry::from))
    }

    /// Returns the entry only while it is younger than `ttl`.
    ///
    /// An expired entry is deleted before the miss is reported.
    pub async fn get_valid(&self, isbn: &str, ttl: Duration) -> DbResult<Option<PriceCacheEntry>> {
        self.get_valid_at(isbn, Utc::now(), ttl).await
    }

    /// [`get_valid`](Self::get_valid) against an explicit clock.
    pub async fn get_valid_at(
        &self,
        isbn: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DbResult<Option<PriceCacheEntry>> {
        let Some(entry) = self.get(isbn).await? else {
            return Ok(None);
        };

        if entry.is_valid_at(now, ttl) {
            return Ok(Some(entry));
        }

        debug!(
            isbn = %isbn,
            age_hours = entry.age_hours(now),
            "Price cache entry expired, deleting"
        );

        sqlx::query("DELETE FROM price_cache WHERE isbn = ?1 AND cached_at_ms = ?2")
            .bind(isbn)
            .bind(to_millis(entry.cached_at))
            .execute(&self.pool)
            .await?;

        Ok(None)
    }

    /// Deletes entries older than `max_age`. Returns the number removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> DbResult<u64> {
        self.sweep_expired_at(Utc::now(), max_age).await
    }

    /// [`sweep_expired`](Self::sweep_expired) against an explicit clock.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> DbResult<u64> {
        let cutoff = to_millis(now - max_age);
        let result = sqlx::query("DELETE FROM price_cache WHERE cached_at_ms < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Swept expired price entries");
        }
        Ok(removed)
    }

    /// Removes one entry. Returns whether it existed.
    pub async fn delete(&self, isbn: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM price_cache WHERE isbn = ?1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts entries, valid or not.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_cache")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Deletes every entry.
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM price_cache")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use scout_core::Money;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn entry(isbn: &str, cached_at: DateTime<Utc>) -> PriceCacheEntry {
        PriceCacheEntry {
            isbn: isbn.to_string(),
            ebay_price: Some(Money::from_cents(1299)),
            amazon_price: Some(Money::from_cents(1429)),
            title: Some("Guards! Guards!".to_string()),
            author: Some("Terry Pratchett".to_string()),
            publisher: None,
            source: PriceSource::Api,
            cached_at,
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_is_valid() {
        let db = db().await;
        let prices = db.prices();
        prices
            .put(&entry("9780140449136", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        let hit = prices
            .get_valid("9780140449136", Duration::hours(24))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.ebay_price, Some(Money::from_cents(1299)));
        assert_eq!(hit.source, PriceSource::Api);
        assert_eq!(hit.author.as_deref(), Some("Terry Pratchett"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted_on_read() {
        let db = db().await;
        let prices = db.prices();
        prices
            .put(&entry("9780140449136", Utc::now() - Duration::hours(25)))
            .await
            .unwrap();

        let miss = prices
            .get_valid("9780140449136", Duration::hours(24))
            .await
            .unwrap();
        assert!(miss.is_none());
        assert!(prices.get("9780140449136").await.unwrap().is_none());
        assert_eq!(prices.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validity_boundary_is_exclusive() {
        let db = db().await;
        let prices = db.prices();
        let now = Utc::now();
        prices
            .put(&entry("9780261103573", now - Duration::hours(24)))
            .await
            .unwrap();

        let result = prices
            .get_valid_at("9780261103573", now, Duration::hours(24))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = db().await;
        let prices = db.prices();
        let now = Utc::now();
        prices.put(&entry("9780140449136", now)).await.unwrap();

        let mut newer = entry("9780140449136", now);
        newer.source = PriceSource::Estimate;
        newer.ebay_price = None;
        prices.put(&newer).await.unwrap();

        let stored = prices.get("9780140449136").await.unwrap().unwrap();
        assert_eq!(stored.source, PriceSource::Estimate);
        assert_eq!(stored.ebay_price, None);
        assert_eq!(prices.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_old_entries() {
        let db = db().await;
        let prices = db.prices();
        let now = Utc::now();
        prices
            .put(&entry("9780140449136", now - Duration::days(8)))
            .await
            .unwrap();
        prices
            .put(&entry("9780261103573", now - Duration::days(2)))
            .await
            .unwrap();

        let removed = prices.sweep_expired_at(now, Duration::days(7)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(prices.get("9780261103573").await.unwrap().is_some());
    }
}

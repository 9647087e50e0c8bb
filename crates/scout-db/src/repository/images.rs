//! # Image Cache Repository
//!
//! Thumbnail bytes keyed by source URL. Best-effort: a miss just means the
//! caller fetches over the network again.

use chrono::{DateTime, Duration, Utc};
use scout_core::CachedImage;
use sqlx::SqlitePool;
use tracing::debug;

use super::{from_millis, to_millis};
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    url: String,
    data: Vec<u8>,
    cached_at_ms: i64,
}

impl From<ImageRow> for CachedImage {
    fn from(row: ImageRow) -> Self {
        CachedImage {
            url: row.url,
            data: row.data,
            cached_at: from_millis(row.cached_at_ms),
        }
    }
}

/// Repository for cached thumbnails.
#[derive(Debug, Clone)]
pub struct ImageCacheRepository {
    pool: SqlitePool,
}

impl ImageCacheRepository {
    /// Creates a new ImageCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ImageCacheRepository { pool }
    }

    /// Stores `data` under `url`, replacing any previous copy.
    pub async fn put(&self, url: &str, data: &[u8]) -> DbResult<CachedImage> {
        let now = Utc::now();
        debug!(url = %url, bytes = data.len(), "Caching image");

        sqlx::query(
            r#"
            INSERT INTO image_cache (url, data, cached_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (url) DO UPDATE SET
                data = excluded.data,
                cached_at_ms = excluded.cached_at_ms
            "#,
        )
        .bind(url)
        .bind(data)
        .bind(to_millis(now))
        .execute(&self.pool)
        .await?;

        Ok(CachedImage {
            url: url.to_string(),
            data: data.to_vec(),
            cached_at: now,
        })
    }

    pub async fn get(&self, url: &str) -> DbResult<Option<CachedImage>> {
        let row = sqlx::query_as::<_, ImageRow>(
            "SELECT url, data, cached_at_ms FROM image_cache WHERE url = ?1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CachedImage::from))
    }

    /// Deletes images older than `max_age`. Returns the number removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> DbResult<u64> {
        self.sweep_expired_at(Utc::now(), max_age).await
    }

    pub async fn sweep_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM image_cache WHERE cached_at_ms < ?1")
            .bind(to_millis(now - max_age))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM image_cache")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM image_cache")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_put_get_and_sweep() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let images = db.images();
        let url = "https://covers.example.com/9780140449136.jpg";

        images.put(url, &[0xFF, 0xD8, 0xFF]).await.unwrap();
        let cached = images.get(url).await.unwrap().unwrap();
        assert_eq!(cached.data, vec![0xFF, 0xD8, 0xFF]);

        assert!(images.get("https://covers.example.com/missing.jpg").await.unwrap().is_none());

        // Nothing is 30 days old yet.
        assert_eq!(images.sweep_expired(Duration::days(30)).await.unwrap(), 0);

        // Thirty-one days from now, it is.
        let later = Utc::now() + Duration::days(31);
        assert_eq!(
            images.sweep_expired_at(later, Duration::days(30)).await.unwrap(),
            1
        );
        assert_eq!(images.count().await.unwrap(), 0);
    }
}

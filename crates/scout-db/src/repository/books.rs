//! # Book Repository
//!
//! Scanned-book records, one row per ISBN.
//!
//! Writes are upserts: a rescan overwrites the previous record in place, so
//! the collection never holds two rows for the same ISBN.

use scout_core::{BookStatus, ScannedBookRecord};
use sqlx::SqlitePool;
use tracing::debug;

use super::{from_cents, from_millis, to_cents, to_millis};
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    isbn: String,
    title: String,
    author: String,
    thumbnail: Option<String>,
    publisher: Option<String>,
    amazon_price_cents: Option<i64>,
    ebay_price_cents: Option<i64>,
    your_cost_cents: Option<i64>,
    profit_cents: Option<i64>,
    status: BookStatus,
    scanned_at_ms: i64,
    sales_rank: Option<i64>,
    velocity: Option<String>,
    velocity_description: Option<String>,
    buy_recommendation: Option<String>,
    cached_at_ms: i64,
}

impl From<BookRow> for ScannedBookRecord {
    fn from(row: BookRow) -> Self {
        ScannedBookRecord {
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            thumbnail: row.thumbnail,
            publisher: row.publisher,
            amazon_price: from_cents(row.amazon_price_cents),
            ebay_price: from_cents(row.ebay_price_cents),
            your_cost: from_cents(row.your_cost_cents),
            profit: from_cents(row.profit_cents),
            status: row.status,
            scanned_at: from_millis(row.scanned_at_ms),
            sales_rank: row.sales_rank,
            velocity: row.velocity,
            velocity_description: row.velocity_description,
            buy_recommendation: row.buy_recommendation,
            cached_at: from_millis(row.cached_at_ms),
        }
    }
}

const SELECT_BOOK: &str = r#"
    SELECT
        isbn, title, author, thumbnail, publisher,
        amazon_price_cents, ebay_price_cents, your_cost_cents, profit_cents,
        status, scanned_at_ms, sales_rank,
        velocity, velocity_description, buy_recommendation,
        cached_at_ms
    FROM scanned_books
"#;

/// Repository for scanned-book records.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts or overwrites the record for `record.isbn`.
    pub async fn upsert(&self, record: &ScannedBookRecord) -> DbResult<()> {
        debug!(isbn = %record.isbn, status = %record.status, "Upserting book");

        sqlx::query(
            r#"
            INSERT INTO scanned_books (
                isbn, title, author, thumbnail, publisher,
                amazon_price_cents, ebay_price_cents, your_cost_cents, profit_cents,
                status, scanned_at_ms, sales_rank,
                velocity, velocity_description, buy_recommendation,
                cached_at_ms
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16
            )
            ON CONFLICT (isbn) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                thumbnail = excluded.thumbnail,
                publisher = excluded.publisher,
                amazon_price_cents = excluded.amazon_price_cents,
                ebay_price_cents = excluded.ebay_price_cents,
                your_cost_cents = excluded.your_cost_cents,
                profit_cents = excluded.profit_cents,
                status = excluded.status,
                scanned_at_ms = excluded.scanned_at_ms,
                sales_rank = excluded.sales_rank,
                velocity = excluded.velocity,
                velocity_description = excluded.velocity_description,
                buy_recommendation = excluded.buy_recommendation,
                cached_at_ms = excluded.cached_at_ms
            "#,
        )
        .bind(&record.isbn)
        .bind(&record.title)
        .bind(&record.author)
        .bind(&record.thumbnail)
        .bind(&record.publisher)
        .bind(to_cents(record.amazon_price))
        .bind(to_cents(record.ebay_price))
        .bind(to_cents(record.your_cost))
        .bind(to_cents(record.profit))
        .bind(record.status)
        .bind(to_millis(record.scanned_at))
        .bind(record.sales_rank)
        .bind(&record.velocity)
        .bind(&record.velocity_description)
        .bind(&record.buy_recommendation)
        .bind(to_millis(record.cached_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a record by ISBN. A miss is `Ok(None)`.
    pub async fn get(&self, isbn: &str) -> DbResult<Option<ScannedBookRecord>> {
        let sql = format!("{} WHERE isbn = ?1", SELECT_BOOK);
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ScannedBookRecord::from))
    }

    /// Most recently scanned first; `None` returns every record.
    ///
    /// A single SELECT, so the result is a consistent snapshot even while
    /// scans are being written.
    pub async fn list_by_recency(&self, limit: Option<u32>) -> DbResult<Vec<ScannedBookRecord>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(i64::from).unwrap_or(-1);
        let sql = format!(
            "{} ORDER BY scanned_at_ms DESC, isbn ASC LIMIT ?1",
            SELECT_BOOK
        );
        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ScannedBookRecord::from).collect())
    }

    /// Removes one record. Returns whether it existed.
    pub async fn delete(&self, isbn: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM scanned_books WHERE isbn = ?1")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts records.
    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scanned_books")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Deletes every record.
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM scanned_books")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use scout_core::Money;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = db().await;
        let mut record = ScannedBookRecord::new("9780140449136", "The Odyssey", "Homer");
        record.ebay_price = Some(Money::from_cents(899));
        record.status = BookStatus::Profitable;

        db.books().upsert(&record).await.unwrap();

        let found = db.books().get("9780140449136").await.unwrap().unwrap();
        assert_eq!(found.title, "The Odyssey");
        assert_eq!(found.ebay_price, Some(Money::from_cents(899)));
        assert_eq!(found.amazon_price, None);
        assert_eq!(found.status, BookStatus::Profitable);
        assert_eq!(
            found.scanned_at.timestamp_millis(),
            record.scanned_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let db = db().await;
        assert!(db.books().get("9780261103573").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rescan_updates_in_place() {
        let db = db().await;
        let books = db.books();

        let first = ScannedBookRecord::new("9780261103573", "The Hobbit", "Tolkien");
        books.upsert(&first).await.unwrap();

        let mut second = first.clone();
        second.title = "The Hobbit (Anniversary Edition)".to_string();
        second.status = BookStatus::Loss;
        books.upsert(&second).await.unwrap();

        assert_eq!(books.count().await.unwrap(), 1);
        let found = books.get("9780261103573").await.unwrap().unwrap();
        assert_eq!(found.title, "The Hobbit (Anniversary Edition)");
        assert_eq!(found.status, BookStatus::Loss);
    }

    #[tokio::test]
    async fn test_list_by_recency() {
        let db = db().await;
        let books = db.books();
        let now = Utc::now();

        for (i, isbn) in ["9780140449136", "9780261103573", "080442957X"]
            .iter()
            .enumerate()
        {
            let mut record = ScannedBookRecord::new(*isbn, "t", "a");
            record.scanned_at = now - Duration::minutes(10 - i as i64);
            books.upsert(&record).await.unwrap();
        }

        let all = books.list_by_recency(None).await.unwrap();
        let isbns: Vec<_> = all.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["080442957X", "9780261103573", "9780140449136"]);

        let top = books.list_by_recency(Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].isbn, "080442957X");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let db = db().await;
        let books = db.books();
        books
            .upsert(&ScannedBookRecord::new("9780140449136", "t", "a"))
            .await
            .unwrap();
        books
            .upsert(&ScannedBookRecord::new("9780261103573", "t", "a"))
            .await
            .unwrap();

        assert!(books.delete("9780140449136").await.unwrap());
        assert!(!books.delete("9780140449136").await.unwrap());
        assert_eq!(books.clear().await.unwrap(), 1);
        assert_eq!(books.count().await.unwrap(), 0);
    }
}

//! # Scan Recording
//!
//! What happens when the user scans a barcode.
//!
//! ## Flow
//! ```text
//!   NewScan
//!     │ validate (bad ISBN stops here, nothing stored)
//!     ▼
//!   PricingResolver::resolve ──► PriceQuote (always)
//!     │
//!     ▼
//!   upsert ScannedBookRecord (local first; storage failure is logged)
//!     │
//!     ├── online ──► POST /scans ──► 2xx ────────► Committed
//!     │                   ├──────► 403 ────────► Err(QuotaExceeded)
//!     │                   └──────► other ──┐
//!     │                                    ▼
//!     └── offline ─────────────────► enqueue ──► Queued
//! ```
//!
//! A failed direct submission is queued under the same id it was sent with,
//! so the server can deduplicate if the first attempt actually landed.

use chrono::Utc;
use scout_core::money::Money;
use scout_core::pricing::{derive_status, profit_for, PriceQuote};
use scout_core::types::{BookMetadata, NewScan, QueuedScan, ScannedBookRecord};
use scout_core::validation::{normalize_isbn, validate_scan};
use scout_db::{BookRepository, DbError};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::network::NetworkMonitor;
use crate::pricing::PricingResolver;
use crate::queue::ScanQueue;
use crate::transport::ScoutApi;

/// Where a recorded scan ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The server acknowledged the scan.
    Committed {
        record: ScannedBookRecord,
        quote: PriceQuote,
    },
    /// The scan is waiting in the queue.
    Queued {
        record: ScannedBookRecord,
        quote: PriceQuote,
        queued: QueuedScan,
    },
}

impl ScanOutcome {
    pub fn record(&self) -> &ScannedBookRecord {
        match self {
            ScanOutcome::Committed { record, .. } | ScanOutcome::Queued { record, .. } => record,
        }
    }

    pub fn quote(&self) -> &PriceQuote {
        match self {
            ScanOutcome::Committed { quote, .. } | ScanOutcome::Queued { quote, .. } => quote,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, ScanOutcome::Queued { .. })
    }
}

/// Records scans locally and forwards them to the server.
#[derive(Clone)]
pub struct ScanRecorder {
    books: BookRepository,
    resolver: PricingResolver,
    queue: ScanQueue,
    api: Arc<dyn ScoutApi>,
    network: NetworkMonitor,
}

impl ScanRecorder {
    pub fn new(
        books: BookRepository,
        resolver: PricingResolver,
        queue: ScanQueue,
        api: Arc<dyn ScoutApi>,
        network: NetworkMonitor,
    ) -> Self {
        ScanRecorder {
            books,
            resolver,
            queue,
            api,
            network,
        }
    }

    /// Prices, stores and submits a scan.
    ///
    /// ## Errors
    /// - `Validation` for a malformed ISBN or oversized text
    /// - `QuotaExceeded` when the server refuses on quota
    /// - `Storage` only when the scan could not be queued either
    pub async fn record(&self, scan: &NewScan) -> SyncResult<ScanOutcome> {
        let scan = validate_scan(scan)?;
        let meta = BookMetadata {
            title: non_empty(&scan.title),
            author: non_empty(&scan.author),
            publisher: None,
        };

        let quote = self.resolver.resolve(&scan.isbn, &meta).await;
        let record = self.upsert_record(&scan, &quote).await;
        let entry = QueuedScan::new(Uuid::new_v4().to_string(), &scan, Utc::now());

        if self.network.is_online() {
            match self.api.create_scan(&entry).await {
                Ok(()) => {
                    info!(isbn = %scan.isbn, status = %record.status, "Scan committed");
                    return Ok(ScanOutcome::Committed { record, quote });
                }
                Err(SyncError::QuotaExceeded(message)) => {
                    warn!(isbn = %scan.isbn, %message, "Scan refused: quota exceeded");
                    return Err(SyncError::QuotaExceeded(message));
                }
                Err(e) => {
                    warn!(isbn = %scan.isbn, error = %e, "Scan submit failed, queueing");
                }
            }
        }

        self.queue.enqueue_entry(&entry).await?;
        Ok(ScanOutcome::Queued {
            record,
            quote,
            queued: entry,
        })
    }

    /// Writes the record, keeping user-entered fields from an earlier scan.
    async fn upsert_record(&self, scan: &NewScan, quote: &PriceQuote) -> ScannedBookRecord {
        let existing = match self.books.get(&scan.isbn).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(isbn = %scan.isbn, error = %e, "Could not read existing record");
                None
            }
        };

        let now = Utc::now();
        let mut record = existing
            .unwrap_or_else(|| ScannedBookRecord::new(scan.isbn.clone(), "", ""));

        record.title = pick_text(&scan.title, quote.title.as_deref(), &record.title);
        record.author = pick_text(&scan.author, quote.author.as_deref(), &record.author);
        if quote.publisher.is_some() {
            record.publisher = quote.publisher.clone();
        }
        record.ebay_price = quote.ebay_price;
        record.amazon_price = quote.amazon_price;
        record.profit = match record.your_cost {
            Some(cost) => quote.profit_with_cost(cost, self.resolver.pricing_policy().fee_rate),
            None => quote.profit,
        };
        record.status = derive_status(record.profit);
        record.scanned_at = now;
        record.cached_at = now;

        if let Err(e) = self.books.upsert(&record).await {
            warn!(isbn = %record.isbn, error = %e, "Failed to store scanned book");
        }
        record
    }

    /// Sets what the user actually paid and re-derives profit and status.
    pub async fn set_cost(&self, isbn: &str, cost: Money) -> SyncResult<ScannedBookRecord> {
        let isbn = normalize_isbn(isbn)?;
        let mut record = self
            .books
            .get(&isbn)
            .await?
            .ok_or_else(|| DbError::not_found("ScannedBookRecord", &isbn))?;

        record.your_cost = Some(cost);
        record.profit = profit_for(
            record.ebay_price,
            record.amazon_price,
            cost,
            self.resolver.pricing_policy().fee_rate,
        );
        record.status = derive_status(record.profit);
        record.cached_at = Utc::now();

        self.books.upsert(&record).await?;
        info!(isbn = %isbn, cost = %cost, status = %record.status, "Purchase cost updated");
        Ok(record)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Scanner text, else quote metadata, else what was stored.
fn pick_text(scanned: &str, quoted: Option<&str>, stored: &str) -> String {
    if !scanned.is_empty() {
        return scanned.to_string();
    }
    match quoted {
        Some(q) if !q.trim().is_empty() => q.to_string(),
        _ => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_text_precedence() {
        assert_eq!(pick_text("Mort", Some("MORT"), "old"), "Mort");
        assert_eq!(pick_text("", Some("Mort"), "old"), "Mort");
        assert_eq!(pick_text("", Some("  "), "old"), "old");
        assert_eq!(pick_text("", None, ""), "");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" Homer "), Some("Homer".to_string()));
    }
}

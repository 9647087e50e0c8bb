//! # Repository Module
//!
//! One repository per persisted collection.
//!
//! ## Collections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database                                                               │
//! │  ├── books()       BookRepository        scanned_books    (by isbn)    │
//! │  ├── prices()      PriceCacheRepository  price_cache      (by isbn)    │
//! │  ├── images()      ImageCacheRepository  image_cache      (by url)     │
//! │  └── scan_queue()  ScanQueueRepository   scan_queue       (by seq)     │
//! │                                          scan_quarantine  (by id)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each repository holds a clone of the pool; cloning is cheap and every
//! call is independent. Together they form the storage port the sync layer
//! talks to: keyed get/put/delete plus one time-ordered listing per
//! collection.

use chrono::{DateTime, Utc};
use scout_core::Money;

pub mod books;
pub mod images;
pub mod prices;
pub mod scan_queue;

/// Timestamps are persisted as epoch milliseconds.
pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn to_cents(money: Option<Money>) -> Option<i64> {
    money.map(|m| m.cents())
}

pub(crate) fn from_cents(cents: Option<i64>) -> Option<Money> {
    cents.map(Money::from_cents)
}

//! # Domain Types
//!
//! Entities owned by the device and the enums that classify them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ScannedBookRecord │  │ PriceCacheEntry  │  │   CachedImage    │      │
//! │  │  ──────────────  │  │  ──────────────  │  │  ──────────────  │      │
//! │  │  isbn (PK)       │  │  isbn (PK)       │  │  url (PK)        │      │
//! │  │  prices, profit  │  │  prices, source  │  │  bytes           │      │
//! │  │  status          │  │  cached_at (TTL) │  │  cached_at       │      │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘      │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐                            │
//! │  │   QueuedScan     │  │ QuarantinedScan  │   Enums: BookStatus,       │
//! │  │  ──────────────  │  │  ──────────────  │   PriceSource,             │
//! │  │  id (UUID)       │  │  last error      │   QuoteSource,             │
//! │  │  retries         │  │  quarantined_at  │   Confidence               │
//! │  └──────────────────┘  └──────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are last-writer-wins per ISBN; the device is the only writer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A ratio in basis points (1 bps = 0.01%).
///
/// 1500 bps is a 15% marketplace fee; 11000 bps is a 1.1× multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Buy decision derived from profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    Profitable,
    BreakEven,
    Loss,
    /// No price known yet.
    #[default]
    Pending,
}

/// Where a price cache entry's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Live upstream marketplace data.
    Api,
    /// Heuristic or upstream demo data.
    Estimate,
    /// Copied from the server-side cache.
    Cache,
}

/// Which resolver tier produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteSource {
    /// Tier 1: local price cache.
    Cache,
    /// Tier 2: server-side cache lookup.
    ServerCache,
    /// Tier 3: live upstream query.
    Api,
    /// Tier 3 demo data or tier 4 heuristic.
    Estimate,
}

/// How far a price can be trusted for a buy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the canonical wire/storage spelling.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(CoreError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(BookStatus, "book status", {
    Profitable => "profitable",
    BreakEven => "break-even",
    Loss => "loss",
    Pending => "pending",
});

string_enum!(PriceSource, "price source", {
    Api => "api",
    Estimate => "estimate",
    Cache => "cache",
});

string_enum!(QuoteSource, "quote source", {
    Cache => "cache",
    ServerCache => "server-cache",
    Api => "api",
    Estimate => "estimate",
});

string_enum!(Confidence, "confidence", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

// =============================================================================
// Book Metadata
// =============================================================================

/// Optional descriptive data that accompanies an ISBN lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
}

impl BookMetadata {
    /// Metadata with only an author, the common case for estimate tests.
    pub fn with_author(author: impl Into<String>) -> Self {
        BookMetadata {
            author: Some(author.into()),
            ..Default::default()
        }
    }
}

// =============================================================================
// Scanned Book Record
// =============================================================================

/// One record per unique ISBN scanned on this device.
///
/// Created on first scan, updated in place on rescan, removed only by an
/// explicit clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScannedBookRecord {
    /// Primary key.
    pub isbn: String,
    pub title: String,
    pub author: String,
    /// Thumbnail URL, resolvable through the image cache.
    pub thumbnail: Option<String>,
    pub publisher: Option<String>,
    pub amazon_price: Option<Money>,
    pub ebay_price: Option<Money>,
    /// What the user paid (or will pay) for the copy.
    pub your_cost: Option<Money>,
    pub profit: Option<Money>,
    pub status: BookStatus,
    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
    pub sales_rank: Option<i64>,
    pub velocity: Option<String>,
    pub velocity_description: Option<String>,
    pub buy_recommendation: Option<String>,
    /// Last local write.
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
}

impl ScannedBookRecord {
    /// Creates a pending record with no prices.
    pub fn new(isbn: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        ScannedBookRecord {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            thumbnail: None,
            publisher: None,
            amazon_price: None,
            ebay_price: None,
            your_cost: None,
            profit: None,
            status: BookStatus::Pending,
            scanned_at: now,
            sales_rank: None,
            velocity: None,
            velocity_description: None,
            buy_recommendation: None,
            cached_at: now,
        }
    }

    /// Lowest of the two marketplace prices.
    pub fn lowest_price(&self) -> Option<Money> {
        Money::lowest(self.ebay_price, self.amazon_price)
    }
}

// =============================================================================
// Price Cache Entry
// =============================================================================

/// Memo of a prior pricing lookup, keyed by ISBN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceCacheEntry {
    pub isbn: String,
    pub ebay_price: Option<Money>,
    pub amazon_price: Option<Money>,
    /// Display data for offline use.
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub source: PriceSource,
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
}

impl PriceCacheEntry {
    /// How long ago the entry was written.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }

    /// Age in fractional hours, as shown next to cached quotes.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        self.age(now).num_seconds().max(0) as f64 / 3600.0
    }

    /// An entry is valid only while `now - cached_at < ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// Metadata view of the cached display fields.
    pub fn metadata(&self) -> BookMetadata {
        BookMetadata {
            title: self.title.clone(),
            author: self.author.clone(),
            publisher: self.publisher.clone(),
        }
    }
}

// =============================================================================
// Cached Image
// =============================================================================

/// Binary thumbnail keyed by its source URL. Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CachedImage {
    pub url: String,
    pub data: Vec<u8>,
    #[ts(as = "String")]
    pub cached_at: DateTime<Utc>,
}

// =============================================================================
// Scan Queue Entries
// =============================================================================

/// Input for a scan that still has to reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewScan {
    pub isbn: String,
    pub title: String,
    pub author: String,
}

/// A pending write awaiting server acknowledgment.
///
/// ## Lifecycle
/// ```text
///   enqueue ──► pending (retries = 0)
///                  │ failed attempt
///                  ▼
///               pending (retries + 1) ──► retries == ceiling ──► abandoned
///                  │ server 2xx                                  (quarantined)
///                  ▼
///               acknowledged (removed)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QueuedScan {
    /// Locally generated UUID; doubles as the idempotency key sent upstream.
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    /// Last failure message.
    pub error: Option<String>,
}

impl QueuedScan {
    /// Fresh entry with zero retries.
    pub fn new(id: impl Into<String>, scan: &NewScan, timestamp: DateTime<Utc>) -> Self {
        QueuedScan {
            id: id.into(),
            isbn: scan.isbn.clone(),
            title: scan.title.clone(),
            author: scan.author.clone(),
            timestamp,
            retries: 0,
            error: None,
        }
    }
}

/// A scan dropped at the retry ceiling, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuarantinedScan {
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub error: String,
    #[ts(as = "String")]
    pub quarantined_at: DateTime<Utc>,
}

// =============================================================================
// Storage Stats
// =============================================================================

/// Per-collection counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StorageStats {
    pub books: u64,
    pub prices: u64,
    pub images: u64,
    pub queued_scans: u64,
    pub quarantined_scans: u64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_spelling() {
        assert_eq!(BookStatus::BreakEven.as_str(), "break-even");
        assert_eq!("break-even".parse::<BookStatus>().unwrap(), BookStatus::BreakEven);
        assert_eq!(QuoteSource::ServerCache.to_string(), "server-cache");
        assert_eq!("HIGH".parse::<Confidence>().unwrap(), Confidence::High);
        assert!("certain".parse::<Confidence>().is_err());
    }

    #[test]
    fn test_serde_spelling_matches_storage() {
        let json = serde_json::to_string(&BookStatus::BreakEven).unwrap();
        assert_eq!(json, "\"break-even\"");
        let json = serde_json::to_string(&QuoteSource::ServerCache).unwrap();
        assert_eq!(json, "\"server-cache\"");
        let json = serde_json::to_string(&PriceSource::Api).unwrap();
        assert_eq!(json, "\"api\"");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn test_price_entry_validity_boundary() {
        let now = Utc::now();
        let mut entry = PriceCacheEntry {
            isbn: "9780140449136".into(),
            ebay_price: Some(Money::from_cents(500)),
            amazon_price: None,
            title: None,
            author: None,
            publisher: None,
            source: PriceSource::Api,
            cached_at: now - Duration::hours(23),
        };
        assert!(entry.is_valid_at(now, Duration::hours(24)));
        assert!((entry.age_hours(now) - 23.0).abs() < 0.01);

        entry.cached_at = now - Duration::hours(24);
        assert!(!entry.is_valid_at(now, Duration::hours(24)));
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = ScannedBookRecord::new("9780261103573", "The Hobbit", "J.R.R. Tolkien");
        assert_eq!(record.status, BookStatus::Pending);
        assert!(record.lowest_price().is_none());
    }
}

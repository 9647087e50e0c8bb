//! # Policy
//!
//! Tunable lifetimes and heuristics. Defaults mirror the values the client
//! has always shipped with; the sync crate fills these from `scout.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Rate;
use crate::{
    DEFAULT_IMAGE_RETENTION_DAYS, DEFAULT_PRICE_RETENTION_DAYS, DEFAULT_PRICE_TTL_HOURS,
    DEFAULT_RETRY_CEILING,
};

// =============================================================================
// Cache Policy
// =============================================================================

/// Expiry, retention and retry settings for locally persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Price entries older than this are misses (and deleted on read).
    pub price_ttl_hours: u32,
    /// Sweeps delete price entries older than this.
    pub price_retention_days: u32,
    /// Sweeps delete images older than this.
    pub image_retention_days: u32,
    /// Failed attempts before a queued scan is abandoned.
    pub retry_ceiling: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            price_ttl_hours: DEFAULT_PRICE_TTL_HOURS,
            price_retention_days: DEFAULT_PRICE_RETENTION_DAYS,
            image_retention_days: DEFAULT_IMAGE_RETENTION_DAYS,
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }
}

impl CachePolicy {
    pub fn price_ttl(&self) -> Duration {
        Duration::hours(self.price_ttl_hours as i64)
    }

    pub fn price_retention(&self) -> Duration {
        Duration::days(self.price_retention_days as i64)
    }

    pub fn image_retention(&self) -> Duration {
        Duration::days(self.image_retention_days as i64)
    }
}

// =============================================================================
// Pricing Policy
// =============================================================================

/// Knobs for profit math and the offline estimate.
///
/// ## Estimate Formula
/// ```text
/// price  = base_price
/// price += price × author_markup        (author on the high-demand list)
/// price += publisher_increment          (publisher on the premium list)
/// price += price × jitter               (jitter drawn from ±jitter)
///
/// marketplace A (eBay)   = price
/// marketplace B (Amazon) = price × marketplace_b_multiplier
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Purchase cost assumed until the user enters the real one.
    pub assumed_cost: Money,
    /// Marketplace fee charged on the sale price.
    pub fee_rate: Rate,
    /// Reference price of a generic used book.
    pub base_price: Money,
    /// Markup for high-demand authors.
    pub author_markup: Rate,
    /// Flat increment for premium imprints.
    pub publisher_increment: Money,
    /// Maximum random deviation in either direction.
    pub jitter: Rate,
    /// Marketplace B price as a multiple of marketplace A.
    pub marketplace_b_multiplier: Rate,
    pub high_demand_authors: Vec<String>,
    pub premium_publishers: Vec<String>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        PricingPolicy {
            assumed_cost: Money::from_cents(200),
            fee_rate: Rate::from_bps(1500),
            base_price: Money::from_cents(1299),
            author_markup: Rate::from_bps(5000),
            publisher_increment: Money::from_cents(300),
            jitter: Rate::from_bps(1500),
            marketplace_b_multiplier: Rate::from_bps(11000),
            high_demand_authors: default_high_demand_authors(),
            premium_publishers: default_premium_publishers(),
        }
    }
}

/// Authors whose used copies historically sell above the generic reference.
pub fn default_high_demand_authors() -> Vec<String> {
    [
        "Stephen King",
        "J.K. Rowling",
        "Terry Pratchett",
        "Neil Gaiman",
        "J.R.R. Tolkien",
        "George R.R. Martin",
        "Brandon Sanderson",
        "Agatha Christie",
        "Ursula K. Le Guin",
        "Haruki Murakami",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Imprints that carry a resale premium.
pub fn default_premium_publishers() -> Vec<String> {
    [
        "Folio Society",
        "Taschen",
        "Phaidon",
        "Penguin Classics",
        "Oxford University Press",
        "Everyman's Library",
        "Subterranean Press",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_policy_defaults() {
        let policy = CachePolicy::default();
        assert_eq!(policy.price_ttl(), Duration::hours(24));
        assert_eq!(policy.price_retention(), Duration::days(7));
        assert_eq!(policy.image_retention(), Duration::days(30));
        assert_eq!(policy.retry_ceiling, 3);
    }

    #[test]
    fn test_pricing_policy_defaults() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.marketplace_b_multiplier.bps(), 11000);
        assert!(policy
            .high_demand_authors
            .iter()
            .any(|a| a == "Terry Pratchett"));
    }
}

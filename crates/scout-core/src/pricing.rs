//! # Pricing Rules
//!
//! Pure pricing math shared by every resolver tier.
//!
//! ## Profit
//! ```text
//! profit = lowest available price
//!        − assumed purchase cost
//!        − lowest available price × fee rate
//! ```
//! The assumed cost is a display placeholder; callers replace it with the
//! user's real cost once known (see [`calculate_profit`]).
//!
//! ## Estimate
//! The heuristic tier has no data at all, so it starts from a reference
//! price and nudges it by curated author/publisher lists plus a bounded
//! jitter. The jitter value is drawn by the caller; this module stays
//! deterministic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::policy::PricingPolicy;
use crate::types::{
    BookMetadata, BookStatus, Confidence, PriceCacheEntry, PriceSource, QuoteSource, Rate,
};

/// Profit within this distance of zero counts as break-even.
pub const BREAK_EVEN_BAND: Money = Money::from_cents(50);

// =============================================================================
// Profit and Status
// =============================================================================

/// Profit after purchase cost and marketplace fee.
pub fn calculate_profit(sale_price: Money, cost: Money, fee_rate: Rate) -> Money {
    sale_price - cost - sale_price.portion(fee_rate)
}

/// Profit for a pair of marketplace prices, or `None` when neither is known.
pub fn profit_for(
    ebay_price: Option<Money>,
    amazon_price: Option<Money>,
    cost: Money,
    fee_rate: Rate,
) -> Option<Money> {
    Money::lowest(ebay_price, amazon_price).map(|lowest| calculate_profit(lowest, cost, fee_rate))
}

/// Buy decision for a profit figure.
pub fn derive_status(profit: Option<Money>) -> BookStatus {
    match profit {
        None => BookStatus::Pending,
        Some(p) if p > BREAK_EVEN_BAND => BookStatus::Profitable,
        Some(p) if p < Money::zero() - BREAK_EVEN_BAND => BookStatus::Loss,
        Some(_) => BookStatus::BreakEven,
    }
}

// =============================================================================
// Heuristic Estimate
// =============================================================================

/// Case-insensitive substring match against a curated list.
///
/// "Terry Pratchett & Neil Gaiman" matches either author.
pub fn matches_curated(value: Option<&str>, curated: &[String]) -> bool {
    let Some(value) = value else {
        return false;
    };
    let value = value.to_lowercase();
    curated
        .iter()
        .any(|entry| !entry.is_empty() && value.contains(&entry.to_lowercase()))
}

/// Output of the heuristic estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceEstimate {
    /// Marketplace A (eBay).
    pub ebay_price: Money,
    /// Marketplace B (Amazon), derived from A.
    pub amazon_price: Money,
    pub author_matched: bool,
    pub publisher_matched: bool,
}

/// Computes the synthetic price pair.
///
/// `jitter_bps` is clamped to `±policy.jitter`.
///
/// ## Example
/// ```rust
/// use scout_core::policy::PricingPolicy;
/// use scout_core::pricing::estimate_prices;
/// use scout_core::types::BookMetadata;
///
/// let policy = PricingPolicy::default();
/// let estimate = estimate_prices(&BookMetadata::default(), &policy, 0);
/// assert_eq!(estimate.ebay_price, policy.base_price);
/// ```
pub fn estimate_prices(meta: &BookMetadata, policy: &PricingPolicy, jitter_bps: i64) -> PriceEstimate {
    let mut price = policy.base_price;

    let author_matched = matches_curated(meta.author.as_deref(), &policy.high_demand_authors);
    if author_matched {
        price += price.portion(policy.author_markup);
    }

    let publisher_matched = matches_curated(meta.publisher.as_deref(), &policy.premium_publishers);
    if publisher_matched {
        price += policy.publisher_increment;
    }

    let bound = policy.jitter.bps() as i64;
    price = price.adjust_bps(jitter_bps.clamp(-bound, bound));

    let ebay_price = price.max(Money::from_cents(1));
    PriceEstimate {
        ebay_price,
        amazon_price: ebay_price.scale(policy.marketplace_b_multiplier),
        author_matched,
        publisher_matched,
    }
}

// =============================================================================
// Price Quote
// =============================================================================

/// What the resolver hands back for every lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    pub isbn: String,
    pub ebay_price: Option<Money>,
    pub amazon_price: Option<Money>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub source: QuoteSource,
    pub confidence: Confidence,
    /// Set for local cache hits only.
    pub cache_age_hours: Option<f64>,
    /// Origin of the cached numbers behind a local cache hit.
    pub cached_source: Option<PriceSource>,
    /// Profit against `assumed_cost`; `None` when no price is known.
    pub profit: Option<Money>,
    pub assumed_cost: Money,
}

impl PriceQuote {
    /// Builds a quote and derives its profit from the policy.
    pub fn new(
        isbn: impl Into<String>,
        ebay_price: Option<Money>,
        amazon_price: Option<Money>,
        meta: BookMetadata,
        source: QuoteSource,
        confidence: Confidence,
        policy: &PricingPolicy,
    ) -> Self {
        PriceQuote {
            isbn: isbn.into(),
            ebay_price,
            amazon_price,
            title: meta.title,
            author: meta.author,
            publisher: meta.publisher,
            source,
            confidence,
            cache_age_hours: None,
            cached_source: None,
            profit: profit_for(ebay_price, amazon_price, policy.assumed_cost, policy.fee_rate),
            assumed_cost: policy.assumed_cost,
        }
    }

    /// Lowest of the two marketplace prices.
    pub fn lowest_price(&self) -> Option<Money> {
        Money::lowest(self.ebay_price, self.amazon_price)
    }

    /// Profit against a real purchase cost instead of the assumed one.
    pub fn profit_with_cost(&self, cost: Money, fee_rate: Rate) -> Option<Money> {
        profit_for(self.ebay_price, self.amazon_price, cost, fee_rate)
    }

    /// Cache entry that lets tier 1 answer the next lookup.
    pub fn to_cache_entry(&self, source: PriceSource, cached_at: DateTime<Utc>) -> PriceCacheEntry {
        PriceCacheEntry {
            isbn: self.isbn.clone(),
            ebay_price: self.ebay_price,
            amazon_price: self.amazon_price,
            title: self.title.clone(),
            author: self.author.clone(),
            publisher: self.publisher.clone(),
            source,
            cached_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_formula() {
        // $20.00 - $2.00 - 15% of $20.00 ($3.00) = $15.00
        let profit = calculate_profit(
            Money::from_cents(2000),
            Money::from_cents(200),
            Rate::from_bps(1500),
        );
        assert_eq!(profit.cents(), 1500);
    }

    #[test]
    fn test_profit_uses_lowest_price() {
        let profit = profit_for(
            Some(Money::from_cents(1000)),
            Some(Money::from_cents(3000)),
            Money::from_cents(200),
            Rate::from_bps(1500),
        );
        // 1000 - 200 - 150
        assert_eq!(profit, Some(Money::from_cents(650)));
        assert_eq!(
            profit_for(None, None, Money::zero(), Rate::from_bps(1500)),
            None
        );
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(derive_status(None), BookStatus::Pending);
        assert_eq!(derive_status(Some(Money::from_cents(51))), BookStatus::Profitable);
        assert_eq!(derive_status(Some(Money::from_cents(50))), BookStatus::BreakEven);
        assert_eq!(derive_status(Some(Money::from_cents(-50))), BookStatus::BreakEven);
        assert_eq!(derive_status(Some(Money::from_cents(-51))), BookStatus::Loss);
    }

    #[test]
    fn test_curated_match_is_case_insensitive_substring() {
        let list = vec!["Terry Pratchett".to_string()];
        assert!(matches_curated(Some("terry pratchett"), &list));
        assert!(matches_curated(Some("Terry Pratchett & Neil Gaiman"), &list));
        assert!(!matches_curated(Some("Terry Brooks"), &list));
        assert!(!matches_curated(None, &list));
    }

    #[test]
    fn test_estimate_without_matches_is_base_price() {
        let policy = PricingPolicy::default();
        let estimate = estimate_prices(&BookMetadata::default(), &policy, 0);
        assert_eq!(estimate.ebay_price, Money::from_cents(1299));
        assert_eq!(estimate.amazon_price, Money::from_cents(1429));
        assert!(!estimate.author_matched);
    }

    #[test]
    fn test_estimate_author_and_publisher_adjustments() {
        let policy = PricingPolicy::default();
        let meta = BookMetadata {
            title: Some("Small Gods".into()),
            author: Some("Terry Pratchett".into()),
            publisher: Some("The Folio Society".into()),
        };
        let estimate = estimate_prices(&meta, &policy, 0);
        // 1299 + 50% (650) = 1949, + 300 = 2249
        assert_eq!(estimate.ebay_price.cents(), 2249);
        assert!(estimate.author_matched);
        assert!(estimate.publisher_matched);
    }

    #[test]
    fn test_estimate_jitter_is_clamped() {
        let policy = PricingPolicy::default();
        let meta = BookMetadata::default();
        let high = estimate_prices(&meta, &policy, 10_000);
        let capped = estimate_prices(&meta, &policy, 1500);
        assert_eq!(high.ebay_price, capped.ebay_price);

        let low = estimate_prices(&meta, &policy, -1500);
        assert!(low.ebay_price < policy.base_price);
        assert!(capped.ebay_price > policy.base_price);
    }

    #[test]
    fn test_marketplace_b_is_multiple_of_a() {
        let policy = PricingPolicy::default();
        for jitter in [-1500, -700, 0, 300, 1500] {
            let e = estimate_prices(&BookMetadata::with_author("Terry Pratchett"), &policy, jitter);
            let expected = e.ebay_price.cents() as f64 * 1.1;
            assert!((e.amazon_price.cents() as f64 - expected).abs() <= 1.0);
        }
    }

    #[test]
    fn test_quote_profit_and_cache_entry() {
        let policy = PricingPolicy::default();
        let quote = PriceQuote::new(
            "9780140449136",
            Some(Money::from_cents(1000)),
            None,
            BookMetadata::default(),
            QuoteSource::Api,
            Confidence::High,
            &policy,
        );
        assert_eq!(quote.profit, Some(Money::from_cents(650)));
        assert_eq!(
            quote.profit_with_cost(Money::from_cents(500), policy.fee_rate),
            Some(Money::from_cents(350))
        );

        let now = Utc::now();
        let entry = quote.to_cache_entry(PriceSource::Api, now);
        assert_eq!(entry.isbn, "9780140449136");
        assert_eq!(entry.cached_at, now);
    }
}

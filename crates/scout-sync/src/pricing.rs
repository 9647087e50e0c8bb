//! # Pricing Resolver
//!
//! Best-effort price quote for an ISBN, cheapest source first.
//!
//! ## Tier Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        resolve(isbn, metadata)                          │
//! │                                                                         │
//! │   1. LocalCache    valid entry in price_cache     → high, cache age    │
//! │          │ miss                                                         │
//! │   2. ServerCache   POST /pricing/cache-lookup     → server grade       │
//! │          │ miss / offline / transport error         (default medium)   │
//! │   3. LiveQuery     POST /pricing/live-lookup      → high (low if demo) │
//! │          │ miss / offline / transport error                            │
//! │   4. Estimate      heuristic, never fails         → low                │
//! │                                                                         │
//! │   Tiers 2-4 write their result back into the local cache.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order lives in [`TIER_ORDER`]; `resolve` walks it until a tier hits.
//! Nothing here returns an error: storage and transport failures are logged
//! and treated as misses.

use chrono::Utc;
use rand::Rng;
use scout_core::pricing::{estimate_prices, PriceQuote};
use scout_core::types::{BookMetadata, Confidence, PriceSource, QuoteSource};
use scout_core::{CachePolicy, PricingPolicy};
use scout_db::PriceCacheRepository;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::network::NetworkMonitor;
use crate::transport::{PriceLookupRequest, ScoutApi};

// =============================================================================
// Tiers
// =============================================================================

/// One ranked source of pricing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    LocalCache,
    ServerCache,
    LiveQuery,
    Estimate,
}

/// Fallback order, first to last.
pub const TIER_ORDER: [Tier; 4] = [
    Tier::LocalCache,
    Tier::ServerCache,
    Tier::LiveQuery,
    Tier::Estimate,
];

impl Tier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::LocalCache => "local-cache",
            Tier::ServerCache => "server-cache",
            Tier::LiveQuery => "live-query",
            Tier::Estimate => "estimate",
        }
    }

    pub const fn requires_network(&self) -> bool {
        matches!(self, Tier::ServerCache | Tier::LiveQuery)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// The tiered lookup.
///
/// Calls for different ISBNs share no state besides the store, so the
/// resolver can be cloned into concurrent tasks freely.
#[derive(Clone)]
pub struct PricingResolver {
    prices: PriceCacheRepository,
    api: Arc<dyn ScoutApi>,
    network: NetworkMonitor,
    cache_policy: CachePolicy,
    pricing_policy: Arc<PricingPolicy>,
}

impl PricingResolver {
    pub fn new(
        prices: PriceCacheRepository,
        api: Arc<dyn ScoutApi>,
        network: NetworkMonitor,
        cache_policy: CachePolicy,
        pricing_policy: PricingPolicy,
    ) -> Self {
        PricingResolver {
            prices,
            api,
            network,
            cache_policy,
            pricing_policy: Arc::new(pricing_policy),
        }
    }

    pub fn pricing_policy(&self) -> &PricingPolicy {
        &self.pricing_policy
    }

    /// Returns a quote from the first tier that has one.
    pub async fn resolve(&self, isbn: &str, meta: &BookMetadata) -> PriceQuote {
        for tier in TIER_ORDER {
            if tier.requires_network() && !self.network.is_online() {
                debug!(isbn, %tier, "Skipping tier while offline");
                continue;
            }

            let hit = match tier {
                Tier::LocalCache => self.from_local_cache(isbn).await,
                Tier::ServerCache => self.from_server_cache(isbn, meta).await,
                Tier::LiveQuery => self.from_live_query(isbn, meta).await,
                Tier::Estimate => Some(self.from_estimate(isbn, meta).await),
            };

            if let Some(quote) = hit {
                info!(
                    isbn,
                    %tier,
                    confidence = %quote.confidence,
                    ebay = ?quote.ebay_price.map(|m| m.cents()),
                    amazon = ?quote.amazon_price.map(|m| m.cents()),
                    "Price resolved"
                );
                return quote;
            }
        }

        // Estimate always hits; kept for exhaustiveness.
        self.from_estimate(isbn, meta).await
    }

    /// Tier 1.
    async fn from_local_cache(&self, isbn: &str) -> Option<PriceQuote> {
        let now = Utc::now();
        let entry = match self
            .prices
            .get_valid_at(isbn, now, self.cache_policy.price_ttl())
            .await
        {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(isbn, error = %e, "Price cache read failed, treating as miss");
                return None;
            }
        };

        let mut quote = PriceQuote::new(
            isbn,
            entry.ebay_price,
            entry.amazon_price,
            entry.metadata(),
            QuoteSource::Cache,
            Confidence::High,
            &self.pricing_policy,
        );
        quote.cache_age_hours = Some(entry.age_hours(now));
        quote.cached_source = Some(entry.source);
        Some(quote)
    }

    /// Tier 2.
    async fn from_server_cache(&self, isbn: &str, meta: &BookMetadata) -> Option<PriceQuote> {
        let request = PriceLookupRequest::new(isbn, meta);
        let result = match self.api.cache_lookup(&request).await {
            Ok(result) if result.has_prices() => result,
            Ok(_) => {
                debug!(isbn, "Server cache returned no prices");
                return None;
            }
            Err(e) => {
                debug!(isbn, error = %e, "Server cache lookup missed");
                return None;
            }
        };

        let quote = PriceQuote::new(
            isbn,
            result.ebay_price,
            result.amazon_price,
            merge_metadata(result.metadata, meta),
            QuoteSource::ServerCache,
            result.confidence.unwrap_or(Confidence::Medium),
            &self.pricing_policy,
        );
        self.write_back(&quote, PriceSource::Cache).await;
        Some(quote)
    }

    /// Tier 3.
    async fn from_live_query(&self, isbn: &str, meta: &BookMetadata) -> Option<PriceQuote> {
        let result = match self.api.live_lookup(isbn).await {
            Ok(result) if result.has_prices() => result,
            Ok(_) => {
                debug!(isbn, "Live lookup returned no prices");
                return None;
            }
            Err(e) => {
                warn!(isbn, error = %e, "Live lookup failed");
                return None;
            }
        };

        let (source, confidence, cached_as) = if result.demo {
            (QuoteSource::Estimate, Confidence::Low, PriceSource::Estimate)
        } else {
            (QuoteSource::Api, Confidence::High, PriceSource::Api)
        };

        let quote = PriceQuote::new(
            isbn,
            result.ebay_price,
            result.amazon_price,
            merge_metadata(result.metadata, meta),
            source,
            confidence,
            &self.pricing_policy,
        );
        self.write_back(&quote, cached_as).await;
        Some(quote)
    }

    /// Tier 4.
    async fn from_estimate(&self, isbn: &str, meta: &BookMetadata) -> PriceQuote {
        let bound = self.pricing_policy.jitter.bps() as i64;
        let jitter = if bound == 0 {
            0
        } else {
            rand::thread_rng().gen_range(-bound..=bound)
        };

        let estimate = estimate_prices(meta, &self.pricing_policy, jitter);
        debug!(
            isbn,
            jitter_bps = jitter,
            author_matched = estimate.author_matched,
            publisher_matched = estimate.publisher_matched,
            "Computed heuristic estimate"
        );

        let quote = PriceQuote::new(
            isbn,
            Some(estimate.ebay_price),
            Some(estimate.amazon_price),
            meta.clone(),
            QuoteSource::Estimate,
            Confidence::Low,
            &self.pricing_policy,
        );
        self.write_back(&quote, PriceSource::Estimate).await;
        quote
    }

    async fn write_back(&self, quote: &PriceQuote, source: PriceSource) {
        let entry = quote.to_cache_entry(source, Utc::now());
        if let Err(e) = self.prices.put(&entry).await {
            warn!(isbn = %quote.isbn, error = %e, "Failed to cache price");
        }
    }
}

/// Server metadata wins; the caller's fills the gaps.
fn merge_metadata(server: BookMetadata, caller: &BookMetadata) -> BookMetadata {
    BookMetadata {
        title: server.title.or_else(|| caller.title.clone()),
        author: server.author.or_else(|| caller.author.clone()),
        publisher: server.publisher.or_else(|| caller.publisher.clone()),
    }
}

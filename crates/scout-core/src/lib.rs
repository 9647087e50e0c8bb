//! # scout-core: Pure Domain Logic for Shelf Scout
//!
//! The types and rules every other layer shares: what a scanned book looks
//! like, what a cached price quote is, how profit is derived, and how an
//! offline estimate is computed when no data source answers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shelf Scout Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Scanner UI (web / mobile client)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  scout-sync: ScanRecorder, PricingResolver, SyncOrchestrator    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ scout-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Records  │  │   Money   │  │ Estimate  │  │   ISBN    │  │   │
//! │  │   │  Entries  │  │   Rate    │  │  Profit   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             scout-db: SQLite collections + scan queue           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records, cache entries, queue entries and their enums
//! - [`money`] - Integer-cent money and basis-point rates
//! - [`policy`] - Cache lifetimes, retry ceiling, pricing heuristics knobs
//! - [`pricing`] - Profit, status derivation and heuristic estimates
//! - [`validation`] - ISBN normalization and check digits
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use scout_core::money::Money;
//! use scout_core::pricing::calculate_profit;
//! use scout_core::types::Rate;
//!
//! let sale_price = Money::from_cents(1500);
//! let profit = calculate_profit(sale_price, Money::from_cents(200), Rate::from_bps(1500));
//! // $15.00 - $2.00 - 15% fee ($2.25) = $10.75
//! assert_eq!(profit.cents(), 1075);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod policy;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::{CachePolicy, PricingPolicy};
pub use pricing::{PriceEstimate, PriceQuote};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// A cached price quote is only served while younger than this.
pub const DEFAULT_PRICE_TTL_HOURS: u32 = 24;

/// Sweeps delete price entries older than this.
pub const DEFAULT_PRICE_RETENTION_DAYS: u32 = 7;

/// Sweeps delete cached thumbnails older than this.
pub const DEFAULT_IMAGE_RETENTION_DAYS: u32 = 30;

/// Failed resync attempts after which a queued scan is abandoned.
///
/// ## Business Reason
/// A scan that cannot reach the server after a few reconnects is almost
/// always a permanent rejection; retrying forever grows a silent backlog.
pub const DEFAULT_RETRY_CEILING: u32 = 3;

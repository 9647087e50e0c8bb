//! # Money Module
//!
//! Provides the `Money` type for marketplace prices, costs and profit.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Marketplace APIs send prices as JSON numbers:  { "ebayPrice": 12.99 }  │
//! │  12.99 is not representable in binary floating point, and fee math     │
//! │  on top of it drifts by fractions of a cent.                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Wire amounts are rounded to cents ONCE at the transport boundary     │
//! │    (Money::from_wire_amount) and every calculation after that is       │
//! │    integer math with basis-point rates.                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use scout_core::money::Money;
//! use scout_core::types::Rate;
//!
//! let ebay = Money::from_cents(1000);          // $10.00
//! let amazon = ebay.scale(Rate::from_bps(11000)); // × 1.1
//! assert_eq!(amazon.cents(), 1100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Rate;

/// Basis points in one whole (100%).
const BPS_SCALE: i128 = 10_000;

/// Divides rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  PriceCacheEntry.ebay_price / amazon_price ──┐                          │
/// │                                              ├──► lowest available      │
/// │  PriceQuote.ebay_price / amazon_price ───────┘          │               │
/// │                                                         ▼               │
/// │  profit = lowest − assumed cost − lowest × fee rate                     │
/// │                                                         │               │
/// │  ScannedBookRecord.profit ◄─────────────────────────────┘               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use scout_core::money::Money;
    ///
    /// let price = Money::from_cents(1299); // $12.99
    /// assert_eq!(price.cents(), 1299);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount received from the backend into cents.
    ///
    /// Only the transport layer should call this. The amount is rounded to
    /// the nearest cent; non-finite values are rejected.
    ///
    /// ## Example
    /// ```rust
    /// use scout_core::money::Money;
    ///
    /// let price = Money::from_wire_amount("ebayPrice", 12.99).unwrap();
    /// assert_eq!(price.cents(), 1299);
    /// assert!(Money::from_wire_amount("ebayPrice", f64::NAN).is_err());
    /// ```
    pub fn from_wire_amount(field: &str, amount: f64) -> CoreResult<Self> {
        if !amount.is_finite() {
            return Err(CoreError::InvalidAmount {
                field: field.to_string(),
                reason: format!("{} is not a finite number", amount),
            });
        }
        Ok(Money((amount * 100.0).round() as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the given share of this amount (e.g. a marketplace fee).
    ///
    /// ## Example
    /// ```rust
    /// use scout_core::money::Money;
    /// use scout_core::types::Rate;
    ///
    /// let price = Money::from_cents(1000);   // $10.00
    /// let fee = price.portion(Rate::from_bps(1500)); // 15%
    /// assert_eq!(fee.cents(), 150);
    /// ```
    pub fn portion(&self, rate: Rate) -> Money {
        let cents = div_round(self.0 as i128 * rate.bps() as i128, BPS_SCALE);
        Money(cents as i64)
    }

    /// Multiplies by a rate where 10000 bps is 1.0.
    ///
    /// Same math as [`Money::portion`]; named separately so multipliers above
    /// 100% read naturally at call sites.
    #[inline]
    pub fn scale(&self, multiplier: Rate) -> Money {
        self.portion(multiplier)
    }

    /// Moves the amount up or down by a signed number of basis points.
    ///
    /// ## Example
    /// ```rust
    /// use scout_core::money::Money;
    ///
    /// let base = Money::from_cents(1000);
    /// assert_eq!(base.adjust_bps(1500).cents(), 1150);  // +15%
    /// assert_eq!(base.adjust_bps(-1500).cents(), 850);  // -15%
    /// ```
    pub fn adjust_bps(&self, bps: i64) -> Money {
        let delta = div_round(self.0 as i128 * bps as i128, BPS_SCALE);
        Money(self.0 + delta as i64)
    }

    /// Returns the smaller of two optional prices, ignoring missing ones.
    pub fn lowest(a: Option<Money>, b: Option<Money>) -> Option<Money> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_wire_amount_rounds_to_cents() {
        assert_eq!(Money::from_wire_amount("p", 12.99).unwrap().cents(), 1299);
        assert_eq!(Money::from_wire_amount("p", 0.005).unwrap().cents(), 1);
        assert_eq!(Money::from_wire_amount("p", 7.0).unwrap().cents(), 700);
        assert!(Money::from_wire_amount("p", f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_portion_rounds_half_away_from_zero() {
        // $10.05 × 15% = 150.75¢ → 151¢
        assert_eq!(Money::from_cents(1005).portion(Rate::from_bps(1500)).cents(), 151);
        // -$10.05 × 15% = -150.75¢ → -151¢
        assert_eq!(Money::from_cents(-1005).portion(Rate::from_bps(1500)).cents(), -151);
    }

    #[test]
    fn test_scale_above_one() {
        let ebay = Money::from_cents(1299);
        // 1299 × 1.1 = 1428.9 → 1429
        assert_eq!(ebay.scale(Rate::from_bps(11000)).cents(), 1429);
    }

    #[test]
    fn test_adjust_bps_signed() {
        let base = Money::from_cents(2000);
        assert_eq!(base.adjust_bps(0).cents(), 2000);
        assert_eq!(base.adjust_bps(500).cents(), 2100);
        assert_eq!(base.adjust_bps(-500).cents(), 1900);
    }

    #[test]
    fn test_lowest() {
        let a = Some(Money::from_cents(900));
        let b = Some(Money::from_cents(1200));
        assert_eq!(Money::lowest(a, b), a);
        assert_eq!(Money::lowest(None, b), b);
        assert_eq!(Money::lowest(a, None), a);
        assert_eq!(Money::lowest(None, None), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}

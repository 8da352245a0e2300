//! # Money Module
//!
//! Provides the `Money` type: a signed amount in the store's minor currency
//! unit (cents for USD, pence for GBP, yen for JPY).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A cart of 3 × $19.99 with 15% off must price identically on every     │
//! │  request, on every server, or the storefront and the order disagree.   │
//! │                                                                         │
//! │  OUR SOLUTION: integer minor units, rounding only at one place         │
//! │    (percentage), half-up to the nearest minor unit.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quickshop_core::money::Money;
//!
//! let price = Money::from_minor(1999);
//! let line = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(line.minor(), 5997);
//!
//! // 15% of $59.97 = $8.9955 → $9.00
//! assert_eq!(line.percentage(1500).minor(), 900);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price ──► × quantity ──► line total ──► subtotal
///                                                          │
///                      discount (≤ subtotal) ◄─────────────┤
///                                                          ▼
///                      shipping ───────────────────────► total (≥ 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use quickshop_core::money::Money;
    ///
    /// let price = Money::from_minor(1099); // $10.99
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ```rust
    /// use quickshop_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(299).checked_mul_quantity(3), Some(Money::from_minor(897)));
    /// assert_eq!(Money::from_minor(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount × bps + 5000) / 10000`.
    /// The +5000 rounds the half-unit up.
    ///
    /// ```rust
    /// use quickshop_core::money::Money;
    ///
    /// // 10% of $100.00
    /// assert_eq!(Money::from_minor(10_000).percentage(1000).minor(), 1000);
    /// // 8.25% of $10.00 = 82.5 → 83
    /// assert_eq!(Money::from_minor(1000).percentage(825).minor(), 83);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let half = (BPS_SCALE / 2) as i128;
        let scaled = (self.0 as i128 * bps as i128 + half) / BPS_SCALE as i128;
        Money(scaled as i64)
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Clamps negative amounts to zero.
    ///
    /// ```rust
    /// use quickshop_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(-40).non_negative(), Money::zero());
    /// assert_eq!(Money::from_minor(40).non_negative().minor(), 40);
    /// ```
    #[inline]
    pub fn non_negative(self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering with two decimal places.
///
/// The storefront formats amounts with the store's currency and locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

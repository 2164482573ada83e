//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cart line keeps its total, and merging re-derives the unit price    │
//! │  as total / quantity. With floats that drifts on every merge.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    total 150 cents, qty 3 → unit 50 cents, exact                       │
//! │    rescaling is done in i128 and rounded once                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use feast_core::money::Money;
//!
//! let price = Money::from_cents(5000); // 50.00
//! let line = price.checked_multiply_quantity(2);
//! assert_eq!(line, Some(Money::from_cents(10000)));
//!
//! // A line total of 100.00 for 2 units, rescaled to 3 units
//! assert_eq!(
//!     Money::from_cents(10000).checked_rescale(2, 3),
//!     Some(Money::from_cents(15000))
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// MenuItem.price ──► CartCandidate.total ──► CartLine.total ──► Cart.total_amount
///                                                                   │
/// RiderWork.estimated_fee                      OrderReceipt.total ◄─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use feast_core::money::Money;
    ///
    /// let fee = Money::from_cents(1099);
    /// assert_eq!(fee.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Multiplies a unit price by a quantity.
    ///
    /// Returns `None` if the product does not fit in an `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use feast_core::money::Money;
    ///
    /// let unit = Money::from_cents(299);
    /// assert_eq!(unit.checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: u32) -> Option<Self> {
        match self.0.checked_mul(qty as i64) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Rescales a line total priced for `from_qty` units to `to_qty` units.
    ///
    /// Equivalent to `(self / from_qty) × to_qty` but computed as
    /// `self × to_qty / from_qty` in i128 so the unit price is never
    /// truncated first. The single division rounds half away from zero.
    ///
    /// A `from_qty` of zero has no unit price to infer and yields zero.
    /// Returns `None` if the rescaled total does not fit in an `i64`.
    ///
    /// ## Example
    /// ```rust
    /// use feast_core::money::Money;
    ///
    /// // 10.00 for 3 units, rescaled to 6 units
    /// assert_eq!(Money::from_cents(1000).checked_rescale(3, 6), Some(Money::from_cents(2000)));
    /// // 10.00 for 3 units, rescaled to 4 units: 1333.33 → 1333
    /// assert_eq!(Money::from_cents(1000).checked_rescale(3, 4), Some(Money::from_cents(1333)));
    /// ```
    pub fn checked_rescale(&self, from_qty: u32, to_qty: u32) -> Option<Money> {
        if from_qty == 0 {
            return Some(Money::zero());
        }

        let numerator = self.0 as i128 * to_qty as i128;
        let denominator = from_qty as i128;
        let half = denominator / 2;

        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };

        i64::try_from(rounded).ok().map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display. Pages format money themselves for localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

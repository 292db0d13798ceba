//! # Money Module
//!
//! Provides the `Money` and `Rate` types for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In a split-bill system:                                                │
//! │    215,000 / 3 = 71,666.67 → three guests pay 71,667 = 215,001         │
//! │    One rupiah was invented out of thin air.                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    215,000 / 3 = 71,666 each for splits 1..N-1                         │
//! │    The LAST split absorbs the remainder: 71,668                        │
//! │    71,666 + 71,666 + 71,668 = 215,000 exactly                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nox_core::money::{Money, Rate};
//!
//! // Create from minor units (there is no float constructor)
//! let subtotal = Money::from_minor(215_000);
//!
//! // Percentage math stays on integers
//! let tax = subtotal.apply_rate(Rate::from_percent(10));
//! assert_eq!(tax.minor(), 21_500);
//!
//! // Splitting conserves every minor unit
//! let shares = subtotal.split_even(3);
//! assert_eq!(shares, vec![Money::from_minor(71_666),
//!                         Money::from_minor(71_666),
//!                         Money::from_minor(71_668)]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (rupiah for IDR).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and corrections
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary value in the billing engine flows through this type:
/// item prices, line values, subtotals, tax, service charge, discounts,
/// deposit credits, tips, and invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use nox_core::money::Money;
    ///
    /// let price = Money::from_minor(85_000);
    /// assert_eq!(price.minor(), 85_000);
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

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use nox_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(85_000); // one Mojito
    /// let line_value = unit_price.multiply_quantity(2);
    /// assert_eq!(line_value.minor(), 170_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage rate, rounding half-up on integers.
    ///
    /// ## Implementation
    /// Integer math only: `(amount * bps + 5000) / 10000`.
    /// Uses i128 internally to prevent overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use nox_core::money::{Money, Rate};
    ///
    /// let subtotal = Money::from_minor(215_000);
    /// let service = subtotal.apply_rate(Rate::from_percent(5));
    /// assert_eq!(service.minor(), 10_750);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let amount = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_minor(amount as i64)
    }

    /// Splits the amount into `n` shares with exact conservation.
    ///
    /// ## The Remainder Rule
    /// Shares 1..n-1 each receive `floor(amount / n)`; the LAST share
    /// absorbs the entire remainder, so the shares always sum back to
    /// the original amount with no lost or duplicated minor units.
    ///
    /// ## Example
    /// ```rust
    /// use nox_core::money::Money;
    ///
    /// let shares = Money::from_minor(215_000).split_even(3);
    /// assert_eq!(shares.iter().map(|m| m.minor()).sum::<i64>(), 215_000);
    /// assert_eq!(shares[2].minor(), 71_668);
    /// ```
    ///
    /// ## Panics
    /// Panics if `n == 0`. Callers validate `n >= 2` before splitting;
    /// `n == 1` is allowed and returns the amount unchanged.
    pub fn split_even(&self, n: u32) -> Vec<Money> {
        assert!(n > 0, "split count must be at least 1");
        let n64 = n as i64;
        // Euclidean division keeps the floor semantics for negative
        // amounts (corrections) as well as positive ones.
        let base = self.0.div_euclid(n64);
        let last = self.0 - base * (n64 - 1);
        let mut shares = vec![Money(base); (n - 1) as usize];
        shares.push(Money(last));
        shares
    }
}

// =============================================================================
// Rate Type
// =============================================================================

/// A percentage rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (Jakarta restaurant tax)
/// 500 bps = 5% (typical service charge)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage (10 → 10%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Use frontend formatting for actual
/// UI display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp{}", sign, group_thousands(self.0.unsigned_abs()))
    }
}

/// Groups digits with dots, Indonesian style: 215000 → "215.000".
fn group_thousands(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut parts = Vec::new();
    while value > 0 {
        parts.push((value % 1000, value >= 1000));
        value /= 1000;
    }
    parts
        .iter()
        .rev()
        .map(|(part, padded)| {
            if *padded {
                format!("{:03}", part)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
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
    fn test_from_minor() {
        let money = Money::from_minor(85_000);
        assert_eq!(money.minor(), 85_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_minor(215_000)), "Rp215.000");
        assert_eq!(format!("{}", Money::from_minor(1_500_000)), "Rp1.500.000");
        assert_eq!(format!("{}", Money::from_minor(950)), "Rp950");
        assert_eq!(format!("{}", Money::from_minor(-85_000)), "-Rp85.000");
        assert_eq!(format!("{}", Money::zero()), "Rp0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(100_000);
        let b = Money::from_minor(45_000);

        assert_eq!((a + b).minor(), 145_000);
        assert_eq!((a - b).minor(), 55_000);
        assert_eq!((a * 3).minor(), 300_000);
        assert_eq!(a.multiply_quantity(2).minor(), 200_000);
    }

    #[test]
    fn test_rate_construction() {
        assert_eq!(Rate::from_percent(10).bps(), 1000);
        assert_eq!(Rate::from_bps(550).bps(), 550);
        assert!(Rate::zero().is_zero());
    }

    #[test]
    fn test_apply_rate_exact() {
        // 215,000 at 10% = 21,500 and at 5% = 10,750 with no rounding
        let subtotal = Money::from_minor(215_000);
        assert_eq!(subtotal.apply_rate(Rate::from_percent(10)).minor(), 21_500);
        assert_eq!(subtotal.apply_rate(Rate::from_percent(5)).minor(), 10_750);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // 1,005 at 11% = 110.55 → 111
        let amount = Money::from_minor(1_005);
        assert_eq!(amount.apply_rate(Rate::from_bps(1100)).minor(), 111);

        // 1,004 at 11% = 110.44 → 110
        let amount = Money::from_minor(1_004);
        assert_eq!(amount.apply_rate(Rate::from_bps(1100)).minor(), 110);
    }

    #[test]
    fn test_split_even_divisible() {
        let shares = Money::from_minor(300_000).split_even(3);
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|m| m.minor() == 100_000));
    }

    #[test]
    fn test_split_even_remainder_goes_last() {
        let shares = Money::from_minor(215_000).split_even(3);
        assert_eq!(shares[0].minor(), 71_666);
        assert_eq!(shares[1].minor(), 71_666);
        assert_eq!(shares[2].minor(), 71_668);
        assert_eq!(shares.iter().map(|m| m.minor()).sum::<i64>(), 215_000);
    }

    #[test]
    fn test_split_even_single_share() {
        let shares = Money::from_minor(99_999).split_even(1);
        assert_eq!(shares, vec![Money::from_minor(99_999)]);
    }

    #[test]
    fn test_split_even_zero_amount() {
        let shares = Money::zero().split_even(4);
        assert!(shares.iter().all(|m| m.is_zero()));
    }
}

//! # Money Module
//!
//! Provides the `Money` type for invoice amounts and the `TaxRate` type for
//! the two statutory rates.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With binary floats:                                                    │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  An invoice paid in three instalments drifts away from its total and   │
//! │  the paid/partial status flips on a rounding artefact.                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1149.75 is stored as 114975, every sum is exact                     │
//! │    Rounding happens only where taxes are computed                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ledger_core::money::Money;
//!
//! let subtotal: Money = "1000.00".parse().unwrap();
//! assert_eq!(subtotal.cents(), 100_000);
//!
//! let total = subtotal + Money::from_cents(14_975);
//! assert_eq!(total.to_string(), "$1149.75");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `total - amount_paid` stay in
///   the same type; negative amounts are rejected by validation, not by
///   the type
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Invoice.subtotal ──► tax::compute ──► gst + qst ──► Invoice.total     │
/// │                                                           │             │
/// │  Payment.amount ──► Invoice.amount_paid ──► balance = total - paid     │
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
    /// use ledger_core::money::Money;
    ///
    /// let amount = Money::from_cents(114_975); // 1149.75
    /// assert_eq!(amount.cents(), 114_975);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion (truncated toward zero).
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
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

    /// Applies a tax rate and rounds the result to the cent.
    ///
    /// ## Rounding: Half Up
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  cents × pcm / 100000, ties rounded away from zero                  │
    /// │                                                                     │
    /// │    0.10 × 9.975% = 0.009975   → 0.01                                │
    /// │    0.50 × 9.975% = 0.049875   → 0.05                                │
    /// │    0.10 × 5.000% = 0.005      → 0.01   (tie goes up)                │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// i128 intermediate prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::{Money, TaxRate};
    ///
    /// let subtotal = Money::from_cents(100_000); // 1000.00
    /// let qst = subtotal.apply_rate(TaxRate::from_pcm(9_975));
    /// assert_eq!(qst.cents(), 9_975); // 99.75
    /// ```
    pub fn apply_rate(&self, rate: TaxRate) -> Money {
        let scaled = self.0 as i128 * rate.pcm() as i128;
        let half = (TaxRate::SCALE / 2) as i128;
        let rounded = if scaled >= 0 {
            (scaled + half) / TaxRate::SCALE as i128
        } else {
            (scaled - half) / TaxRate::SCALE as i128
        };
        Money::from_cents(rounded as i64)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering; the admin frontend does its own localisation.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

/// Parses decimal text with at most two fractional digits.
///
/// Accepted: `"1149.75"`, `"12"`, `"0.5"`, `"-3.10"`. Rejected: `"1.005"`,
/// `"12,50"`, `""`.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("must be a decimal number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a decimal number"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("too large"))?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("must be a decimal number"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("must be a decimal number"))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(|| invalid("too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
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

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in pcm (per cent mille, 1/100000).
///
/// ## Why pcm and not basis points?
/// The provincial rate is 9.975 %, which is 997.5 bps. One pcm is
/// 0.001 %, so both statutory rates are exact integers:
/// 5.000 % = 5000 pcm, 9.975 % = 9975 pcm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// pcm in 100 %.
    pub const SCALE: u32 = 100_000;

    /// Creates a tax rate from pcm.
    #[inline]
    pub const fn from_pcm(pcm: u32) -> Self {
        TaxRate(pcm)
    }

    /// Returns the rate in pcm.
    #[inline]
    pub const fn pcm(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Invoice Numbering
//!
//! Formatting and parsing of `PREFIX-YYYYMM-NNNN` invoice numbers.
//!
//! ## Number Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   FE - 202501 - 0007                                                    │
//! │   ──   ──────   ────                                                    │
//! │   │    │        └── sequence within the month, zero-padded to 4,       │
//! │   │    │            grows to 5+ digits after 9999 (never wraps)        │
//! │   │    └── issue year and month                                        │
//! │   └── series prefix (configurable)                                     │
//! │                                                                         │
//! │   "FE-202501-" is the SERIES: one counter per series                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Allocation itself (the atomic counter) lives in ledger-db; this module only
//! knows how to build, read and reconcile numbers.

use chrono::{Datelike, NaiveDate};

/// Year-month key of a date, e.g. `"202501"`.
pub fn period_of(date: NaiveDate) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Series prefix for a date, e.g. `"FE-202501-"`.
pub fn series_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}-", prefix, period_of(date))
}

/// Formats a sequence value within a series.
///
/// ## Example
/// ```rust
/// use ledger_core::numbering::format_number;
///
/// assert_eq!(format_number("FE-202501-", 7), "FE-202501-0007");
/// assert_eq!(format_number("FE-202501-", 10_000), "FE-202501-10000");
/// ```
pub fn format_number(series: &str, sequence: i64) -> String {
    format!("{}{:04}", series, sequence)
}

/// Extracts the sequence from a number of the given series.
///
/// Returns `None` for numbers of another series or with a non-numeric
/// suffix.
pub fn parse_sequence(number: &str, series: &str) -> Option<i64> {
    let suffix = number.strip_prefix(series)?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Reconciles the counter with the highest number already issued.
///
/// The counter may lag behind numbers issued before it existed (imported
/// data, manual fixes); the next number is always above both.
///
/// ## Example
/// ```rust
/// use ledger_core::numbering::next_sequence;
///
/// // Counter says 1, but FE-202501-0007 already exists
/// assert_eq!(next_sequence(1, Some("FE-202501-0007"), "FE-202501-"), 8);
/// // Counter ahead of the table (a rolled-back insert left a gap)
/// assert_eq!(next_sequence(5, Some("FE-202501-0003"), "FE-202501-"), 5);
/// ```
pub fn next_sequence(counter: i64, last_issued: Option<&str>, series: &str) -> i64 {
    let after_last = last_issued
        .and_then(|n| parse_sequence(n, series))
        .map(|seq| seq + 1)
        .unwrap_or(1);
    counter.max(after_last).max(1)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Tax Calculator
//!
//! Splits an invoice subtotal into the two statutory taxes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal 1000.00                                                       │
//! │     ├── GST  5.000 %  →   50.00   (rounded to the cent, half up)       │
//! │     ├── QST  9.975 %  →   99.75   (rounded to the cent, half up)       │
//! │     └── total          → 1149.75  (sum of the ROUNDED parts)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both taxes are computed on the subtotal; QST is not compounded on GST.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};

/// Federal goods and services tax, 5 %.
pub const GST_RATE: TaxRate = TaxRate::from_pcm(5_000);

/// Provincial sales tax, 9.975 %.
pub const QST_RATE: TaxRate = TaxRate::from_pcm(9_975);

/// Amounts of an invoice after taxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub subtotal: Money,
    pub gst: Money,
    pub qst: Money,
    pub total: Money,
}

/// Computes the breakdown at the statutory rates.
///
/// ## Errors
/// `InvalidAmount` for a negative subtotal, or one so large the total
/// no longer fits.
pub fn compute(subtotal: Money) -> CoreResult<TaxBreakdown> {
    compute_with(subtotal, GST_RATE, QST_RATE)
}

/// Computes the breakdown at explicit rates.
pub fn compute_with(subtotal: Money, gst_rate: TaxRate, qst_rate: TaxRate) -> CoreResult<TaxBreakdown> {
    if subtotal.is_negative() {
        return Err(CoreError::invalid_amount(format!(
            "subtotal {} is negative",
            subtotal
        )));
    }

    let gst = subtotal.apply_rate(gst_rate);
    let qst = subtotal.apply_rate(qst_rate);
    let total = subtotal
        .checked_add(gst)
        .and_then(|t| t.checked_add(qst))
        .ok_or_else(|| CoreError::invalid_amount(format!("subtotal {} is too large", subtotal)))?;

    Ok(TaxBreakdown {
        subtotal,
        gst,
        qst,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

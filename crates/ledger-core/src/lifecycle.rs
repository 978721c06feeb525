//! # Invoice Lifecycle Rules
//!
//! Pure decisions behind every mutating ledger operation. The database layer
//! loads the invoice inside its transaction, asks this module what the new
//! state is, and writes it back.
//!
//! ```text
//! ┌────────────────┬──────────────────────────────────────────────────────┐
//! │ operation      │ rule                                                 │
//! ├────────────────┼──────────────────────────────────────────────────────┤
//! │ update         │ [`apply_changes`]: retax, keep paid, status last     │
//! │ send           │ [`send`]: draft → sent only                          │
//! │ cancel         │ [`cancel`]: via the manual transition graph          │
//! │ delete         │ [`ensure_deletable`]: never while paid               │
//! │ add payment    │ [`plan_payment`]: positive, within balance           │
//! │ reverse        │ [`plan_reversal`]: exact undo, status re-derived     │
//! └────────────────┴──────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::status::{self, InvoiceStatus};
use crate::tax;
use crate::types::{Invoice, InvoiceChanges};

/// New payment figures for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub amount_paid: Money,
    pub status: InvoiceStatus,
    pub paid_date: Option<NaiveDate>,
}

impl BalanceChange {
    /// Copies the figures onto the invoice.
    pub fn apply_to(&self, invoice: &mut Invoice) {
        invoice.amount_paid_cents = self.amount_paid.cents();
        invoice.status = self.status;
        invoice.paid_date = self.paid_date;
    }
}

// =============================================================================
// Edits
// =============================================================================

/// Applies a partial update in place.
///
/// ## Order
/// 1. Subtotal: taxes recomputed, `amount_paid` kept, status re-derived.
///    A total below `amount_paid` is refused.
/// 2. Description and due date.
/// 3. Explicit status, checked against the amounts from step 1.
///
/// On error the invoice may be partially modified; callers discard it.
pub fn apply_changes(invoice: &mut Invoice, changes: &InvoiceChanges, today: NaiveDate) -> CoreResult<()> {
    if let Some(subtotal) = changes.subtotal {
        let breakdown = tax::compute(subtotal)?;
        if breakdown.total < invoice.amount_paid() {
            return Err(CoreError::invalid_amount(format!(
                "new total {} is below the {} already paid",
                breakdown.total,
                invoice.amount_paid()
            )));
        }
        invoice.set_breakdown(&breakdown);

        let settled = status::settle(
            invoice.amount_paid(),
            invoice.total(),
            invoice.status,
            invoice.paid_date,
            today,
        );
        invoice.status = settled.status;
        invoice.paid_date = settled.paid_date;
    }

    if let Some(description) = &changes.description {
        let description = description.trim();
        invoice.description = if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        };
    }

    if let Some(due_date) = changes.due_date {
        invoice.due_date = due_date;
    }

    if let Some(target) = changes.status {
        let settled = status::transition(
            invoice.status,
            target,
            invoice.amount_paid(),
            invoice.total(),
            invoice.paid_date,
            today,
        )?;
        invoice.status = settled.status;
        invoice.paid_date = settled.paid_date;
    }

    Ok(())
}

/// Marks a draft as sent.
///
/// Only drafts can be sent; anything else is `InvalidTransition`, including
/// an invoice that is already `sent`.
pub fn send(invoice: &mut Invoice) -> CoreResult<()> {
    if invoice.status != InvoiceStatus::Draft {
        return Err(CoreError::InvalidTransition {
            from: invoice.status,
            to: InvoiceStatus::Sent,
        });
    }
    invoice.status = InvoiceStatus::Sent;
    Ok(())
}

/// Voids an invoice. Paid invoices cannot be cancelled.
pub fn cancel(invoice: &mut Invoice, today: NaiveDate) -> CoreResult<()> {
    let settled = status::transition(
        invoice.status,
        InvoiceStatus::Cancelled,
        invoice.amount_paid(),
        invoice.total(),
        invoice.paid_date,
        today,
    )?;
    invoice.status = settled.status;
    invoice.paid_date = settled.paid_date;
    Ok(())
}

/// Refuses deletion of paid invoices.
pub fn ensure_deletable(invoice: &Invoice) -> CoreResult<()> {
    if invoice.status == InvoiceStatus::Paid {
        return Err(CoreError::DeleteBlocked {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.status,
        });
    }
    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

/// Effect of recording `amount` against the invoice.
///
/// ## Errors
/// - `InvalidAmount`: amount is zero or negative
/// - `InvalidTransition`: invoice is cancelled
/// - `OverpaymentRejected`: amount exceeds the balance (never clamped)
pub fn plan_payment(invoice: &Invoice, amount: Money, today: NaiveDate) -> CoreResult<BalanceChange> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "payment amount {} must be positive",
            amount
        )));
    }

    let balance = invoice.balance();

    if invoice.status == InvoiceStatus::Cancelled {
        return Err(CoreError::InvalidTransition {
            from: InvoiceStatus::Cancelled,
            to: if amount >= balance {
                InvoiceStatus::Paid
            } else {
                InvoiceStatus::Partial
            },
        });
    }

    if amount > balance {
        return Err(CoreError::OverpaymentRejected { amount, balance });
    }

    // Bounded by total once the balance check passed
    let amount_paid = invoice.amount_paid() + amount;

    let settled = status::settle(
        amount_paid,
        invoice.total(),
        invoice.status,
        invoice.paid_date,
        today,
    );

    Ok(BalanceChange {
        amount_paid,
        status: settled.status,
        paid_date: settled.paid_date,
    })
}

/// Effect of removing a payment of `amount` from the invoice.
///
/// Exact inverse of [`plan_payment`] on the amount; status is re-derived,
/// so a paid invoice drops to `partial` (or `sent` when nothing is left,
/// even from `overdue`) and loses its paid date. Cancelled invoices stay cancelled.
pub fn plan_reversal(invoice: &Invoice, amount: Money, today: NaiveDate) -> CoreResult<BalanceChange> {
    let amount_paid = invoice.amount_paid() - amount;
    if amount_paid.is_negative() {
        return Err(CoreError::invalid_amount(format!(
            "reversing {} would leave {} paid on {}",
            amount, amount_paid, invoice.invoice_number
        )));
    }

    let settled = status::settle_reversal(
        amount_paid,
        invoice.total(),
        invoice.status,
        invoice.paid_date,
        today,
    );

    Ok(BalanceChange {
        amount_paid,
        status: settled.status,
        paid_date: settled.paid_date,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

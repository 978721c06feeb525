//! # Domain Types
//!
//! Invoices, payments and the request types that create or change them.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │      Invoice        │ 1    * │      Payment        │                │
//! │  │  ─────────────────  │◄───────│  ─────────────────  │                │
//! │  │  id (surrogate)     │        │  id                 │                │
//! │  │  invoice_number     │        │  invoice_id (FK,    │                │
//! │  │  student_id         │        │    cascade)         │                │
//! │  │  session_id?        │        │  amount_cents > 0   │                │
//! │  │  subtotal/gst/qst/  │        │  method, reference  │                │
//! │  │    total_cents      │        └─────────────────────┘                │
//! │  │  amount_paid_cents  │                                               │
//! │  │  status             │   Σ payment.amount == invoice.amount_paid     │
//! │  └─────────────────────┘                                               │
//! │                                                                         │
//! │  Requests: CreateInvoice, InvoiceChanges, RecordPayment                │
//! │  Reports:  BillingStats                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: integer surrogate, used for relations and API paths
//! - `invoice_number`: human-readable, immutable once issued

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::status::InvoiceStatus;
use crate::tax::TaxBreakdown;

// =============================================================================
// Invoice
// =============================================================================

/// A billed amount owed by a student.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: i64,

    /// `PREFIX-YYYYMM-NNNN`, unique.
    pub invoice_number: String,

    pub student_id: i64,

    /// Cleared when the session is removed.
    pub session_id: Option<i64>,

    pub subtotal_cents: i64,
    pub gst_cents: i64,
    pub qst_cents: i64,

    /// subtotal + gst + qst.
    pub total_cents: i64,

    /// Only ever changed by recording or reversing payments.
    pub amount_paid_cents: i64,

    pub status: InvoiceStatus,

    #[ts(as = "String")]
    pub issue_date: NaiveDate,

    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,

    #[ts(as = "Option<String>")]
    pub paid_date: Option<NaiveDate>,

    pub description: Option<String>,

    /// Method of the most recent payment.
    pub payment_method: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Amount still owed: `total - amount_paid`.
    #[inline]
    pub fn balance(&self) -> Money {
        self.total() - self.amount_paid()
    }

    /// Overwrites the stored amounts with a new breakdown.
    pub fn set_breakdown(&mut self, breakdown: &TaxBreakdown) {
        self.subtotal_cents = breakdown.subtotal.cents();
        self.gst_cents = breakdown.gst.cents();
        self.qst_cents = breakdown.qst.cents();
        self.total_cents = breakdown.total.cents();
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A sum of money received against one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,

    /// Always positive.
    pub amount_cents: i64,

    #[ts(as = "String")]
    pub payment_date: NaiveDate,

    /// Free text; see [`crate::PAYMENT_METHODS`] for the usual values.
    pub method: String,

    /// Cheque number, transfer id, ...
    pub reference: Option<String>,

    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Input for creating an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateInvoice {
    pub student_id: i64,
    #[serde(default)]
    pub session_id: Option<i64>,
    pub subtotal: Money,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

/// Partial update of an invoice; absent fields are left alone.
///
/// `due_date` distinguishes "leave as is" (field absent) from "clear"
/// (`null`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceChanges {
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(as = "Option<Option<String>>")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

impl InvoiceChanges {
    /// True when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.subtotal.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecordPayment {
    pub invoice_id: i64,
    pub amount: Money,
    pub method: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
}

// =============================================================================
// Billing Stats
// =============================================================================

/// Dashboard figures over every invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingStats {
    pub total_invoices: i64,
    pub paid: i64,
    /// Draft and sent.
    pub pending: i64,
    pub partial: i64,
    pub overdue: i64,
    pub cancelled: i64,
    pub total_billed: Money,
    pub total_collected: Money,
    pub balance_due: Money,
}

impl BillingStats {
    /// Folds per-status aggregates `(status, count, Σ total, Σ paid)`.
    pub fn tally<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (InvoiceStatus, i64, Money, Money)>,
    {
        let mut stats = BillingStats::default();
        for (status, count, billed, collected) in groups {
            stats.total_invoices += count;
            match status {
                InvoiceStatus::Draft | InvoiceStatus::Sent => stats.pending += count,
                InvoiceStatus::Paid => stats.paid += count,
                InvoiceStatus::Partial => stats.partial += count,
                InvoiceStatus::Overdue => stats.overdue += count,
                InvoiceStatus::Cancelled => stats.cancelled += count,
            }
            stats.total_billed += billed;
            stats.total_collected += collected;
        }
        stats.balance_due = stats.total_billed - stats.total_collected;
        stats
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

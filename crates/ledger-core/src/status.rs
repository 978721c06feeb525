//! # Invoice Status
//!
//! The status enum, the single point where status is derived from payments,
//! and the graph of manual status changes.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────┐ send  ┌──────┐ payment ┌─────────┐ payment ┌──────┐        │
//! │   │ draft │──────►│ sent │────────►│ partial │────────►│ paid │        │
//! │   └───┬───┘       └──┬───┘◄────────└────┬────┘         └──────┘        │
//! │       │              │  ▲   reversal    │                  ▲           │
//! │       │              ▼  │               ▼                  │ covered   │
//! │       │           ┌─────────┐        (overdue)─────────────┘           │
//! │       │           │ overdue │                                          │
//! │       │           └────┬────┘                                          │
//! │       ▼                ▼                                               │
//! │   ┌───────────────────────┐                                            │
//! │   │       cancelled       │  terminal, absorbs every other state       │
//! │   └───────────────────────┘  except paid                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `paid` and `partial` are never chosen freely: [`settle`] derives them
//! from `amount_paid` against `total`, and manual requests for them are
//! checked against the same figures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Invoice Status
// =============================================================================

/// Status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Created, not yet sent to the student.
    Draft,
    /// Sent, nothing paid yet.
    Sent,
    /// Fully covered by payments.
    Paid,
    /// Some payments, balance outstanding.
    Partial,
    /// Past its due date (set by an operator).
    Overdue,
    /// Voided. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Storage and wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Status and paid date after a change to the invoice amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub status: InvoiceStatus,
    pub paid_date: Option<NaiveDate>,
}

/// Derives status from what has been paid.
///
/// ## Rules (first match wins)
/// ```text
/// current == cancelled       → cancelled, paid_date unchanged
/// amount_paid == 0:
///     draft / sent / overdue → unchanged
///     paid / partial         → sent, paid_date cleared
/// amount_paid >= total       → paid, paid_date = today if unset
/// otherwise                  → partial, paid_date cleared
/// ```
///
/// A zero-total invoice with nothing paid therefore keeps its manual status.
pub fn settle(
    amount_paid: Money,
    total: Money,
    current: InvoiceStatus,
    paid_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Settlement {
    if current == InvoiceStatus::Cancelled {
        return Settlement { status: current, paid_date };
    }

    if amount_paid.cents() <= 0 {
        return match current {
            InvoiceStatus::Paid | InvoiceStatus::Partial => Settlement {
                status: InvoiceStatus::Sent,
                paid_date: None,
            },
            _ => Settlement { status: current, paid_date },
        };
    }

    if amount_paid >= total {
        Settlement {
            status: InvoiceStatus::Paid,
            paid_date: paid_date.or(Some(today)),
        }
    } else {
        Settlement {
            status: InvoiceStatus::Partial,
            paid_date: None,
        }
    }
}

/// Derives status after a payment was removed.
///
/// Same as [`settle`], except that nothing left paid always reopens the
/// invoice as `sent` (an `overdue` invoice included). Cancelled stays.
pub fn settle_reversal(
    amount_paid: Money,
    total: Money,
    current: InvoiceStatus,
    paid_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Settlement {
    if amount_paid.cents() <= 0 && current != InvoiceStatus::Cancelled {
        return Settlement {
            status: InvoiceStatus::Sent,
            paid_date: None,
        };
    }
    settle(amount_paid, total, current, paid_date, today)
}

// =============================================================================
// Manual Transitions
// =============================================================================

/// Checks an operator-requested status change.
///
/// ## Graph
/// ```text
/// draft   → sent, cancelled
/// sent    → overdue, cancelled
/// partial → overdue, cancelled
/// overdue → sent (nothing paid), cancelled
/// any but cancelled → paid     when amount_paid >= total
/// sent, overdue     → partial  when 0 < amount_paid < total
/// paid, cancelled   → (none)
/// ```
///
/// Same-status requests are accepted as no-ops. Contradicting the payment
/// figures yields `InconsistentStatus`; leaving the graph yields
/// `InvalidTransition`.
pub fn transition(
    current: InvoiceStatus,
    target: InvoiceStatus,
    amount_paid: Money,
    total: Money,
    paid_date: Option<NaiveDate>,
    today: NaiveDate,
) -> CoreResult<Settlement> {
    use InvoiceStatus::*;

    if current == target {
        return Ok(Settlement { status: current, paid_date });
    }

    let inconsistent = || CoreError::InconsistentStatus {
        status: target,
        amount_paid,
        total,
    };
    let invalid = || CoreError::InvalidTransition {
        from: current,
        to: target,
    };

    match (current, target) {
        (Paid | Cancelled, _) => Err(invalid()),

        (_, Paid) if amount_paid >= total => Ok(Settlement {
            status: Paid,
            paid_date: paid_date.or(Some(today)),
        }),
        (_, Paid) => Err(inconsistent()),

        (Sent | Overdue, Partial) if amount_paid.is_positive() && amount_paid < total => {
            Ok(Settlement { status: Partial, paid_date: None })
        }
        (Sent | Overdue, Partial) => Err(inconsistent()),

        (Overdue, Sent) if amount_paid.is_positive() => Err(inconsistent()),

        (Draft, Sent | Cancelled)
        | (Sent, Overdue | Cancelled)
        | (Partial, Overdue | Cancelled)
        | (Overdue, Sent | Cancelled) => Ok(Settlement { status: target, paid_date }),

        _ => Err(invalid()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceStatus::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_settle_full_payment() {
        let s = settle(cents(114_975), cents(114_975), Sent, None, today());
        assert_eq!(s.status, Paid);
        assert_eq!(s.paid_date, Some(today()));
    }

    #[test]
    fn test_settle_keeps_existing_paid_date() {
        let earlier = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let s = settle(cents(100), cents(100), Paid, Some(earlier), today());
        assert_eq!(s.paid_date, Some(earlier));
    }

    #[test]
    fn test_settle_partial_clears_paid_date() {
        let s = settle(cents(50), cents(100), Paid, Some(today()), today());
        assert_eq!(s.status, Partial);
        assert_eq!(s.paid_date, None);
    }

    #[test]
    fn test_settle_zero_paid() {
        assert_eq!(settle(cents(0), cents(100), Partial, None, today()).status, Sent);
        assert_eq!(settle(cents(0), cents(100), Paid, Some(today()), today()).paid_date, None);
        assert_eq!(settle(cents(0), cents(100), Draft, None, today()).status, Draft);
        assert_eq!(settle(cents(0), cents(100), Overdue, None, today()).status, Overdue);
    }

    #[test]
    fn test_reversal_to_zero_reopens_as_sent() {
        for current in [Overdue, Partial, Paid] {
            let s = settle_reversal(cents(0), cents(100), current, Some(today()), today());
            assert_eq!(s, Settlement { status: Sent, paid_date: None });
        }
        let s = settle_reversal(cents(0), cents(100), Cancelled, None, today());
        assert_eq!(s.status, Cancelled);
        // Something still paid: same as settle
        let s = settle_reversal(cents(40), cents(100), Overdue, None, today());
        assert_eq!(s.status, Partial);
    }

    #[test]
    fn test_settle_zero_total_not_auto_paid() {
        assert_eq!(settle(cents(0), cents(0), Draft, None, today()).status, Draft);
    }

    #[test]
    fn test_settle_cancelled_is_sticky() {
        assert_eq!(settle(cents(100), cents(100), Cancelled, None, today()).status, Cancelled);
        assert_eq!(settle(cents(0), cents(100), Cancelled, None, today()).status, Cancelled);
    }

    #[test]
    fn test_transition_graph() {
        let ok = |from, to| transition(from, to, cents(0), cents(100), None, today()).is_ok();

        assert!(ok(Draft, Sent));
        assert!(ok(Draft, Cancelled));
        assert!(ok(Sent, Overdue));
        assert!(ok(Sent, Cancelled));
        assert!(ok(Overdue, Sent));
        assert!(ok(Overdue, Cancelled));
        assert!(ok(Sent, Sent));

        assert!(!ok(Draft, Overdue));
        assert!(!ok(Sent, Draft));
        assert!(!ok(Cancelled, Sent));
        assert!(!ok(Cancelled, Draft));
    }

    #[test]
    fn test_transition_out_of_paid_is_invalid() {
        let err = transition(Paid, Sent, cents(100), cents(100), Some(today()), today()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { from: Paid, to: Sent }));
    }

    #[test]
    fn test_manual_paid_requires_coverage() {
        let err = transition(Sent, Paid, cents(50), cents(100), None, today()).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentStatus { .. }));

        let s = transition(Partial, Paid, cents(100), cents(100), None, today()).unwrap();
        assert_eq!(s.status, Paid);
        assert_eq!(s.paid_date, Some(today()));

        // Zero-total invoices can be closed by hand
        assert!(transition(Draft, Paid, cents(0), cents(0), None, today()).is_ok());
    }

    #[test]
    fn test_manual_partial_requires_some_payment() {
        let err = transition(Sent, Partial, cents(0), cents(100), None, today()).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentStatus { .. }));

        assert!(transition(Overdue, Partial, cents(40), cents(100), None, today()).is_ok());

        let err = transition(Draft, Partial, cents(40), cents(100), None, today()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_overdue_back_to_sent_needs_zero_paid() {
        let err = transition(Overdue, Sent, cents(40), cents(100), None, today()).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentStatus { .. }));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Cancelled).unwrap(), "\"cancelled\"");
        let parsed: InvoiceStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(parsed, Overdue);
        assert_eq!(Partial.to_string(), "partial");
    }
}

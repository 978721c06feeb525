//! # Ledger Error Type
//!
//! Unified error type for ledger operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Ledger                             │
//! │                                                                         │
//! │  Admin API                    ledger-engine                             │
//! │  ─────────                    ─────────────                             │
//! │                                                                         │
//! │  POST /invoices/42/payments                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Ledger::add_payment → Result<Payment, LedgerError>              │  │
//! │  │         │                                                        │  │
//! │  │  Rule refused?    ─── CoreError::OverpaymentRejected ──┐         │  │
//! │  │  Row missing?     ─── DbError::NotFound ───────────────┤         │  │
//! │  │  Lock contention? ─── DbError::Busy (after retries) ───┤         │  │
//! │  │                                                        ▼         │  │
//! │  │                                          LedgerError::report()   │  │
//! │  └──────────────────────────────────────────────────────────┬───────┘  │
//! │                                                             │          │
//! │  ◄──────────────────────────────────────────────────────────┘          │
//! │  { "kind": "OVERPAYMENT_REJECTED",                                      │
//! │    "message": "Payment of $200.00 exceeds balance of $149.75" }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ledger_core::{CoreError, ValidationError};
use ledger_db::DbError;
use serde::Serialize;
use thiserror::Error;

use crate::directory::DirectoryError;

// =============================================================================
// Ledger Error
// =============================================================================

/// Error returned by every [`Ledger`](crate::Ledger) operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A billing rule refused the request.
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// Invoice, payment, student or session does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Student/session lookup failed. Reported, never retried.
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(#[from] DirectoryError),

    /// Storage failure (transient ones already retried).
    #[error("Storage error: {0}")]
    Storage(#[source] DbError),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Machine-readable kind for the admin API.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Rule(rule) => match rule {
                CoreError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
                CoreError::OverpaymentRejected { .. } => ErrorKind::OverpaymentRejected,
                CoreError::InconsistentStatus { .. } => ErrorKind::InconsistentStatus,
                CoreError::DeleteBlocked { .. } => ErrorKind::DeleteBlocked,
                CoreError::DuplicateInvoiceNumber { .. } => ErrorKind::DuplicateInvoiceNumber,
                CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                CoreError::Validation(_) => ErrorKind::ValidationError,
            },
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::DirectoryUnavailable(_) => ErrorKind::DirectoryUnavailable,
            LedgerError::Storage(db) if db.is_transient() => ErrorKind::StorageUnavailable,
            LedgerError::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// Serializable form. Storage details are logged, not exposed.
    pub fn report(&self) -> ErrorReport {
        let message = match self {
            LedgerError::Storage(db) => {
                tracing::error!(error = %db, "Ledger storage failure");
                if db.is_transient() {
                    "Ledger storage is busy, try again".to_string()
                } else {
                    "Ledger storage operation failed".to_string()
                }
            }
            other => other.to_string(),
        };

        ErrorReport {
            kind: self.kind(),
            message,
        }
    }
}

/// Splits storage errors: rule refusals and missing rows get their own
/// variants, everything else stays a storage error.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(rule) => LedgerError::Rule(rule),
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            other => LedgerError::Storage(other),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Rule(CoreError::Validation(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Error Report
// =============================================================================

/// What the admin API returns when an operation fails.
///
/// ```json
/// { "kind": "NOT_FOUND", "message": "Invoice not found: 42" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidAmount,
    OverpaymentRejected,
    InconsistentStatus,
    DeleteBlocked,
    DuplicateInvoiceNumber,
    InvalidTransition,
    ValidationError,
    NotFound,
    DirectoryUnavailable,
    /// Transient storage fault that outlasted the retry budget.
    StorageUnavailable,
    StorageError,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{InvoiceStatus, Money};

    #[test]
    fn test_db_rule_becomes_rule() {
        let err: LedgerError = DbError::Rule(CoreError::OverpaymentRejected {
            amount: Money::from_cents(20_000),
            balance: Money::from_cents(14_975),
        })
        .into();
        assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
        assert_eq!(err.to_string(), "Payment of $200.00 exceeds balance of $149.75");
    }

    #[test]
    fn test_storage_kinds() {
        let busy: LedgerError = DbError::Busy("database is locked".into()).into();
        assert_eq!(busy.kind(), ErrorKind::StorageUnavailable);

        let broken: LedgerError = DbError::QueryFailed("no such table".into()).into();
        assert_eq!(broken.kind(), ErrorKind::StorageError);
        assert_eq!(broken.report().message, "Ledger storage operation failed");

        let missing: LedgerError = DbError::not_found("Invoice", 42).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_report_serialization() {
        let err = LedgerError::Rule(CoreError::InvalidTransition {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Draft,
        });
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["kind"], "INVALID_TRANSITION");
        assert_eq!(json["message"], "Cannot move invoice from paid to draft");
    }
}

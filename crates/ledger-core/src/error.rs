//! # Error Types
//!
//! Billing rule violations raised by ledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ledger-core errors (this file)                                        │
//! │  ├── CoreError        - Billing rule violations                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ledger-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, wraps CoreError as Rule      │
//! │                                                                         │
//! │  ledger-engine errors                                                  │
//! │  └── LedgerError      - What the admin API sees (stable kinds)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → LedgerError → API       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the figures needed to explain the refusal to an
//! operator ("payment of $200.00 exceeds balance of $149.75").

use thiserror::Error;

use crate::money::Money;
use crate::status::InvoiceStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Billing rule violations.
///
/// None of these are transient: retrying the same request yields the same
/// error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Amount is negative, zero where a positive value is required, or
    /// would leave the invoice total below what has already been paid.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Payment larger than the outstanding balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Invoice total 1149.75, paid 1000.00
    ///      │
    ///      ▼
    /// add_payment(200.00)
    ///      │
    ///      ▼
    /// OverpaymentRejected { amount: 200.00, balance: 149.75 }
    ///      │
    ///      ▼
    /// Admin re-enters 149.75 (the ledger never clamps)
    /// ```
    #[error("Payment of {amount} exceeds balance of {balance}")]
    OverpaymentRejected { amount: Money, balance: Money },

    /// Requested status contradicts the recorded payments.
    #[error("Status {status} is inconsistent with {amount_paid} paid of {total}")]
    InconsistentStatus {
        status: InvoiceStatus,
        amount_paid: Money,
        total: Money,
    },

    /// Paid invoices are kept as accounting records.
    #[error("Invoice {invoice_number} is {status} and cannot be deleted")]
    DeleteBlocked {
        invoice_number: String,
        status: InvoiceStatus,
    },

    /// Number collision that survived every re-derivation attempt.
    #[error("Invoice number {invoice_number} is already taken")]
    DuplicateInvoiceNumber { invoice_number: String },

    /// Status change outside the transition graph.
    #[error("Cannot move invoice from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for `InvalidAmount` with a reason.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any billing rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. lowercase prefix, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OverpaymentRejected {
            amount: Money::from_cents(20_000),
            balance: Money::from_cents(14_975),
        };
        assert_eq!(
            err.to_string(),
            "Payment of $200.00 exceeds balance of $149.75"
        );

        let err = CoreError::InvalidTransition {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Sent,
        };
        assert_eq!(err.to_string(), "Cannot move invoice from paid to sent");

        let err = CoreError::DeleteBlocked {
            invoice_number: "FE-202501-0001".to_string(),
            status: InvoiceStatus::Paid,
        };
        assert_eq!(
            err.to_string(),
            "Invoice FE-202501-0001 is paid and cannot be deleted"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "method".to_string(),
        };
        assert_eq!(err.to_string(), "method is required");

        let err = ValidationError::TooLong {
            field: "reference".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "reference must be at most 100 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "method".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

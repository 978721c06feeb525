//! # Validation Module
//!
//! Input checks that run before any billing rule.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Admin API                                                     │
//! │  └── Deserialization (types, required fields)                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Identifiers, lengths, prefix format                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Billing rules (tax, status, lifecycle)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite (UNIQUE, CHECK, FOREIGN KEY)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{CreateInvoice, RecordPayment};
use crate::{MAX_METHOD_LEN, MAX_REFERENCE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted series prefix.
pub const MAX_PREFIX_LEN: usize = 10;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an invoice series prefix.
///
/// ## Rules
/// - 1 to 10 characters
/// - Uppercase ASCII letters and digits only (no `-`, it separates fields)
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_invoice_prefix;
///
/// assert!(validate_invoice_prefix("FE").is_ok());
/// assert!(validate_invoice_prefix("fe").is_err());
/// assert!(validate_invoice_prefix("FE-2").is_err());
/// ```
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "invoice_prefix".to_string(),
        });
    }

    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_prefix".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_prefix".to_string(),
            reason: "must contain only uppercase letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a payment method label and returns it trimmed.
pub fn validate_payment_method(method: &str) -> ValidationResult<String> {
    let method = method.trim();

    if method.is_empty() {
        return Err(ValidationError::Required {
            field: "method".to_string(),
        });
    }

    if method.chars().count() > MAX_METHOD_LEN {
        return Err(ValidationError::TooLong {
            field: "method".to_string(),
            max: MAX_METHOD_LEN,
        });
    }

    Ok(method.to_string())
}

/// Validates an optional payment reference. Blank becomes `None`.
pub fn validate_reference(reference: Option<&str>) -> ValidationResult<Option<String>> {
    let reference = match reference.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(r) => r,
    };

    if reference.chars().count() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    Ok(Some(reference.to_string()))
}

/// Validates a surrogate key coming from another module.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates the identifiers of a new invoice.
///
/// Amount rules (non-negative subtotal) belong to the tax calculator.
pub fn validate_create_invoice(input: &CreateInvoice) -> ValidationResult<()> {
    validate_id("student_id", input.student_id)?;
    if let Some(session_id) = input.session_id {
        validate_id("session_id", session_id)?;
    }
    Ok(())
}

/// Validates and normalises a payment request.
///
/// Returns the request with method and reference trimmed.
pub fn validate_record_payment(input: &RecordPayment) -> ValidationResult<RecordPayment> {
    validate_id("invoice_id", input.invoice_id)?;
    let method = validate_payment_method(&input.method)?;
    let reference = validate_reference(input.reference.as_deref())?;

    Ok(RecordPayment {
        method,
        reference,
        ..input.clone()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # ledger-core: Pure Billing Logic for the Institute Ledger
//!
//! This crate is the heart of the invoice & payment ledger. It contains the
//! billing rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Institute Ledger Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Admin API (students, sessions, CRUD) - external       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-engine                                │   │
//! │  │    create_invoice, add_payment, reverse_payment, ...           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐   │   │
//! │  │   │  money   │  │   tax    │  │ numbering │  │   status   │   │   │
//! │  │   │  Money   │  │ GST/QST  │  │ FE-YYYYMM │  │  machine   │   │   │
//! │  │   └──────────┘  └──────────┘  └───────────┘  └────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, transactional repos        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer cents, tax rates in pcm
//! - [`tax`] - GST/QST breakdown of a subtotal
//! - [`numbering`] - `PREFIX-YYYYMM-NNNN` invoice numbers
//! - [`status`] - Invoice status and the single derivation point
//! - [`lifecycle`] - Edit, send, delete and payment rules
//! - [`types`] - Invoice, Payment and request types
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::money::Money;
//! use ledger_core::tax;
//!
//! let breakdown = tax::compute(Money::from_cents(100_000)).unwrap();
//! assert_eq!(breakdown.gst.cents(), 5_000);
//! assert_eq!(breakdown.qst.cents(), 9_975);
//! assert_eq!(breakdown.total.cents(), 114_975);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod status;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use status::{InvoiceStatus, Settlement};
pub use tax::TaxBreakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Series prefix used when none is configured.
pub const DEFAULT_INVOICE_PREFIX: &str = "FE";

/// Maximum length of a payment method label.
pub const MAX_METHOD_LEN: usize = 50;

/// Maximum length of a payment reference (cheque number, transfer id).
pub const MAX_REFERENCE_LEN: usize = 100;

/// Payment methods offered by the admin forms.
///
/// The method column is free text; this list only seeds the UI.
pub const PAYMENT_METHODS: &[&str] = &[
    "cash",
    "check",
    "credit_card",
    "debit",
    "transfer",
    "interac",
];

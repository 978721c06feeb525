//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger operation                                                       │
//! │       │                                                                 │
//! │       │  db.payments().record(&request, today)                          │
//! │       ▼                                                                 │
//! │  PaymentRepository                                                     │
//! │  ├── opens the transaction                                             │
//! │  ├── asks ledger_core::lifecycle what the new state is                 │
//! │  └── writes it back, or drops the transaction on a refused rule        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - numbering, edits, deletion, stats
//! - [`PaymentRepository`](payment::PaymentRepository) - record, reverse, list
//! - [`sequence`] - month-scoped counters (used by invoice creation)

pub mod invoice;
pub mod payment;
pub mod sequence;

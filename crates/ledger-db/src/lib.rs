//! # ledger-db: Database Layer for the Institute Ledger
//!
//! SQLite persistence for invoices, payments and invoice counters, using
//! sqlx for async operations. Every multi-row change happens here, inside a
//! single transaction, with the billing decision delegated to ledger-core.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Data Flow                                 │
//! │                                                                         │
//! │  ledger-engine (add_payment, create_invoice, ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ledger-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo    │   │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ PaymentRepo    │   │ 002_sequence │  │   │
//! │  │   │ WAL, FK, busy │    │ sequence       │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (ledger.db)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Invoice, payment and sequence storage
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ledger.db")).await?;
//! let invoice = db.invoices().create(&request, "FE", today, 1).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::invoice::InvoiceRepository;
pub use repository::payment::PaymentRepository;

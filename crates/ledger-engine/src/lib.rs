//! # ledger-engine: Public Ledger Operations
//!
//! The surface the admin API calls: invoices, payments, balances.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin API handler                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │  Ledger (THIS CRATE)                                              │ │
//! │  │   • input validation          • Directory (students, sessions)    │ │
//! │  │   • Clock (today)             • RetryPolicy (busy storage)        │ │
//! │  └───────────────┬───────────────────────────────────────────────────┘ │
//! │                  │                                                      │
//! │  ┌───────────────▼───────────────┐   ┌───────────────────────────────┐ │
//! │  │ ledger-db (transactions)      │──►│ ledger-core (billing rules)   │ │
//! │  └───────────────────────────────┘   └───────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let config = LedgerConfig::from_env()?;
//! let directory = Arc::new(InMemoryDirectory::with_records([1], []));
//! let ledger = Ledger::open(&config, directory).await?;
//!
//! let invoice = ledger.create_invoice(request).await?;
//! ledger.mark_sent(invoice.id).await?;
//! ```

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod retry;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use directory::{Directory, DirectoryError, InMemoryDirectory};
pub use error::{ErrorKind, ErrorReport, LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use retry::RetryPolicy;

//! # Ledger Operations
//!
//! The entry points the admin API calls.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger::add_payment(request)                                           │
//! │     │                                                                   │
//! │     ├── validation::validate_record_payment   (ledger-core, no I/O)    │
//! │     ├── clock.today()                                                  │
//! │     ├── with_retry ─┐                                                  │
//! │     │               └── db.payments().record(...)  (one transaction)   │
//! │     │                     └── lifecycle::plan_payment                  │
//! │     └── DbError → LedgerError                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use ledger_core::tax;
use ledger_core::validation::{validate_create_invoice, validate_id, validate_record_payment};
use ledger_core::{BillingStats, CreateInvoice, Invoice, InvoiceChanges, Money, Payment, RecordPayment};
use ledger_db::Database;
use tracing::{debug, info, instrument};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::directory::Directory;
use crate::error::{LedgerError, LedgerResult};
use crate::retry::{with_retry, RetryPolicy};

/// Invoice & payment ledger.
///
/// Cheap to clone; clones share the pool and collaborators.
#[derive(Clone)]
pub struct Ledger {
    db: Database,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    invoice_prefix: String,
    number_retries: u32,
    retry: RetryPolicy,
}

impl Ledger {
    /// Opens the database described by `config` and runs migrations.
    pub async fn open(config: &LedgerConfig, directory: Arc<dyn Directory>) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Ledger::new(db, directory, config))
    }

    /// Builds a ledger over an existing database, using the system clock.
    pub fn new(db: Database, directory: Arc<dyn Directory>, config: &LedgerConfig) -> Self {
        Ledger {
            db,
            directory,
            clock: Arc::new(SystemClock),
            invoice_prefix: config.invoice_prefix.clone(),
            number_retries: config.number_retries,
            retry: config.retry_policy(),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Creates a draft invoice for a student.
    ///
    /// The student (and session, when given) must exist in the directory.
    /// Taxes are computed from the subtotal and the next number of the
    /// current month is assigned.
    #[instrument(skip(self, input), fields(student_id = input.student_id, subtotal = %input.subtotal))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> LedgerResult<Invoice> {
        validate_create_invoice(&input)?;
        // Refuse bad amounts before asking the directory
        tax::compute(input.subtotal)?;

        self.ensure_references(&input).await?;

        let today = self.clock.today();
        let invoices = self.db.invoices();
        let invoice = with_retry(&self.retry, "create_invoice", || {
            invoices.create(&input, &self.invoice_prefix, today, self.number_retries)
        })
        .await?;

        Ok(invoice)
    }

    async fn ensure_references(&self, input: &CreateInvoice) -> LedgerResult<()> {
        if !self.directory.student_exists(input.student_id).await? {
            return Err(LedgerError::not_found("Student", input.student_id));
        }

        if let Some(session_id) = input.session_id {
            if !self.directory.session_exists(session_id).await? {
                return Err(LedgerError::not_found("Session", session_id));
            }
        }

        debug!(student_id = input.student_id, session_id = ?input.session_id, "References checked");
        Ok(())
    }

    /// Applies a partial update: subtotal (taxes recomputed), description,
    /// due date, and finally an explicit status.
    #[instrument(skip(self, changes), fields(invoice_id = id))]
    pub async fn update_invoice(&self, id: i64, changes: InvoiceChanges) -> LedgerResult<Invoice> {
        if changes.is_empty() {
            return self.get_invoice(id).await;
        }

        let today = self.clock.today();
        let invoices = self.db.invoices();
        let invoice = with_retry(&self.retry, "update_invoice", || {
            invoices.update(id, &changes, today)
        })
        .await?;

        Ok(invoice)
    }

    /// Deletes an invoice and its payments. Paid invoices are kept.
    #[instrument(skip(self), fields(invoice_id = id))]
    pub async fn delete_invoice(&self, id: i64) -> LedgerResult<()> {
        let invoices = self.db.invoices();
        with_retry(&self.retry, "delete_invoice", || invoices.delete(id)).await?;
        Ok(())
    }

    /// Moves a draft invoice to `sent`.
    #[instrument(skip(self), fields(invoice_id = id))]
    pub async fn mark_sent(&self, id: i64) -> LedgerResult<Invoice> {
        let invoices = self.db.invoices();
        let invoice = with_retry(&self.retry, "mark_sent", || invoices.mark_sent(id)).await?;
        Ok(invoice)
    }

    /// Voids an invoice.
    #[instrument(skip(self), fields(invoice_id = id))]
    pub async fn cancel_invoice(&self, id: i64) -> LedgerResult<Invoice> {
        let today = self.clock.today();
        let invoices = self.db.invoices();
        let invoice = with_retry(&self.retry, "cancel_invoice", || invoices.cancel(id, today)).await?;
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: i64) -> LedgerResult<Invoice> {
        let invoices = self.db.invoices();
        with_retry(&self.retry, "get_invoice", || invoices.get_by_id(id))
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", id))
    }

    /// Amount still owed on an invoice.
    pub async fn get_balance(&self, id: i64) -> LedgerResult<Money> {
        Ok(self.get_invoice(id).await?.balance())
    }

    /// Clears the session reference on invoices of a removed session.
    #[instrument(skip(self))]
    pub async fn detach_session(&self, session_id: i64) -> LedgerResult<u64> {
        validate_id("session_id", session_id)?;
        let invoices = self.db.invoices();
        let detached = with_retry(&self.retry, "detach_session", || {
            invoices.detach_session(session_id)
        })
        .await?;

        info!(session_id, detached, "Invoices detached from removed session");
        Ok(detached)
    }

    /// Billing dashboard figures.
    pub async fn stats(&self) -> LedgerResult<BillingStats> {
        let invoices = self.db.invoices();
        Ok(with_retry(&self.retry, "stats", || invoices.stats()).await?)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment against an invoice.
    ///
    /// Rejected when the amount is not positive, the invoice is cancelled,
    /// or the amount exceeds the balance.
    #[instrument(skip(self, input), fields(invoice_id = input.invoice_id, amount = %input.amount))]
    pub async fn add_payment(&self, input: RecordPayment) -> LedgerResult<Payment> {
        let input = validate_record_payment(&input)?;

        let today = self.clock.today();
        let payments = self.db.payments();
        let payment = with_retry(&self.retry, "add_payment", || payments.record(&input, today)).await?;

        Ok(payment)
    }

    /// Deletes a payment and restores the invoice to match.
    #[instrument(skip(self))]
    pub async fn reverse_payment(&self, payment_id: i64) -> LedgerResult<Invoice> {
        let today = self.clock.today();
        let payments = self.db.payments();
        let invoice = with_retry(&self.retry, "reverse_payment", || {
            payments.reverse(payment_id, today)
        })
        .await?;

        Ok(invoice)
    }

    /// Payments of an invoice, most recent first.
    pub async fn list_payments(&self, invoice_id: i64) -> LedgerResult<Vec<Payment>> {
        // Distinguish "no payments" from "no invoice"
        self.get_invoice(invoice_id).await?;

        let payments = self.db.payments();
        Ok(with_retry(&self.retry, "list_payments", || payments.list_for_invoice(invoice_id)).await?)
    }

    /// Sum of recorded payments; equals the invoice's `amount_paid`.
    pub async fn total_paid(&self, invoice_id: i64) -> LedgerResult<Money> {
        let payments = self.db.payments();
        Ok(with_retry(&self.retry, "total_paid", || payments.total_for_invoice(invoice_id)).await?)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("invoice_prefix", &self.invoice_prefix)
            .field("number_retries", &self.number_retries)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

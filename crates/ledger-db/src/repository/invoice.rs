//! # Invoice Repository
//!
//! Database operations for invoices.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → allocate number, insert { status: Draft }           │
//! │                                                                         │
//! │  2. EDIT / SEND / CANCEL                                               │
//! │     └── update(), mark_sent(), cancel()                                │
//! │         touch row → load → ledger_core::lifecycle → write back         │
//! │                                                                         │
//! │  3. PAYMENTS (PaymentRepository)                                       │
//! │     └── amount_paid, status and paid_date move together               │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete() → payments and invoice in one transaction             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write-First Transactions
//! Every mutating transaction opens with a write to the invoice row (or the
//! sequence row), so SQLite grants the write lock before anything is read.
//! Two edits of the same invoice therefore run one after the other and the
//! second sees the first's result.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::sequence;
use ledger_core::{
    lifecycle, numbering, tax, BillingStats, CoreError, CreateInvoice, Invoice, InvoiceChanges,
    InvoiceStatus, Money,
};

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a draft invoice with the next number of its series.
    ///
    /// ## Numbering
    /// ```text
    /// BEGIN
    ///   upsert invoice_sequences[series] += 1        ← write lock taken here
    ///   highest invoices.invoice_number in series    ← reconcile
    ///   INSERT invoice                               ← UNIQUE(invoice_number)
    /// COMMIT
    /// ```
    /// A unique violation rolls everything back and the number is derived
    /// again, at most `number_retries` more times.
    pub async fn create(
        &self,
        input: &CreateInvoice,
        prefix: &str,
        issue_date: NaiveDate,
        number_retries: u32,
    ) -> DbResult<Invoice> {
        let breakdown = tax::compute(input.subtotal)?;
        let series = numbering::series_prefix(prefix, issue_date);

        let mut attempt = 0;
        loop {
            match self.try_create(input, &breakdown, &series, issue_date).await {
                Ok(invoice) => {
                    info!(
                        id = invoice.id,
                        invoice_number = %invoice.invoice_number,
                        student_id = invoice.student_id,
                        total = %invoice.total(),
                        "Invoice created"
                    );
                    return Ok(invoice);
                }
                Err(DbError::UniqueViolation { field, value }) if field.contains("invoice_number") => {
                    if attempt >= number_retries {
                        return Err(CoreError::DuplicateInvoiceNumber { invoice_number: value }.into());
                    }
                    attempt += 1;
                    warn!(series = %series, attempt, number = %value, "Invoice number collision, re-deriving");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_create(
        &self,
        input: &CreateInvoice,
        breakdown: &ledger_core::TaxBreakdown,
        series: &str,
        issue_date: NaiveDate,
    ) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let sequence = sequence::allocate(&mut tx, series).await?;
        let invoice_number = numbering::format_number(series, sequence);
        let now = Utc::now();

        debug!(invoice_number = %invoice_number, sequence, "Allocated invoice number");

        let mut invoice = Invoice {
            id: 0,
            invoice_number,
            student_id: input.student_id,
            session_id: input.session_id,
            subtotal_cents: 0,
            gst_cents: 0,
            qst_cents: 0,
            total_cents: 0,
            amount_paid_cents: 0,
            status: InvoiceStatus::Draft,
            issue_date,
            due_date: input.due_date,
            paid_date: None,
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            payment_method: None,
            created_at: now,
            updated_at: now,
        };
        invoice.set_breakdown(breakdown);

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO invoices (
                invoice_number, student_id, session_id,
                subtotal_cents, gst_cents, qst_cents, total_cents, amount_paid_cents,
                status, issue_date, due_date, paid_date,
                description, payment_method,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14,
                ?15, ?16
            )
            RETURNING id
            "#,
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.student_id)
        .bind(invoice.session_id)
        .bind(invoice.subtotal_cents)
        .bind(invoice.gst_cents)
        .bind(invoice.qst_cents)
        .bind(invoice.total_cents)
        .bind(invoice.amount_paid_cents)
        .bind(invoice.status)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.paid_date)
        .bind(&invoice.description)
        .bind(&invoice.payment_method)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&mut *tx)
        .await;

        invoice.id = match inserted {
            Ok(id) => id,
            Err(e) => {
                return Err(match DbError::from(e) {
                    DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                        field,
                        value: invoice.invoice_number.clone(),
                    },
                    other => other,
                })
            }
        };

        tx.commit().await?;
        Ok(invoice)
    }

    // =========================================================================
    // Edit
    // =========================================================================

    /// Applies a partial update.
    ///
    /// See [`ledger_core::lifecycle::apply_changes`] for the rules; a refused
    /// change leaves the stored invoice untouched.
    pub async fn update(&self, id: i64, changes: &InvoiceChanges, today: NaiveDate) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, id).await?;

        let mut invoice = fetch(&mut tx, id).await?;
        let before = invoice.status;
        lifecycle::apply_changes(&mut invoice, changes, today)?;
        write_state(&mut tx, &mut invoice).await?;

        tx.commit().await?;

        info!(
            id,
            invoice_number = %invoice.invoice_number,
            from = %before,
            to = %invoice.status,
            total = %invoice.total(),
            "Invoice updated"
        );
        Ok(invoice)
    }

    /// Moves a draft to `sent`.
    pub async fn mark_sent(&self, id: i64) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, id).await?;

        let mut invoice = fetch(&mut tx, id).await?;
        lifecycle::send(&mut invoice)?;
        write_state(&mut tx, &mut invoice).await?;

        tx.commit().await?;

        info!(id, invoice_number = %invoice.invoice_number, "Invoice sent");
        Ok(invoice)
    }

    /// Voids an invoice.
    pub async fn cancel(&self, id: i64, today: NaiveDate) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, id).await?;

        let mut invoice = fetch(&mut tx, id).await?;
        lifecycle::cancel(&mut invoice, today)?;
        write_state(&mut tx, &mut invoice).await?;

        tx.commit().await?;

        info!(id, invoice_number = %invoice.invoice_number, "Invoice cancelled");
        Ok(invoice)
    }

    /// Deletes an invoice and its payments. Paid invoices are kept.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, id).await?;

        let invoice = fetch(&mut tx, id).await?;
        lifecycle::ensure_deletable(&invoice)?;

        let payments = sqlx::query("DELETE FROM payments WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            id,
            invoice_number = %invoice.invoice_number,
            payments,
            "Invoice deleted"
        );
        Ok(())
    }

    /// Clears the session reference of every invoice pointing at a removed
    /// session. Returns how many invoices were detached.
    pub async fn detach_session(&self, session_id: i64) -> DbResult<u64> {
        let detached = sqlx::query(
            "UPDATE invoices SET session_id = NULL, updated_at = ?2 WHERE session_id = ?1",
        )
        .bind(session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(session_id, detached, "Session detached from invoices");
        Ok(detached)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Billing dashboard figures over all invoices.
    pub async fn stats(&self) -> DbResult<BillingStats> {
        let rows = sqlx::query_as::<_, (InvoiceStatus, i64, i64, i64)>(
            r#"
            SELECT status,
                   COUNT(*),
                   COALESCE(SUM(total_cents), 0),
                   COALESCE(SUM(amount_paid_cents), 0)
            FROM invoices
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(BillingStats::tally(rows.into_iter().map(
            |(status, count, billed, collected)| {
                (status, count, Money::from_cents(billed), Money::from_cents(collected))
            },
        )))
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Bumps `updated_at`, taking the write lock. NotFound if the row is absent.
pub(crate) async fn touch(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE invoices SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }
    Ok(())
}

/// Loads an invoice inside a transaction.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Invoice> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))
}

/// Writes every mutable column back. `updated_at` is refreshed.
pub(crate) async fn write_state(conn: &mut SqliteConnection, invoice: &mut Invoice) -> DbResult<()> {
    invoice.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE invoices SET
            subtotal_cents = ?2,
            gst_cents = ?3,
            qst_cents = ?4,
            total_cents = ?5,
            amount_paid_cents = ?6,
            status = ?7,
            due_date = ?8,
            paid_date = ?9,
            description = ?10,
            payment_method = ?11,
            updated_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(invoice.id)
    .bind(invoice.subtotal_cents)
    .bind(invoice.gst_cents)
    .bind(invoice.qst_cents)
    .bind(invoice.total_cents)
    .bind(invoice.amount_paid_cents)
    .bind(invoice.status)
    .bind(invoice.due_date)
    .bind(invoice.paid_date)
    .bind(&invoice.description)
    .bind(&invoice.payment_method)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

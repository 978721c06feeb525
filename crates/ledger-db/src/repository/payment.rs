//! # Payment Repository
//!
//! Records and reverses payments. Each operation moves the payment row and
//! the invoice's `amount_paid` / `status` / `paid_date` in one transaction,
//! keeping `Σ payments.amount == invoices.amount_paid` at every commit.
//!
//! ```text
//! record(RecordPayment)                 reverse(payment_id)
//!   │                                     │
//!   ├─ touch invoice (write lock)         ├─ touch owning invoice (write lock)
//!   ├─ load invoice                       ├─ load payment + invoice
//!   ├─ lifecycle::plan_payment            ├─ lifecycle::plan_reversal
//!   ├─ INSERT payment                     ├─ DELETE payment
//!   ├─ UPDATE invoice                     ├─ UPDATE invoice
//!   └─ COMMIT                             └─ COMMIT
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::invoice::{fetch, touch, write_state};
use ledger_core::{lifecycle, Invoice, Money, Payment, RecordPayment};

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    /// Payments of an invoice, most recent payment date first.
    pub async fn list_for_invoice(&self, invoice_id: i64) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE invoice_id = ?1
            ORDER BY payment_date DESC, id DESC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Sum of recorded payments for an invoice.
    pub async fn total_for_invoice(&self, invoice_id: i64) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE invoice_id = ?1",
        )
        .bind(invoice_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Records a payment and applies it to the invoice.
    ///
    /// `input` is expected to be validated (trimmed method, reference
    /// length); amount and balance rules are enforced here.
    pub async fn record(&self, input: &RecordPayment, today: NaiveDate) -> DbResult<Payment> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, input.invoice_id).await?;

        let mut invoice = fetch(&mut tx, input.invoice_id).await?;
        let change = lifecycle::plan_payment(&invoice, input.amount, today)?;

        let mut payment = Payment {
            id: 0,
            invoice_id: invoice.id,
            amount_cents: input.amount.cents(),
            payment_date: input.payment_date.unwrap_or(today),
            method: input.method.clone(),
            reference: input.reference.clone(),
            notes: input.notes.clone(),
            created_at: Utc::now(),
        };

        payment.id = sqlx::query_scalar(
            r#"
            INSERT INTO payments (
                invoice_id, amount_cents, payment_date,
                method, reference, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(payment.invoice_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .fetch_one(&mut *tx)
        .await?;

        change.apply_to(&mut invoice);
        invoice.payment_method = Some(payment.method.clone());
        write_state(&mut tx, &mut invoice).await?;

        tx.commit().await?;

        info!(
            payment_id = payment.id,
            invoice_number = %invoice.invoice_number,
            amount = %payment.amount(),
            amount_paid = %invoice.amount_paid(),
            status = %invoice.status,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Deletes a payment and undoes its effect on the invoice.
    ///
    /// Returns the invoice as it stands after the reversal.
    pub async fn reverse(&self, payment_id: i64, today: NaiveDate) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        // Lock through the owning invoice; zero rows means no such payment
        let touched = sqlx::query(
            r#"
            UPDATE invoices SET updated_at = ?2
            WHERE id = (SELECT invoice_id FROM payments WHERE id = ?1)
            "#,
        )
        .bind(payment_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if touched == 0 {
            return Err(DbError::not_found("Payment", payment_id));
        }

        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?1")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Payment", payment_id))?;

        let mut invoice = fetch(&mut tx, payment.invoice_id).await?;
        let change = lifecycle::plan_reversal(&invoice, payment.amount(), today)?;

        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        change.apply_to(&mut invoice);
        write_state(&mut tx, &mut invoice).await?;

        tx.commit().await?;

        debug!(payment_id, invoice_id = invoice.id, "Payment row deleted");
        info!(
            payment_id,
            invoice_number = %invoice.invoice_number,
            amount = %payment.amount(),
            amount_paid = %invoice.amount_paid(),
            status = %invoice.status,
            "Payment reversed"
        );
        Ok(invoice)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use ledger_core::{CoreError, CreateInvoice, InvoiceStatus};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    async fn setup_with_invoice() -> (Database, Invoice) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let input = CreateInvoice {
            student_id: 1,
            session_id: None,
            subtotal: Money::from_cents(100_000),
            description: None,
            due_date: None,
        };
        let invoice = db.invoices().create(&input, "FE", today(), 1).await.unwrap();
        let invoice = db.invoices().mark_sent(invoice.id).await.unwrap();
        (db, invoice)
    }

    fn pay(invoice_id: i64, cents: i64, method: &str) -> RecordPayment {
        RecordPayment {
            invoice_id,
            amount: Money::from_cents(cents),
            method: method.to_string(),
            reference: None,
            notes: None,
            payment_date: None,
        }
    }

    #[tokio::test]
    async fn test_record_updates_invoice() {
        let (db, invoice) = setup_with_invoice().await;

        let payment = db.payments().record(&pay(invoice.id, 50_000, "cash"), today()).await.unwrap();
        assert_eq!(payment.payment_date, today());

        let stored = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, 50_000);
        assert_eq!(stored.status, InvoiceStatus::Partial);
        assert_eq!(stored.payment_method.as_deref(), Some("cash"));
        assert_eq!(stored.balance().cents(), 64_975);
    }

    #[tokio::test]
    async fn test_exact_balance_marks_paid() {
        let (db, invoice) = setup_with_invoice().await;

        db.payments().record(&pay(invoice.id, 114_975, "interac"), today()).await.unwrap();

        let stored = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.paid_date, Some(today()));
    }

    #[tokio::test]
    async fn test_overpayment_leaves_no_trace() {
        let (db, invoice) = setup_with_invoice().await;

        let err = db
            .payments()
            .record(&pay(invoice.id, 114_976, "cash"), today())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::OverpaymentRejected { .. })));

        assert!(db.payments().list_for_invoice(invoice.id).await.unwrap().is_empty());
        let stored = db.invoices().get_by_id(invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid_cents, 0);
    }

    #[tokio::test]
    async fn test_payment_on_missing_invoice() {
        let (db, _) = setup_with_invoice().await;
        let err = db.payments().record(&pay(404, 100, "cash"), today()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_reverse_restores_previous_state() {
        let (db, invoice) = setup_with_invoice().await;
        let payments = db.payments();

        payments.record(&pay(invoice.id, 50_000, "cash"), today()).await.unwrap();
        let last = payments.record(&pay(invoice.id, 64_975, "check"), today()).await.unwrap();

        let after = payments.reverse(last.id, today()).await.unwrap();
        assert_eq!(after.amount_paid_cents, 50_000);
        assert_eq!(after.status, InvoiceStatus::Partial);
        assert_eq!(after.paid_date, None);
        assert_eq!(payments.total_for_invoice(invoice.id).await.unwrap().cents(), 50_000);

        let err = payments.reverse(last.id, today()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_order() {
        let (db, invoice) = setup_with_invoice().await;
        let payments = db.payments();

        let mut early = pay(invoice.id, 100, "cash");
        early.payment_date = NaiveDate::from_ymd_opt(2025, 1, 2);
        let a = payments.record(&early, today()).await.unwrap();
        let b = payments.record(&pay(invoice.id, 100, "cash"), today()).await.unwrap();
        let c = payments.record(&pay(invoice.id, 100, "cash"), today()).await.unwrap();

        let ids: Vec<i64> = payments
            .list_for_invoice(invoice.id)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn test_delete_cascades_payments() {
        let (db, invoice) = setup_with_invoice().await;
        let payment = db.payments().record(&pay(invoice.id, 100, "cash"), today()).await.unwrap();

        db.invoices().delete(invoice.id).await.unwrap();
        assert!(db.payments().get_by_id(payment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paid_invoice_cannot_be_deleted() {
        let (db, invoice) = setup_with_invoice().await;
        db.payments().record(&pay(invoice.id, 114_975, "cash"), today()).await.unwrap();

        let err = db.invoices().delete(invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::DeleteBlocked { .. })));
        assert_eq!(db.payments().list_for_invoice(invoice.id).await.unwrap().len(), 1);
    }
}

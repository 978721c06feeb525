//! End-to-end billing scenarios against an in-memory ledger.

use std::sync::Arc;

use chrono::NaiveDate;
use ledger_core::{CreateInvoice, InvoiceChanges, InvoiceStatus, Money, RecordPayment};
use ledger_db::{Database, DbConfig};
use ledger_engine::{ErrorKind, FixedClock, InMemoryDirectory, Ledger, LedgerConfig};

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
}

async fn setup() -> (Ledger, Arc<FixedClock>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let directory = Arc::new(InMemoryDirectory::with_records([1, 2, 3], [7]));
    let clock = Arc::new(FixedClock::new(jan(10)));
    let ledger = Ledger::new(db, directory, &LedgerConfig::default()).with_clock(clock.clone());
    (ledger, clock)
}

fn invoice_for(student_id: i64, subtotal_cents: i64) -> CreateInvoice {
    CreateInvoice {
        student_id,
        session_id: Some(7),
        subtotal: Money::from_cents(subtotal_cents),
        description: Some("Forklift certification".to_string()),
        due_date: Some(jan(31)),
    }
}

fn pay(invoice_id: i64, cents: i64) -> RecordPayment {
    RecordPayment {
        invoice_id,
        amount: Money::from_cents(cents),
        method: "cash".to_string(),
        reference: None,
        notes: None,
        payment_date: None,
    }
}

#[tokio::test]
async fn test_full_billing_cycle() {
    let (ledger, clock) = setup().await;

    let invoice = ledger.create_invoice(invoice_for(1, 100_000)).await.unwrap();
    assert_eq!(invoice.invoice_number, "FE-202501-0001");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.gst_cents, 5_000);
    assert_eq!(invoice.qst_cents, 9_975);
    assert_eq!(invoice.total_cents, 114_975);
    assert_eq!(invoice.amount_paid_cents, 0);

    let sent = ledger.mark_sent(invoice.id).await.unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);

    let first = ledger.add_payment(pay(invoice.id, 50_000)).await.unwrap();
    assert_eq!(first.payment_date, jan(10));
    let partial = ledger.get_invoice(invoice.id).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.paid_date, None);
    assert_eq!(ledger.get_balance(invoice.id).await.unwrap(), Money::from_cents(64_975));

    clock.set(jan(20));
    ledger.add_payment(pay(invoice.id, 64_975)).await.unwrap();
    let paid = ledger.get_invoice(invoice.id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.paid_date, Some(jan(20)));
    assert_eq!(paid.payment_method.as_deref(), Some("cash"));
    assert!(ledger.get_balance(invoice.id).await.unwrap().is_zero());

    // Reverse the first payment: back to partial, paid date cleared
    let reopened = ledger.reverse_payment(first.id).await.unwrap();
    assert_eq!(reopened.status, InvoiceStatus::Partial);
    assert_eq!(reopened.amount_paid_cents, 64_975);
    assert_eq!(reopened.paid_date, None);

    let remaining = ledger.list_payments(invoice.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    ledger.reverse_payment(remaining[0].id).await.unwrap();

    let unpaid = ledger.get_invoice(invoice.id).await.unwrap();
    assert_eq!(unpaid.status, InvoiceStatus::Sent);
    assert_eq!(unpaid.amount_paid_cents, 0);
}

#[tokio::test]
async fn test_exact_balance_and_one_cent_over() {
    let (ledger, _) = setup().await;
    let a = ledger.create_invoice(invoice_for(1, 100_000)).await.unwrap();
    let b = ledger.create_invoice(invoice_for(2, 100_000)).await.unwrap();

    ledger.add_payment(pay(a.id, 114_975)).await.unwrap();
    assert_eq!(ledger.get_invoice(a.id).await.unwrap().status, InvoiceStatus::Paid);

    let err = ledger.add_payment(pay(b.id, 114_976)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
    assert_eq!(
        err.to_string(),
        "Payment of $1149.76 exceeds balance of $1149.75"
    );

    let untouched = ledger.get_invoice(b.id).await.unwrap();
    assert_eq!(untouched.amount_paid_cents, 0);
    assert!(ledger.list_payments(b.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_and_negative_payments_rejected() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();

    for cents in [0, -100] {
        let err = ledger.add_payment(pay(invoice.id, cents)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    }
}

#[tokio::test]
async fn test_cancelled_invoice_takes_no_payment() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();
    ledger.cancel_invoice(invoice.id).await.unwrap();

    let err = ledger.add_payment(pay(invoice.id, 100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_paid_invoice_cannot_be_deleted() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();
    ledger.add_payment(pay(invoice.id, invoice.total_cents)).await.unwrap();

    let err = ledger.delete_invoice(invoice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeleteBlocked);
    assert!(ledger.get_invoice(invoice.id).await.is_ok());
}

#[tokio::test]
async fn test_partial_invoice_delete_removes_payments() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();
    let payment = ledger.add_payment(pay(invoice.id, 1_000)).await.unwrap();

    ledger.delete_invoice(invoice.id).await.unwrap();

    let err = ledger.get_invoice(invoice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = ledger.reverse_payment(payment.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_amount_paid_tracks_payments() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(3, 250_000)).await.unwrap();

    let mut ids = Vec::new();
    for cents in [10_000, 25_050, 1, 99_999] {
        ids.push(ledger.add_payment(pay(invoice.id, cents)).await.unwrap().id);
    }
    ledger.reverse_payment(ids[1]).await.unwrap();
    ledger.add_payment(pay(invoice.id, 7_500)).await.unwrap();
    ledger.reverse_payment(ids[2]).await.unwrap();

    let current = ledger.get_invoice(invoice.id).await.unwrap();
    let recorded = ledger.total_paid(invoice.id).await.unwrap();
    assert_eq!(current.amount_paid(), recorded);
    assert_eq!(recorded, Money::from_cents(10_000 + 99_999 + 7_500));
    assert_eq!(current.status, InvoiceStatus::Partial);
}

#[tokio::test]
async fn test_subtotal_edit_retaxes_and_settles() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 100_000)).await.unwrap();
    ledger.add_payment(pay(invoice.id, 57_488)).await.unwrap();

    let changes = InvoiceChanges {
        subtotal: Some(Money::from_cents(50_000)),
        ..Default::default()
    };
    let updated = ledger.update_invoice(invoice.id, changes).await.unwrap();
    assert_eq!(updated.total_cents, 57_488);
    assert_eq!(updated.status, InvoiceStatus::Paid);

    // Cannot shrink below what was already collected
    let changes = InvoiceChanges {
        subtotal: Some(Money::from_cents(10_000)),
        ..Default::default()
    };
    let err = ledger.update_invoice(invoice.id, changes).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
}

#[tokio::test]
async fn test_explicit_paid_status_requires_full_payment() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();
    ledger.mark_sent(invoice.id).await.unwrap();

    let changes = InvoiceChanges {
        status: Some(InvoiceStatus::Paid),
        ..Default::default()
    };
    let err = ledger.update_invoice(invoice.id, changes).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InconsistentStatus);

    let changes = InvoiceChanges {
        status: Some(InvoiceStatus::Overdue),
        ..Default::default()
    };
    let overdue = ledger.update_invoice(invoice.id, changes).await.unwrap();
    assert_eq!(overdue.status, InvoiceStatus::Overdue);
}

#[tokio::test]
async fn test_send_only_from_draft() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 10_000)).await.unwrap();
    ledger.mark_sent(invoice.id).await.unwrap();

    let err = ledger.mark_sent(invoice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn test_numbering_restarts_each_month() {
    let (ledger, clock) = setup().await;
    ledger.create_invoice(invoice_for(1, 1_000)).await.unwrap();
    ledger.create_invoice(invoice_for(1, 1_000)).await.unwrap();

    clock.set(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    let february = ledger.create_invoice(invoice_for(1, 1_000)).await.unwrap();
    assert_eq!(february.invoice_number, "FE-202502-0001");
}

#[tokio::test]
async fn test_session_removal_detaches_invoices() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 1_000)).await.unwrap();
    assert_eq!(invoice.session_id, Some(7));

    assert_eq!(ledger.detach_session(7).await.unwrap(), 1);
    assert_eq!(ledger.get_invoice(invoice.id).await.unwrap().session_id, None);
}

#[tokio::test]
async fn test_stats_and_error_report() {
    let (ledger, _) = setup().await;
    let a = ledger.create_invoice(invoice_for(1, 100_000)).await.unwrap();
    let b = ledger.create_invoice(invoice_for(2, 100_000)).await.unwrap();
    ledger.add_payment(pay(a.id, 114_975)).await.unwrap();
    ledger.add_payment(pay(b.id, 14_975)).await.unwrap();

    let stats = ledger.stats().await.unwrap();
    assert_eq!(stats.total_invoices, 2);
    assert_eq!(stats.paid, 1);
    assert_eq!(stats.partial, 1);
    assert_eq!(stats.total_billed, Money::from_cents(229_950));
    assert_eq!(stats.total_collected, Money::from_cents(129_950));
    assert_eq!(stats.balance_due, Money::from_cents(100_000));

    let err = ledger.get_invoice(404).await.unwrap_err();
    let report = serde_json::to_value(err.report()).unwrap();
    assert_eq!(report["kind"], "NOT_FOUND");
    assert_eq!(report["message"], "Invoice not found: 404");
}

#[tokio::test]
async fn test_sent_invoice_without_payments_is_deleted() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(2, 5_000)).await.unwrap();
    ledger.mark_sent(invoice.id).await.unwrap();

    ledger.delete_invoice(invoice.id).await.unwrap();
    assert_eq!(ledger.stats().await.unwrap().total_invoices, 0);
}

#[tokio::test]
async fn test_single_payment_then_reversal_restores_draft_balance() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(1, 100_000)).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.subtotal_cents, 100_000);
    assert_eq!(invoice.gst_cents, 5_000);
    assert_eq!(invoice.qst_cents, 9_975);
    assert_eq!(invoice.total_cents, 114_975);

    let payment = ledger.add_payment(pay(invoice.id, 114_975)).await.unwrap();
    let paid = ledger.get_invoice(invoice.id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.paid_date, Some(jan(10)));
    assert!(ledger.get_balance(invoice.id).await.unwrap().is_zero());

    let reversed = ledger.reverse_payment(payment.id).await.unwrap();
    assert_eq!(reversed.status, InvoiceStatus::Sent);
    assert!(reversed.paid_date.is_none());
    assert_eq!(reversed.amount_paid_cents, 0);
    assert_eq!(ledger.get_balance(invoice.id).await.unwrap(), Money::from_cents(114_975));
}

#[tokio::test]
async fn test_overdue_invoice_reopens_as_sent_when_payments_reversed() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(2, 100_000)).await.unwrap();
    ledger.mark_sent(invoice.id).await.unwrap();
    let payment = ledger.add_payment(pay(invoice.id, 20_000)).await.unwrap();

    let changes = InvoiceChanges {
        status: Some(InvoiceStatus::Overdue),
        ..Default::default()
    };
    let overdue = ledger.update_invoice(invoice.id, changes).await.unwrap();
    assert_eq!(overdue.status, InvoiceStatus::Overdue);

    let reopened = ledger.reverse_payment(payment.id).await.unwrap();
    assert_eq!(reopened.status, InvoiceStatus::Sent);
    assert!(reopened.paid_date.is_none());
    assert_eq!(reopened.amount_paid_cents, 0);
}

#[tokio::test]
async fn test_payment_near_i64_max_is_rejected() {
    let (ledger, _) = setup().await;
    let invoice = ledger.create_invoice(invoice_for(3, 10_000)).await.unwrap();
    ledger.add_payment(pay(invoice.id, 1_000)).await.unwrap();

    let err = ledger.add_payment(pay(invoice.id, i64::MAX)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OverpaymentRejected);
    assert_eq!(ledger.get_invoice(invoice.id).await.unwrap().amount_paid_cents, 1_000);
}

//! # Invoice Sequence
//!
//! Month-scoped counters behind invoice numbers.
//!
//! ```text
//! invoice_sequences
//! ┌──────────────┬────────────┐
//! │ period       │ last_value │
//! ├──────────────┼────────────┤
//! │ FE-202412-   │ 318        │
//! │ FE-202501-   │ 42         │
//! └──────────────┴────────────┘
//! ```
//!
//! Always called inside the creating transaction, as its first statement.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use ledger_core::numbering;

/// Reserves the next sequence value of `series`.
///
/// The upsert takes SQLite's write lock, so no other allocation can read
/// the same state until this transaction ends. The counter is then
/// reconciled with the highest number already present in `invoices`.
pub(crate) async fn allocate(conn: &mut SqliteConnection, series: &str) -> DbResult<i64> {
    let counter: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (period, last_value) VALUES (?1, 1)
        ON CONFLICT(period) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(series)
    .fetch_one(&mut *conn)
    .await?;

    // Length first: "…-10000" must sort after "…-9999"
    let last_issued: Option<String> = sqlx::query_scalar(
        r#"
        SELECT invoice_number FROM invoices
        WHERE substr(invoice_number, 1, length(?1)) = ?1
        ORDER BY length(invoice_number) DESC, invoice_number DESC
        LIMIT 1
        "#,
    )
    .bind(series)
    .fetch_optional(&mut *conn)
    .await?;

    let next = numbering::next_sequence(counter, last_issued.as_deref(), series);

    if next != counter {
        debug!(series, counter, next, "Sequence behind issued numbers, advancing");
        sqlx::query("UPDATE invoice_sequences SET last_value = ?2 WHERE period = ?1")
            .bind(series)
            .bind(next)
            .execute(&mut *conn)
            .await?;
    }

    Ok(next)
}

/// Last value handed out for `series`, if any.
pub async fn current(pool: &SqlitePool, series: &str) -> DbResult<Option<i64>> {
    let value = sqlx::query_scalar("SELECT last_value FROM invoice_sequences WHERE period = ?1")
        .bind(series)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

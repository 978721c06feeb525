//! # Seed Data Generator
//!
//! Fills a development ledger with invoices and payments.
//!
//! ## Usage
//! ```bash
//! # 200 invoices (default) into ./ledger_dev.db
//! cargo run -p ledger-engine --bin seed
//!
//! # Custom amount and database
//! cargo run -p ledger-engine --bin seed -- --count 1000 --db ./data/ledger.db
//! ```
//!
//! ## Generated Data
//! - Students 1..=50, sessions 1..=10 in an in-memory directory
//! - Subtotals between $150.00 and $2,400.00
//! - Roughly a third sent and partly paid, a third fully paid,
//!   one in fifteen cancelled, the rest left as drafts

use std::env;
use std::sync::Arc;

use ledger_core::numbering;
use ledger_core::{CreateInvoice, Money, RecordPayment, PAYMENT_METHODS};
use ledger_db::repository::sequence;
use ledger_engine::telemetry::init_tracing;
use ledger_engine::{InMemoryDirectory, Ledger, LedgerConfig};

const STUDENTS: i64 = 50;
const SESSIONS: i64 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = LedgerConfig::from_env_or("./ledger_dev.db")?;
    let mut count: usize = 200;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Institute Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: $LEDGER_DATABASE_PATH or ./ledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Institute Ledger Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", config.database_path.display());
    println!("Invoices: {}", count);
    println!();

    let directory = Arc::new(InMemoryDirectory::with_records(1..=STUDENTS, 1..=SESSIONS));
    let ledger = Ledger::open(&config, directory).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = ledger.stats().await?;
    if existing.total_invoices > 0 {
        println!("⚠ Database already has {} invoices", existing.total_invoices);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating invoices...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut payments = 0;

    for seed in 0..count {
        let request = CreateInvoice {
            student_id: (seed as i64 % STUDENTS) + 1,
            session_id: (seed % 3 != 0).then(|| (seed as i64 % SESSIONS) + 1),
            subtotal: Money::from_cents(15_000 + ((seed as i64 * 7_919) % 225_000)),
            description: Some(format!("Training fees #{}", seed + 1)),
            due_date: None,
        };

        let invoice = match ledger.create_invoice(request).await {
            Ok(invoice) => invoice,
            Err(e) => {
                eprintln!("Failed to create invoice {}: {}", seed + 1, e);
                continue;
            }
        };
        generated += 1;

        match seed % 15 {
            0 => {
                ledger.cancel_invoice(invoice.id).await?;
            }
            s if s % 3 == 1 => {
                ledger.mark_sent(invoice.id).await?;
                let partial = Money::from_cents(invoice.total_cents / 3);
                ledger.add_payment(payment(invoice.id, partial, seed)).await?;
                payments += 1;
            }
            s if s % 3 == 2 => {
                ledger.mark_sent(invoice.id).await?;
                ledger.add_payment(payment(invoice.id, invoice.total(), seed)).await?;
                payments += 1;
            }
            _ => {}
        }

        if generated % 50 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} invoices and {} payments in {:?}", generated, payments, elapsed);

    let series = numbering::series_prefix(&config.invoice_prefix, chrono::Utc::now().date_naive());
    if let Some(last) = sequence::current(ledger.database().pool(), &series).await? {
        println!("  Last number issued: {}", numbering::format_number(&series, last));
    }

    println!();
    println!("Billing stats:");
    println!("{}", serde_json::to_string_pretty(&ledger.stats().await?)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn payment(invoice_id: i64, amount: Money, seed: usize) -> RecordPayment {
    RecordPayment {
        invoice_id,
        amount,
        method: PAYMENT_METHODS[seed % PAYMENT_METHODS.len()].to_string(),
        reference: None,
        notes: None,
        payment_date: None,
    }
}

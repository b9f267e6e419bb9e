//! # Seed Data Generator
//!
//! Populates a ledger database with sample categories and expenses through
//! the generic repositories, then prints the first page as JSON.
//!
//! ## Usage
//! ```bash
//! # 500 expenses into ./strata.db (or $STRATA_DB_PATH)
//! cargo run -p strata-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p strata-db --bin seed -- --count 5000 --db ./data/ledger.db
//!
//! # See what the repositories do
//! RUST_LOG=strata_db=debug cargo run -p strata-db --bin seed
//! ```

use std::env;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use strata_db::sample::{Category, Expense, LEDGER_MIGRATOR};
use strata_db::{CommandRepository, Database, DbConfig, Filter, PageRequest, QueryRepository};

/// Categories with monthly budgets in cents
const CATEGORIES: &[(&str, i64)] = &[
    ("Groceries", 60_000),
    ("Rent", 150_000),
    ("Transport", 12_000),
    ("Utilities", 20_000),
    ("Dining", 25_000),
    ("Health", 10_000),
];

/// Descriptions cycled through for generated expenses
const DESCRIPTIONS: &[&str] = &[
    "Weekly shop",
    "Monthly payment",
    "Bus pass",
    "Electricity bill",
    "Dinner out",
    "Pharmacy",
    "Coffee",
    "Taxi",
];

const DEFAULT_COUNT: usize = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = parse_count(&args[i + 1]);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("strata ledger seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of expenses to generate (default: {})", DEFAULT_COUNT);
                println!("  -d, --db <PATH>    Database file path (default: $STRATA_DB_PATH or ./strata.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = DbConfig::from_env()?;
    if let Some(path) = db_path {
        config.database_path = path.into();
    }
    config.validate()?;

    info!(path = %config.database_path.display(), count, "Seeding ledger");

    let db = Database::new(config.migrations(&LEDGER_MIGRATOR)).await?;
    let categories = db.repository::<Category>()?;
    let expenses = db.repository::<Expense>()?;

    if categories.any(None, None).await? {
        let existing = expenses.count(None, None).await?;
        warn!(existing, "Ledger already seeded; delete the database file to regenerate");
        db.close().await;
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut tx = db.begin().await?;

    let seeded: Vec<Category> = CATEGORIES
        .iter()
        .map(|(name, budget)| Category::new(*name, *budget))
        .collect();
    categories.insert_many(&seeded, Some(&mut *tx)).await?;
    let stored = categories.get_all(Some(&mut *tx)).await?;

    let now = Utc::now();
    let batch: Vec<Expense> = (0..count)
        .map(|n| {
            let category = &stored[n % stored.len()];
            let expense = Expense::new(
                &category.id,
                DESCRIPTIONS[n % DESCRIPTIONS.len()],
                250 + ((n as i64 * 137) % 9_750),
                now - Duration::minutes(n as i64 * 37),
            );
            if n % 10 == 0 {
                expense.with_note("reimbursable")
            } else {
                expense
            }
        })
        .collect();
    let written = expenses.insert_many(&batch, Some(&mut *tx)).await?;

    tx.commit().await?;
    info!(
        categories = stored.len(),
        expenses = written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed committed"
    );

    let reimbursable = Filter::eq("note", "reimbursable");
    let summary = serde_json::json!({
        "categories": categories.count(None, None).await?,
        "expenses": expenses.count(None, None).await?,
        "reimbursable": expenses.count(Some(&reimbursable), None).await?,
        "first_page": expenses.get_all_paged(PageRequest::page(1, 5), None).await?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}

/// Parses `--count`, falling back to the default with a warning.
fn parse_count(raw: &str) -> usize {
    match raw.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            warn!(value = raw, default = DEFAULT_COUNT, "Invalid --count, using default");
            DEFAULT_COUNT
        }
    }
}

/// Initializes tracing from `RUST_LOG`, defaulting to INFO.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,strata_db=info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

//! # Sample Ledger Schema
//!
//! A small two-table schema used by the `seed` binary and the repository
//! tests. It covers both key strategies:
//!
//! ```text
//! ┌──────────────────────────┐          ┌──────────────────────────────────┐
//! │ categories               │          │ expenses                         │
//! │──────────────────────────│          │──────────────────────────────────│
//! │ id TEXT  (UUID v4, app)  │◄─────────│ category_id TEXT                 │
//! │ name TEXT UNIQUE         │          │ id INTEGER (rowid, SQLite)       │
//! │ budget_cents INTEGER     │          │ description, amount_cents,       │
//! └──────────────────────────┘          │ spent_at, note                   │
//!                                       └──────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::migrate::Migrator;

use strata_core::{Entity, Value};

/// Embedded migrations for the sample schema.
pub static LEDGER_MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// A spending category. The key is a UUID string generated on insert.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub budget_cents: i64,
}

impl Category {
    /// Creates a category with an unset key.
    pub fn new(name: impl Into<String>, budget_cents: i64) -> Self {
        Category {
            id: String::new(),
            name: name.into(),
            budget_cents,
        }
    }
}

impl Entity for Category {
    type Key = String;
    const TABLE: &'static str = "categories";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["name", "budget_cents"];

    fn key(&self) -> String {
        self.id.clone()
    }

    fn values(&self) -> Vec<Value> {
        vec![self.name.as_str().into(), self.budget_cents.into()]
    }
}

/// A single expense. The key is the SQLite rowid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Expense {
    pub id: i64,
    pub category_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub spent_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl Expense {
    /// Creates an expense with an unset key and no note.
    pub fn new(
        category_id: impl Into<String>,
        description: impl Into<String>,
        amount_cents: i64,
        spent_at: DateTime<Utc>,
    ) -> Self {
        Expense {
            id: 0,
            category_id: category_id.into(),
            description: description.into(),
            amount_cents,
            spent_at,
            note: None,
        }
    }

    /// Attaches a free-form note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl Entity for Expense {
    type Key = i64;
    const TABLE: &'static str = "expenses";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "category_id",
        "description",
        "amount_cents",
        "spent_at",
        "note",
    ];

    fn key(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.category_id.as_str().into(),
            self.description.as_str().into(),
            self.amount_cents.into(),
            self.spent_at.into(),
            self.note.clone().into(),
        ]
    }
}

//! # strata-db: SQLite Repositories
//!
//! Generic command/query repositories over SQLite, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        strata Data Flow                                 │
//! │                                                                         │
//! │  Application code (generic over R: Repository<E>)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     strata-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Repository   │    │    Store      │    │   Database   │  │   │
//! │  │   │ (repository/) │───►│  (store/)     │───►│  (pool.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlRepository │    │ SqliteStore   │    │ SqlitePool   │  │   │
//! │  │   │ Blocking...   │    │ SQL + binds   │    │ migrations   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or :memory:                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `DbConfig`, builder and environment loading
//! - [`pool`] - Connection pool, transactions, shutdown
//! - [`migrations`] - Running caller-supplied embedded migrations
//! - [`error`] - `StorageError` and `RepoError`
//! - [`store`] - The `Store` collaborator and its SQLite implementation
//! - [`repository`] - Repository traits, `SqlRepository`, `BlockingRepository`
//! - [`sample`] - A small ledger schema used by the seed binary and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_db::{Database, DbConfig, QueryRepository, CommandRepository};
//! use strata_db::sample::{Category, LEDGER_MIGRATOR};
//!
//! let db = Database::new(DbConfig::new("ledger.db").migrations(&LEDGER_MIGRATOR)).await?;
//! let categories = db.repository::<Category>()?;
//!
//! let id = categories.upsert(&Category::new("Food", 40_000), None).await?;
//! let food = categories.find(&id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sample;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DbConfig};
pub use error::{RepoError, RepoResult, StorageError, StorageResult};
pub use pool::Database;
pub use repository::{
    BlockingRepository, CommandRepository, ConnectionScope, QueryRepository, Repository,
    SqlRepository,
};
pub use store::{SqliteStore, Store};

// Core types, so most callers need only this crate
pub use strata_core::{
    CompareOp, Entity, EntityMap, Filter, GeneratedKey, MappingError, PageRequest, Paged, RepoKey,
    Value,
};

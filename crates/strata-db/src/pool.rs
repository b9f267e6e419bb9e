//! # Database Pool Management
//!
//! Connection pool creation, transactions and shutdown for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Application startup                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) / DbConfig::from_env()                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                          │                                      │
//! │       ▼                          ▼                                      │
//! │  db.repository::<Expense>()   db.begin() → Transaction                 │
//! │  (shares the pool)            (passed as `Some(&mut *tx)` to calls)    │
//! │                                                                         │
//! │  db.close() ← once, at shutdown. A second call is a no-op.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases use WAL (Write-Ahead Logging) so readers don't block
//! writers and writers don't block readers.

use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use strata_core::Entity;

use crate::config::DbConfig;
use crate::error::{RepoResult, StorageError, StorageResult};
use crate::migrations;
use crate::repository::SqlRepository;
use crate::store::SqliteStore;

// =============================================================================
// Database
// =============================================================================

/// Main database handle: the pool plus its shutdown state.
///
/// Cloning is cheap and every clone shares the same pool and the same
/// closed flag.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./ledger.db")).await?;
/// let expenses = db.repository::<Expense>()?;
///
/// let mut tx = db.begin().await?;
/// expenses.insert(&expense, Some(&mut *tx)).await?;
/// tx.commit().await?;
///
/// db.close().await;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Set by the first `close()`.
    closed: Arc<AtomicBool>,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads (file databases)
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs the configured migrations, if any
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(StorageError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> StorageResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let in_memory = config.is_in_memory();

        let base_options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?
        } else {
            // sqlite://path creates file if not exists
            let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());
            SqliteConnectOptions::from_str(&connect_url)
                .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?
                .journal_mode(SqliteJournalMode::Wal)
                .create_if_missing(true)
        };

        let connect_options = base_options
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has foreign keys disabled by default for backwards compatibility
            .foreign_keys(true);

        debug!(in_memory, "Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        // An in-memory database lives exactly as long as its one connection
        pool_options = if in_memory {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            closed: Arc::new(AtomicBool::new(false)),
        };

        if let Some(migrator) = config.migrator {
            db.run_migrations(migrator).await?;
        }

        Ok(db)
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Database {
            closed: Arc::new(AtomicBool::new(pool.is_closed())),
            pool,
        }
    }

    /// Runs database migrations.
    ///
    /// ## When To Call
    /// - Automatically called by `new()` when the config carries a migrator
    /// - Manually, for migrators not known at connect time
    pub async fn run_migrations(&self, migrator: &Migrator) -> StorageResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool, migrator).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns (total, applied) migration counts for `migrator`.
    pub async fn migration_status(&self, migrator: &Migrator) -> StorageResult<(usize, usize)> {
        migrations::migration_status(&self.pool, migrator).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// ## Usage
    /// For hand-written queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquires a pooled connection.
    pub async fn acquire(&self) -> StorageResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Begins a transaction.
    ///
    /// Pass `Some(&mut *tx)` to repository calls to run them on it. The
    /// caller commits or rolls back; repositories never do.
    pub async fn begin(&self) -> StorageResult<Transaction<'static, Sqlite>> {
        debug!("Beginning transaction");
        self.pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))
    }

    /// Returns a repository for `E` that shares this pool.
    ///
    /// Closing the returned repository leaves the pool open.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let expenses = db.repository::<Expense>()?;
    /// let total = expenses.count(None, None).await?;
    /// ```
    pub fn repository<E>(&self) -> RepoResult<SqlRepository<E>>
    where
        E: Entity + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
    {
        Ok(SqlRepository::new(SqliteStore::shared(self.clone())?))
    }

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// Only the first call closes the pool; later calls log and return.
    /// After closing, every store call fails with
    /// `StorageError::ConnectionFailed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("Database pool already closed");
            return;
        }
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Returns true once `close()` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.pool.is_closed()
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Blocking Repository
//!
//! Synchronous face of [`SqlRepository`] for callers without an async
//! runtime (scripts, CLIs, desktop command handlers).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BlockingRepository<E>                                                  │
//! │  ├── runtime: Arc<Runtime>      current-thread, shared with siblings   │
//! │  └── inner: SqlRepository<E>    created inside that runtime            │
//! │                                                                         │
//! │  repo.insert(&e, None)  ──►  runtime.block_on(inner.insert(&e, None))  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Must not be called from inside an async runtime: `block_on` panics there.

use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Sqlite, SqliteConnection, Transaction};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use strata_core::{Entity, Filter, PageRequest, Paged};

use super::{CommandRepository, QueryRepository, SqlRepository};
use crate::config::DbConfig;
use crate::error::{RepoResult, StorageError, StorageResult};
use crate::pool::Database;

/// Blocking repository for `E` over SQLite.
///
/// ## Usage
/// ```rust,ignore
/// let categories = BlockingRepository::<Category>::connect(config)?;
/// let expenses = categories.repository::<Expense>()?; // same pool, same runtime
///
/// let mut tx = categories.begin()?;
/// let food = categories.insert(&Category::new("Food", 0), Some(&mut *tx))?;
/// expenses.insert(&Expense::new(&food, "Lunch", 1250, now), Some(&mut *tx))?;
/// categories.commit(tx)?;
///
/// categories.close();
/// ```
pub struct BlockingRepository<E> {
    runtime: Arc<Runtime>,
    inner: SqlRepository<E>,
}

impl<E> BlockingRepository<E>
where
    E: Entity + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
    /// Builds a runtime, opens a pool from `config`, and returns a repository
    /// that owns the pool.
    pub fn connect(config: DbConfig) -> RepoResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Internal(format!("failed to build runtime: {}", e)))?;

        let inner = runtime.block_on(SqlRepository::connect(config))?;
        debug!(table = E::TABLE, "Blocking repository connected");

        Ok(BlockingRepository {
            runtime: Arc::new(runtime),
            inner,
        })
    }

    /// Returns a repository for another entity on the same pool and runtime.
    ///
    /// Closing the returned repository leaves the pool open.
    pub fn repository<T>(&self) -> RepoResult<BlockingRepository<T>>
    where
        T: Entity + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
    {
        Ok(BlockingRepository {
            runtime: Arc::clone(&self.runtime),
            inner: self.inner.database().repository::<T>()?,
        })
    }

    /// The async repository this one drives.
    pub fn inner(&self) -> &SqlRepository<E> {
        &self.inner
    }

    /// The database this repository runs on.
    pub fn database(&self) -> &Database {
        self.inner.database()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Begins a transaction. Pass `Some(&mut *tx)` to calls on any repository
    /// that shares this pool.
    pub fn begin(&self) -> StorageResult<Transaction<'static, Sqlite>> {
        self.runtime.block_on(self.inner.begin())
    }

    /// Commits a transaction from [`begin`](Self::begin).
    pub fn commit(&self, tx: Transaction<'static, Sqlite>) -> StorageResult<()> {
        self.runtime
            .block_on(tx.commit())
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))
    }

    /// Rolls back a transaction from [`begin`](Self::begin).
    pub fn rollback(&self, tx: Transaction<'static, Sqlite>) -> StorageResult<()> {
        self.runtime
            .block_on(tx.rollback())
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn insert(&self, entity: &E, tx: Option<&mut SqliteConnection>) -> RepoResult<E::Key> {
        self.runtime.block_on(self.inner.insert(entity, tx))
    }

    pub fn insert_many(&self, entities: &[E], tx: Option<&mut SqliteConnection>) -> RepoResult<u64> {
        self.runtime.block_on(self.inner.insert_many(entities, tx))
    }

    pub fn update(&self, entity: &E, tx: Option<&mut SqliteConnection>) -> RepoResult<bool> {
        self.runtime.block_on(self.inner.update(entity, tx))
    }

    pub fn update_many(&self, entities: &[E], tx: Option<&mut SqliteConnection>) -> RepoResult<u64> {
        self.runtime.block_on(self.inner.update_many(entities, tx))
    }

    pub fn upsert(&self, entity: &E, tx: Option<&mut SqliteConnection>) -> RepoResult<E::Key> {
        self.runtime.block_on(self.inner.upsert(entity, tx))
    }

    pub fn upsert_many(&self, entities: &[E], tx: Option<&mut SqliteConnection>) -> RepoResult<u64> {
        self.runtime.block_on(self.inner.upsert_many(entities, tx))
    }

    pub fn delete(&self, entity: &E, tx: Option<&mut SqliteConnection>) -> RepoResult<bool> {
        self.runtime.block_on(self.inner.delete(entity, tx))
    }

    pub fn delete_many(&self, entities: &[E], tx: Option<&mut SqliteConnection>) -> RepoResult<bool> {
        self.runtime.block_on(self.inner.delete_many(entities, tx))
    }

    pub fn delete_where(&self, filter: &Filter, tx: Option<&mut SqliteConnection>) -> RepoResult<bool> {
        self.runtime.block_on(self.inner.delete_where(filter, tx))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn any(&self, filter: Option<&Filter>, tx: Option<&mut SqliteConnection>) -> RepoResult<bool> {
        self.runtime.block_on(self.inner.any(filter, tx))
    }

    pub fn count(&self, filter: Option<&Filter>, tx: Option<&mut SqliteConnection>) -> RepoResult<i64> {
        self.runtime.block_on(self.inner.count(filter, tx))
    }

    pub fn find(&self, key: &E::Key, tx: Option<&mut SqliteConnection>) -> RepoResult<Option<E>> {
        self.runtime.block_on(self.inner.find(key, tx))
    }

    pub fn first(
        &self,
        filter: Option<&Filter>,
        tx: Option<&mut SqliteConnection>,
    ) -> RepoResult<Option<E>> {
        self.runtime.block_on(self.inner.first(filter, tx))
    }

    pub fn get_all(&self, tx: Option<&mut SqliteConnection>) -> RepoResult<Vec<E>> {
        self.runtime.block_on(self.inner.get_all(tx))
    }

    pub fn get(&self, filter: &Filter, tx: Option<&mut SqliteConnection>) -> RepoResult<Vec<E>> {
        self.runtime.block_on(self.inner.get(filter, tx))
    }

    pub fn get_all_paged(
        &self,
        page: PageRequest,
        tx: Option<&mut SqliteConnection>,
    ) -> RepoResult<Paged<E>> {
        self.runtime.block_on(self.inner.get_all_paged(page, tx))
    }

    pub fn get_paged(
        &self,
        filter: &Filter,
        page: PageRequest,
        tx: Option<&mut SqliteConnection>,
    ) -> RepoResult<Paged<E>> {
        self.runtime.block_on(self.inner.get_paged(filter, page, tx))
    }

    /// Closes the pool if this repository owns it.
    pub fn close(self) {
        let BlockingRepository { runtime, inner } = self;
        runtime.block_on(inner.close());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

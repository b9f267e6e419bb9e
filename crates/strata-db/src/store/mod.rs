//! # Store Collaborator
//!
//! A `Store` is the mapper a repository forwards to. It turns entities,
//! filters and pages into statements for one database and runs them, either
//! on a caller-supplied connection (a transaction) or on a connection it
//! acquires for that single call.
//!
//! ## Responsibility Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SqlRepository<E>                 Store<E>                            │
//! │   ───────────────────              ──────────────────────              │
//! │   • upsert decision                • SQL text                          │
//! │   • key generation/coercion        • parameter binding                 │
//! │   • batch partitioning             • row decoding                      │
//! │   • count + page composition       • connection acquisition            │
//! │   • empty-input short cuts         • filter translation                │
//! │                                                                         │
//! │   Never sees SQL.                  Never decides insert vs update.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod sqlite;

use async_trait::async_trait;
use strata_core::{Entity, Filter, GeneratedKey, PageRequest, Value};

use crate::error::RepoResult;

pub use sqlite::SqliteStore;

/// Storage operations for one entity type.
///
/// Every method takes an optional connection. `Some` runs the statement on
/// it (typically a transaction the caller owns); `None` lets the store pick a
/// connection for that call alone.
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    /// Connection type that carries a caller's transaction.
    type Connection: Send;

    /// Inserts one row.
    ///
    /// `key` is written to the key column when present; when absent the
    /// column is omitted and the store assigns the key.
    async fn insert(
        &self,
        conn: Option<&mut Self::Connection>,
        key: Option<Value>,
        entity: &E,
    ) -> RepoResult<GeneratedKey>;

    /// Inserts many rows, preserving input order. Returns rows written.
    async fn insert_all(
        &self,
        conn: Option<&mut Self::Connection>,
        rows: &[(Option<Value>, &E)],
    ) -> RepoResult<u64>;

    /// Updates the row with the entity's key. Returns false if none matched.
    async fn update(&self, conn: Option<&mut Self::Connection>, entity: &E) -> RepoResult<bool>;

    /// Deletes the row with the given key. Returns false if none matched.
    async fn delete(&self, conn: Option<&mut Self::Connection>, key: &E::Key) -> RepoResult<bool>;

    /// Deletes every row matching `filter`. Returns rows deleted.
    async fn delete_where(
        &self,
        conn: Option<&mut Self::Connection>,
        filter: &Filter,
    ) -> RepoResult<u64>;

    /// Point lookup by key.
    async fn get(&self, conn: Option<&mut Self::Connection>, key: &E::Key)
        -> RepoResult<Option<E>>;

    /// Lists rows matching `filter` (all rows when `None`), optionally paged.
    async fn select(
        &self,
        conn: Option<&mut Self::Connection>,
        filter: Option<&Filter>,
        page: Option<PageRequest>,
    ) -> RepoResult<Vec<E>>;

    /// First row matching `filter`, in unspecified order.
    async fn first(
        &self,
        conn: Option<&mut Self::Connection>,
        filter: Option<&Filter>,
    ) -> RepoResult<Option<E>>;

    /// Counts rows matching `filter`.
    async fn count(
        &self,
        conn: Option<&mut Self::Connection>,
        filter: Option<&Filter>,
    ) -> RepoResult<i64>;

    /// Returns true if any row matches `filter`.
    async fn exists(
        &self,
        conn: Option<&mut Self::Connection>,
        filter: Option<&Filter>,
    ) -> RepoResult<bool>;

    /// Releases resources the store owns. Shared resources stay open.
    async fn close(&self);
}

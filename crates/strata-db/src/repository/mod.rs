//! # Repository Module
//!
//! Generic repository interfaces and their SQL implementation.
//!
//! ## Interface Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                     ConnectionScope                                    │
//! │                     type Connection  (what a transaction derefs to)    │
//! │                        ▲          ▲                                     │
//! │                        │          │                                     │
//! │       CommandRepository<E>      QueryRepository<E>                     │
//! │       insert / insert_many      any / count                            │
//! │       update / update_many      find / first                           │
//! │       upsert / upsert_many      get_all / get                          │
//! │       delete / delete_many      get_all_paged / get_paged              │
//! │       delete_where                                                     │
//! │                        ▲          ▲                                     │
//! │                        └────┬─────┘                                     │
//! │                      Repository<E>  (blanket: both of the above)       │
//! │                             ▲                                           │
//! │                             │                                           │
//! │                   SqlRepository<E, S = SqliteStore<E>>                 │
//! │                             ▲                                           │
//! │                             │ wraps, with its own runtime               │
//! │                   BlockingRepository<E>                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes the transaction handle last, as
//! `Option<&mut Self::Connection>`. `None` runs the call on its own pooled
//! connection. Repositories never begin, commit or roll back a transaction
//! they were handed.

pub mod blocking;
pub mod generic;

use async_trait::async_trait;
use strata_core::{Entity, Filter, PageRequest, Paged};

use crate::error::RepoResult;

pub use blocking::BlockingRepository;
pub use generic::SqlRepository;

/// Names the connection type a repository's transaction handle derefs to.
pub trait ConnectionScope {
    type Connection: Send;
}

/// Write operations.
#[async_trait]
pub trait CommandRepository<E: Entity>: ConnectionScope + Send + Sync {
    /// Inserts one entity and returns its key.
    ///
    /// A set key is written as-is. An unset key is generated client-side when
    /// the key type can (`RepoKey::generate`), otherwise the store assigns it
    /// and it is coerced back with `RepoKey::from_generated`.
    async fn insert(&self, entity: &E, tx: Option<&mut Self::Connection>) -> RepoResult<E::Key>;

    /// Inserts a batch in input order. Returns rows written.
    ///
    /// No cross-row atomicity unless `tx` is given.
    async fn insert_many(&self, entities: &[E], tx: Option<&mut Self::Connection>)
        -> RepoResult<u64>;

    /// Updates the row with the entity's key. `false` means no such row.
    async fn update(&self, entity: &E, tx: Option<&mut Self::Connection>) -> RepoResult<bool>;

    /// Updates each entity in input order. Returns how many matched a row.
    ///
    /// The first error stops the loop; earlier updates stand unless `tx`
    /// is rolled back by the caller.
    async fn update_many(&self, entities: &[E], tx: Option<&mut Self::Connection>)
        -> RepoResult<u64>;

    /// Inserts if the key is unset, updates otherwise. Returns the key.
    ///
    /// Storage is never consulted to decide: an entity carrying a key that
    /// does not exist is updated, matches nothing, and its key is returned.
    async fn upsert(&self, entity: &E, tx: Option<&mut Self::Connection>) -> RepoResult<E::Key>;

    /// Inserts every unset-key entity as one batch, then updates the rest.
    /// Returns rows affected.
    async fn upsert_many(&self, entities: &[E], tx: Option<&mut Self::Connection>)
        -> RepoResult<u64>;

    /// Deletes the row with the entity's key. `false` means no such row.
    async fn delete(&self, entity: &E, tx: Option<&mut Self::Connection>) -> RepoResult<bool>;

    /// Deletes each entity by key. `true` if at least one row went away.
    async fn delete_many(&self, entities: &[E], tx: Option<&mut Self::Connection>)
        -> RepoResult<bool>;

    /// Deletes every row matching `filter`. `true` if at least one row went away.
    async fn delete_where(&self, filter: &Filter, tx: Option<&mut Self::Connection>)
        -> RepoResult<bool>;
}

/// Read operations.
#[async_trait]
pub trait QueryRepository<E: Entity>: ConnectionScope + Send + Sync {
    /// Returns true if any row matches (any row at all when `filter` is `None`).
    async fn any(&self, filter: Option<&Filter>, tx: Option<&mut Self::Connection>)
        -> RepoResult<bool>;

    /// Counts matching rows.
    async fn count(&self, filter: Option<&Filter>, tx: Option<&mut Self::Connection>)
        -> RepoResult<i64>;

    /// Point lookup. A missing key is `Ok(None)`.
    async fn find(&self, key: &E::Key, tx: Option<&mut Self::Connection>)
        -> RepoResult<Option<E>>;

    /// First matching row. Which row is unspecified when several match.
    async fn first(&self, filter: Option<&Filter>, tx: Option<&mut Self::Connection>)
        -> RepoResult<Option<E>>;

    /// Every row matching `filter`.
    async fn get(&self, filter: &Filter, tx: Option<&mut Self::Connection>) -> RepoResult<Vec<E>>;

    /// One page of rows matching `filter`, plus the total match count.
    ///
    /// ## Consistency
    /// The count and the page are two round trips. Without a shared `tx`,
    /// concurrent writes may make `total` disagree with the page.
    async fn get_paged(
        &self,
        filter: &Filter,
        page: PageRequest,
        tx: Option<&mut Self::Connection>,
    ) -> RepoResult<Paged<E>>;

    /// Every row.
    async fn get_all(&self, tx: Option<&mut Self::Connection>) -> RepoResult<Vec<E>> {
        self.get(&Filter::All, tx).await
    }

    /// One page of all rows, plus the total row count.
    async fn get_all_paged(
        &self,
        page: PageRequest,
        tx: Option<&mut Self::Connection>,
    ) -> RepoResult<Paged<E>> {
        self.get_paged(&Filter::All, page, tx).await
    }
}

/// Full read/write repository.
pub trait Repository<E: Entity>: CommandRepository<E> + QueryRepository<E> {}

impl<E, R> Repository<E> for R
where
    E: Entity,
    R: CommandRepository<E> + QueryRepository<E>,
{
}

//! # Generic SQL Repository
//!
//! One repository type for every entity. It owns the decisions (insert vs.
//! update, key assignment, batch partitioning, count + page composition) and
//! forwards the statements themselves to a [`Store`].
//!
//! ## Upsert Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  upsert(entity)                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  entity.key().is_set() ?  (differs from Default, storage NOT queried)  │
//! │       │                                                                 │
//! │   yes ├──► store.update(entity) ──► return entity.key()                │
//! │       │    (0 rows matched is logged, not an error)                    │
//! │       │                                                                 │
//! │    no └──► insert(entity)                                              │
//! │              ├── Key::generate() = Some(k) → write k, return k         │
//! │              └── None → store assigns rowid → Key::from_generated      │
//! │                                                                         │
//! │  upsert_many([a(unset), b(set), c(unset)])                             │
//! │       stable partition → insert batch [a, c], then update [b]          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::debug;

use strata_core::{Entity, Filter, PageRequest, Paged, RepoKey, Value};

use super::{CommandRepository, ConnectionScope, QueryRepository};
use crate::config::DbConfig;
use crate::error::{RepoResult, StorageResult};
use crate::pool::Database;
use crate::store::{SqliteStore, Store};

/// Repository for `E` backed by store `S`.
///
/// ## Usage
/// ```rust,ignore
/// // Owns its pool: close() shuts it down
/// let expenses = SqlRepository::<Expense>::connect(config).await?;
///
/// let id = expenses.upsert(&Expense::new(food, "Lunch", 1250, now), None).await?;
/// let found = expenses.find(&id, None).await?;
///
/// let page = expenses.get_all_paged(PageRequest::page(1, 20), None).await?;
/// println!("{} of {}", page.len(), page.total);
///
/// expenses.close().await;
/// ```
pub struct SqlRepository<E, S = SqliteStore<E>> {
    store: S,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Store<E>> SqlRepository<E, S> {
    /// Creates a repository over `store`.
    pub fn new(store: S) -> Self {
        SqlRepository {
            store,
            _entity: PhantomData,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Releases what the store owns. Consumes the repository, so it runs once.
    pub async fn close(self) {
        debug!(table = E::TABLE, "Closing repository");
        self.store.close().await;
    }

    async fn insert_refs(
        &self,
        entities: &[&E],
        tx: Option<&mut S::Connection>,
    ) -> RepoResult<u64> {
        let rows: Vec<(Option<Value>, &E)> = entities
            .iter()
            .map(|entity| (assigned_key(*entity).map(|key| key.to_value()), *entity))
            .collect();

        let written = self.store.insert_all(tx, &rows).await?;
        debug!(table = E::TABLE, written, "Inserted batch");
        Ok(written)
    }

    async fn update_refs(
        &self,
        entities: &[&E],
        mut tx: Option<&mut S::Connection>,
    ) -> RepoResult<u64> {
        let mut matched = 0;
        for entity in entities {
            if self.store.update(tx.as_deref_mut(), entity).await? {
                matched += 1;
            }
        }
        debug!(table = E::TABLE, requested = entities.len(), matched, "Updated batch");
        Ok(matched)
    }
}

impl<E> SqlRepository<E, SqliteStore<E>>
where
    E: Entity + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
    /// Opens a pool from `config` and returns a repository that owns it.
    ///
    /// ## Returns
    /// * `Err(RepoError::Storage)` - Pool or migrations failed
    /// * `Err(RepoError::Mapping)` - `E`'s mapping is invalid
    pub async fn connect(config: DbConfig) -> RepoResult<Self> {
        let db = Database::new(config).await?;
        Ok(SqlRepository::new(SqliteStore::owned(db)?))
    }

    /// The database this repository runs on.
    pub fn database(&self) -> &Database {
        self.store.database()
    }

    /// Begins a transaction on this repository's pool.
    pub async fn begin(&self) -> StorageResult<Transaction<'static, Sqlite>> {
        self.store.database().begin().await
    }
}

impl<E, S: Clone> Clone for SqlRepository<E, S> {
    fn clone(&self) -> Self {
        SqlRepository {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, S: fmt::Debug> fmt::Debug for SqlRepository<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlRepository")
            .field("store", &self.store)
            .finish()
    }
}

/// The key an insert writes, or `None` when the store must assign one.
fn assigned_key<E: Entity>(entity: &E) -> Option<E::Key> {
    let key = entity.key();
    if key.is_set() {
        Some(key)
    } else {
        E::Key::generate()
    }
}

impl<E: Entity, S: Store<E>> ConnectionScope for SqlRepository<E, S> {
    type Connection = S::Connection;
}

// =============================================================================
// Commands
// =============================================================================

#[async_trait]
impl<E: Entity, S: Store<E>> CommandRepository<E> for SqlRepository<E, S> {
    async fn insert(&self, entity: &E, tx: Option<&mut S::Connection>) -> RepoResult<E::Key> {
        match assigned_key(entity) {
            Some(key) => {
                self.store.insert(tx, Some(key.to_value()), entity).await?;
                debug!(table = E::TABLE, ?key, "Inserted with assigned key");
                Ok(key)
            }
            None => {
                let generated = self.store.insert(tx, None, entity).await?;
                let key = E::Key::from_generated(generated)?;
                debug!(table = E::TABLE, ?key, "Inserted with store key");
                Ok(key)
            }
        }
    }

    async fn insert_many(&self, entities: &[E], tx: Option<&mut S::Connection>) -> RepoResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let refs: Vec<&E> = entities.iter().collect();
        self.insert_refs(&refs, tx).await
    }

    async fn update(&self, entity: &E, tx: Option<&mut S::Connection>) -> RepoResult<bool> {
        self.store.update(tx, entity).await
    }

    async fn update_many(&self, entities: &[E], tx: Option<&mut S::Connection>) -> RepoResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let refs: Vec<&E> = entities.iter().collect();
        self.update_refs(&refs, tx).await
    }

    async fn upsert(&self, entity: &E, tx: Option<&mut S::Connection>) -> RepoResult<E::Key> {
        let key = entity.key();
        if !key.is_set() {
            return self.insert(entity, tx).await;
        }

        if !self.store.update(tx, entity).await? {
            debug!(table = E::TABLE, ?key, "Upsert matched no row");
        }
        Ok(key)
    }

    async fn upsert_many(
        &self,
        entities: &[E],
        mut tx: Option<&mut S::Connection>,
    ) -> RepoResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }

        let (fresh, keyed): (Vec<&E>, Vec<&E>) =
            entities.iter().partition(|entity| !entity.key().is_set());

        let mut affected = 0;
        if !fresh.is_empty() {
            affected += self.insert_refs(&fresh, tx.as_deref_mut()).await?;
        }
        if !keyed.is_empty() {
            affected += self.update_refs(&keyed, tx).await?;
        }

        debug!(
            table = E::TABLE,
            inserted = fresh.len(),
            updated = keyed.len(),
            "Upserted batch"
        );
        Ok(affected)
    }

    async fn delete(&self, entity: &E, tx: Option<&mut S::Connection>) -> RepoResult<bool> {
        self.store.delete(tx, &entity.key()).await
    }

    async fn delete_many(
        &self,
        entities: &[E],
        mut tx: Option<&mut S::Connection>,
    ) -> RepoResult<bool> {
        if entities.is_empty() {
            return Ok(false);
        }

        let mut deleted_any = false;
        for entity in entities {
            let key = entity.key();
            deleted_any |= self.store.delete(tx.as_deref_mut(), &key).await?;
        }
        Ok(deleted_any)
    }

    async fn delete_where(&self, filter: &Filter, tx: Option<&mut S::Connection>) -> RepoResult<bool> {
        Ok(self.store.delete_where(tx, filter).await? > 0)
    }
}

// =============================================================================
// Queries
// =============================================================================

#[async_trait]
impl<E: Entity, S: Store<E>> QueryRepository<E> for SqlRepository<E, S> {
    async fn any(&self, filter: Option<&Filter>, tx: Option<&mut S::Connection>) -> RepoResult<bool> {
        self.store.exists(tx, filter).await
    }

    async fn count(&self, filter: Option<&Filter>, tx: Option<&mut S::Connection>) -> RepoResult<i64> {
        self.store.count(tx, filter).await
    }

    async fn find(&self, key: &E::Key, tx: Option<&mut S::Connection>) -> RepoResult<Option<E>> {
        self.store.get(tx, key).await
    }

    async fn first(
        &self,
        filter: Option<&Filter>,
        tx: Option<&mut S::Connection>,
    ) -> RepoResult<Option<E>> {
        self.store.first(tx, filter).await
    }

    async fn get(&self, filter: &Filter, tx: Option<&mut S::Connection>) -> RepoResult<Vec<E>> {
        self.store.select(tx, Some(filter), None).await
    }

    async fn get_paged(
        &self,
        filter: &Filter,
        page: PageRequest,
        mut tx: Option<&mut S::Connection>,
    ) -> RepoResult<Paged<E>> {
        let total = self.store.count(tx.as_deref_mut(), Some(filter)).await?;
        let items = self.store.select(tx, Some(filter), Some(page)).await?;

        debug!(
            table = E::TABLE,
            skip = page.skip,
            take = page.take,
            returned = items.len(),
            total,
            "Fetched page"
        );
        Ok(Paged::new(items, total))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RepoError, StorageError};
    use crate::sample::{Category, Expense, LEDGER_MIGRATOR};
    use crate::Repository;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;
    use strata_core::{GeneratedKey, MappingError};

    // -------------------------------------------------------------------------
    // Recording store double
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: String,
    }

    impl Entity for Item {
        type Key = i64;
        const TABLE: &'static str = "items";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["name"];

        fn key(&self) -> i64 {
            self.id
        }

        fn values(&self) -> Vec<Value> {
            vec![self.name.as_str().into()]
        }
    }

    fn item(id: i64, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
        }
    }

    /// Key the double reports as absent on update.
    const MISSING: i64 = 404;
    /// Key the double fails to update.
    const BROKEN: i64 = 13;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Insert(Option<Value>),
        InsertAll(Vec<Option<Value>>),
        Update(i64),
        Delete(i64),
        DeleteWhere,
        Get(i64),
        Select(Option<PageRequest>),
        First,
        Count,
        Exists,
    }

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingStore {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Store<Item> for RecordingStore {
        type Connection = ();

        async fn insert(
            &self,
            _conn: Option<&mut ()>,
            key: Option<Value>,
            _entity: &Item,
        ) -> RepoResult<GeneratedKey> {
            self.record(Call::Insert(key));
            Ok(GeneratedKey::Integer(42))
        }

        async fn insert_all(
            &self,
            _conn: Option<&mut ()>,
            rows: &[(Option<Value>, &Item)],
        ) -> RepoResult<u64> {
            self.record(Call::InsertAll(rows.iter().map(|(k, _)| k.clone()).collect()));
            Ok(rows.len() as u64)
        }

        async fn update(&self, _conn: Option<&mut ()>, entity: &Item) -> RepoResult<bool> {
            self.record(Call::Update(entity.id));
            if entity.id == BROKEN {
                return Err(StorageError::QueryFailed("constraint".to_string()).into());
            }
            Ok(entity.id != MISSING)
        }

        async fn delete(&self, _conn: Option<&mut ()>, key: &i64) -> RepoResult<bool> {
            self.record(Call::Delete(*key));
            Ok(*key != MISSING)
        }

        async fn delete_where(&self, _conn: Option<&mut ()>, _filter: &Filter) -> RepoResult<u64> {
            self.record(Call::DeleteWhere);
            Ok(0)
        }

        async fn get(&self, _conn: Option<&mut ()>, key: &i64) -> RepoResult<Option<Item>> {
            self.record(Call::Get(*key));
            Ok(None)
        }

        async fn select(
            &self,
            _conn: Option<&mut ()>,
            _filter: Option<&Filter>,
            page: Option<PageRequest>,
        ) -> RepoResult<Vec<Item>> {
            self.record(Call::Select(page));
            Ok(vec![item(1, "only")])
        }

        async fn first(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<Option<Item>> {
            self.record(Call::First);
            Ok(None)
        }

        async fn count(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<i64> {
            self.record(Call::Count);
            Ok(9)
        }

        async fn exists(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<bool> {
            self.record(Call::Exists);
            Ok(true)
        }

        async fn close(&self) {}
    }

    fn recording() -> SqlRepository<Item, RecordingStore> {
        SqlRepository::new(RecordingStore::default())
    }

    #[tokio::test]
    async fn test_empty_batches_make_no_store_calls() {
        let repo = recording();

        assert!(!repo.delete_many(&[], None).await.unwrap());
        assert_eq!(repo.insert_many(&[], None).await.unwrap(), 0);
        assert_eq!(repo.update_many(&[], None).await.unwrap(), 0);
        assert_eq!(repo.upsert_many(&[], None).await.unwrap(), 0);

        assert!(repo.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_many_partitions_regardless_of_order() {
        for batch in [
            vec![item(0, "new"), item(7, "old")],
            vec![item(7, "old"), item(0, "new")],
        ] {
            let repo = recording();
            let affected = repo.upsert_many(&batch, None).await.unwrap();

            assert_eq!(affected, 2);
            assert_eq!(
                repo.store().calls(),
                vec![Call::InsertAll(vec![None]), Call::Update(7)]
            );
        }
    }

    #[tokio::test]
    async fn test_upsert_many_keeps_relative_order() {
        let repo = recording();
        let batch = [item(3, "c"), item(0, "x"), item(1, "a"), item(0, "y")];
        repo.upsert_many(&batch, None).await.unwrap();

        assert_eq!(
            repo.store().calls(),
            vec![
                Call::InsertAll(vec![None, None]),
                Call::Update(3),
                Call::Update(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_uses_key_presence_only() {
        let repo = recording();

        // Unset: insert, the store's key comes back
        assert_eq!(repo.upsert(&item(0, "new"), None).await.unwrap(), 42);

        // Set but absent: update misses, key is still returned
        assert_eq!(repo.upsert(&item(MISSING, "ghost"), None).await.unwrap(), MISSING);

        assert_eq!(
            repo.store().calls(),
            vec![Call::Insert(None), Call::Update(MISSING)]
        );
    }

    #[tokio::test]
    async fn test_insert_writes_a_set_key() {
        let repo = recording();
        assert_eq!(repo.insert(&item(5, "given"), None).await.unwrap(), 5);
        assert_eq!(repo.store().calls(), vec![Call::Insert(Some(Value::Integer(5)))]);
    }

    #[tokio::test]
    async fn test_update_many_stops_at_first_error() {
        let repo = recording();
        let batch = [item(1, "a"), item(BROKEN, "b"), item(2, "c")];

        let err = repo.update_many(&batch, None).await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::Storage(StorageError::QueryFailed(_))
        ));
        assert_eq!(
            repo.store().calls(),
            vec![Call::Update(1), Call::Update(BROKEN)]
        );
    }

    #[tokio::test]
    async fn test_delete_many_reports_any_deletion() {
        let repo = recording();
        assert!(repo
            .delete_many(&[item(MISSING, "a"), item(2, "b")], None)
            .await
            .unwrap());
        assert!(!repo.delete_many(&[item(MISSING, "a")], None).await.unwrap());
    }

    #[tokio::test]
    async fn test_paged_queries_count_first() {
        let repo = recording();
        let page = PageRequest::new(10, 5);

        let result = repo.get_all_paged(page, None).await.unwrap();
        assert_eq!(result.total, 9);
        assert_eq!(result.len(), 1);
        assert_eq!(
            repo.store().calls(),
            vec![Call::Count, Call::Select(Some(page))]
        );
    }

    #[tokio::test]
    async fn test_queries_forward_to_store() {
        let repo = recording();

        assert!(repo.any(None, None).await.unwrap());
        assert!(repo.find(&3, None).await.unwrap().is_none());
        assert!(repo.first(None, None).await.unwrap().is_none());
        assert_eq!(repo.get_all(None).await.unwrap().len(), 1);
        assert!(!repo.delete_where(&Filter::eq("name", "x"), None).await.unwrap());

        assert_eq!(
            repo.store().calls(),
            vec![
                Call::Exists,
                Call::Get(3),
                Call::First,
                Call::Select(None),
                Call::DeleteWhere,
            ]
        );
    }

    /// Entity with a narrow key, for rowids that do not fit it.
    #[derive(Debug, Clone, PartialEq)]
    struct Ticket {
        id: i32,
    }

    impl Entity for Ticket {
        type Key = i32;
        const TABLE: &'static str = "tickets";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["label"];

        fn key(&self) -> i32 {
            self.id
        }

        fn values(&self) -> Vec<Value> {
            vec!["ticket".into()]
        }
    }

    /// Store that hands back a rowid wider than `i32`.
    struct WideRowidStore;

    #[async_trait]
    impl Store<Ticket> for WideRowidStore {
        type Connection = ();

        async fn insert(
            &self,
            _conn: Option<&mut ()>,
            _key: Option<Value>,
            _entity: &Ticket,
        ) -> RepoResult<GeneratedKey> {
            Ok(GeneratedKey::Integer(i64::MAX))
        }

        async fn insert_all(
            &self,
            _conn: Option<&mut ()>,
            rows: &[(Option<Value>, &Ticket)],
        ) -> RepoResult<u64> {
            Ok(rows.len() as u64)
        }

        async fn update(&self, _conn: Option<&mut ()>, _entity: &Ticket) -> RepoResult<bool> {
            Ok(true)
        }

        async fn delete(&self, _conn: Option<&mut ()>, _key: &i32) -> RepoResult<bool> {
            Ok(true)
        }

        async fn delete_where(&self, _conn: Option<&mut ()>, _filter: &Filter) -> RepoResult<u64> {
            Ok(0)
        }

        async fn get(&self, _conn: Option<&mut ()>, _key: &i32) -> RepoResult<Option<Ticket>> {
            Ok(None)
        }

        async fn select(
            &self,
            _conn: Option<&mut ()>,
            _filter: Option<&Filter>,
            _page: Option<PageRequest>,
        ) -> RepoResult<Vec<Ticket>> {
            Ok(Vec::new())
        }

        async fn first(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<Option<Ticket>> {
            Ok(None)
        }

        async fn count(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<i64> {
            Ok(0)
        }

        async fn exists(&self, _conn: Option<&mut ()>, _filter: Option<&Filter>) -> RepoResult<bool> {
            Ok(false)
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_insert_rejects_rowid_outside_key_type() {
        let repo = SqlRepository::new(WideRowidStore);

        let err = repo.insert(&Ticket { id: 0 }, None).await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::Mapping(MappingError::KeyCoercion { target: "i32", .. })
        ));

        let err = repo.upsert(&Ticket { id: 0 }, None).await.unwrap_err();
        assert!(matches!(err, RepoError::Mapping(MappingError::KeyCoercion { .. })));

        // An assigned key never goes through coercion
        assert_eq!(repo.insert(&Ticket { id: 7 }, None).await.unwrap(), 7);
    }

    // -------------------------------------------------------------------------
    // SQLite
    // -------------------------------------------------------------------------

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    async fn ledger() -> Database {
        Database::new(DbConfig::in_memory().migrations(&LEDGER_MIGRATOR))
            .await
            .unwrap()
    }

    /// Generic over any full repository, the way application code would be.
    async fn category_named<R>(repo: &R, name: &str) -> Option<Category>
    where
        R: Repository<Category>,
    {
        repo.first(Some(&Filter::eq("name", name)), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_unset_key_inserts_and_round_trips() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();
        let expenses = db.repository::<Expense>().unwrap();

        let food = Category::new("Food", 40_000);
        let food_id = categories.upsert(&food, None).await.unwrap();
        assert!(uuid::Uuid::parse_str(&food_id).is_ok());

        let stored = categories.find(&food_id, None).await.unwrap().unwrap();
        assert_eq!(stored, Category { id: food_id.clone(), ..food });
        assert_eq!(category_named(&categories, "Food").await, Some(stored));

        let lunch = Expense::new(&food_id, "Lunch", 1250, at(1)).with_note("team");
        let lunch_id = expenses.upsert(&lunch, None).await.unwrap();
        assert_eq!(lunch_id, 1);

        let stored = expenses.find(&lunch_id, None).await.unwrap().unwrap();
        assert_eq!(stored, Expense { id: lunch_id, ..lunch });
    }

    #[tokio::test]
    async fn test_upsert_set_key_updates_in_place() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();

        let id = categories.insert(&Category::new("Rent", 100), None).await.unwrap();
        let changed = Category {
            id: id.clone(),
            name: "Rent".to_string(),
            budget_cents: 250_000,
        };

        assert_eq!(categories.upsert(&changed, None).await.unwrap(), id);
        assert_eq!(categories.count(None, None).await.unwrap(), 1);
        assert_eq!(categories.find(&id, None).await.unwrap(), Some(changed));

        // Assigned but nonexistent key: update misses, nothing is inserted
        let stray = Category {
            id: "not-a-row".to_string(),
            ..Category::new("Stray", 1)
        };
        assert_eq!(categories.upsert(&stray, None).await.unwrap(), "not-a-row");
        assert_eq!(categories.count(None, None).await.unwrap(), 1);
        assert!(!categories.update(&stray, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let db = ledger().await;
        let expenses = db.repository::<Expense>().unwrap();

        assert!(expenses.find(&999, None).await.unwrap().is_none());
        assert!(!expenses.any(None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_paging_total_matches_count() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();
        let expenses = db.repository::<Expense>().unwrap();

        let travel = categories.insert(&Category::new("Travel", 0), None).await.unwrap();
        let batch: Vec<Expense> = (1..=7)
            .map(|day| Expense::new(&travel, format!("Trip {day}"), i64::from(day) * 100, at(day)))
            .collect();
        assert_eq!(expenses.insert_many(&batch, None).await.unwrap(), 7);

        let page = expenses.get_all_paged(PageRequest::new(5, 3), None).await.unwrap();
        assert_eq!(page.total, expenses.count(None, None).await.unwrap());
        assert_eq!(page.total, 7);
        let ids: Vec<i64> = page.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![6, 7]);
        assert!(!page.has_more(&PageRequest::new(5, 3)));

        let big = Filter::ge("amount_cents", 400);
        let page = expenses
            .get_paged(&big, PageRequest::page(1, 2), None)
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.len(), 2);
        assert_eq!(page.page_count(2), 2);

        assert_eq!(expenses.get(&big, None).await.unwrap().len(), 4);
        assert_eq!(expenses.get_all(None).await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_delete_operations() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();

        let names = ["A", "B", "C", "D"];
        let batch: Vec<Category> = names.iter().map(|n| Category::new(*n, 10)).collect();
        categories.insert_many(&batch, None).await.unwrap();

        let all = categories.get_all(None).await.unwrap();
        assert!(all.iter().all(|c| !c.id.is_empty()));

        assert!(categories.delete(&all[0], None).await.unwrap());
        assert!(!categories.delete(&all[0], None).await.unwrap());
        assert!(categories.delete_many(&all[..2], None).await.unwrap());
        assert!(!categories.delete_many(&[], None).await.unwrap());

        assert!(categories
            .delete_where(&Filter::in_list("name", names), None)
            .await
            .unwrap());
        assert!(!categories
            .delete_where(&Filter::eq("name", all[0].name.as_str()), None)
            .await
            .unwrap());
        assert_eq!(categories.count(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_column() {
        let db = ledger().await;
        let expenses = db.repository::<Expense>().unwrap();

        let err = expenses
            .get(&Filter::eq("merchant", "Cafe"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Mapping(MappingError::UnknownColumn { .. })
        ));
    }

    #[tokio::test]
    async fn test_constraint_violations_surface_unchanged() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();
        let expenses = db.repository::<Expense>().unwrap();

        categories.insert(&Category::new("Food", 1), None).await.unwrap();
        let err = categories
            .insert(&Category::new("Food", 2), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Storage(StorageError::UniqueViolation { .. })
        ));

        let orphan = Expense::new("no-such-category", "Snack", 300, at(2));
        let err = expenses.insert(&orphan, None).await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::Storage(StorageError::ForeignKeyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_transaction_is_threaded_through_calls() {
        let db = ledger().await;
        let categories = db.repository::<Category>().unwrap();
        let expenses = db.repository::<Expense>().unwrap();

        let mut tx = db.begin().await.unwrap();
        let fuel = categories
            .insert(&Category::new("Fuel", 0), Some(&mut *tx))
            .await
            .unwrap();
        expenses
            .upsert_many(
                &[
                    Expense::new(&fuel, "Diesel", 6000, at(3)),
                    Expense::new(&fuel, "Petrol", 5000, at(4)),
                ],
                Some(&mut *tx),
            )
            .await
            .unwrap();

        let page = expenses
            .get_all_paged(PageRequest::first(), Some(&mut *tx))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        tx.rollback().await.unwrap();

        assert_eq!(expenses.count(None, None).await.unwrap(), 0);
        assert_eq!(categories.count(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_owned_and_shared() {
        let db = ledger().await;
        db.repository::<Category>().unwrap().close().await;
        assert!(!db.is_closed());

        let owned = SqlRepository::<Category>::connect(DbConfig::in_memory().migrations(&LEDGER_MIGRATOR))
            .await
            .unwrap();
        let pool = owned.database().clone();
        owned.insert(&Category::new("Misc", 0), None).await.unwrap();
        owned.close().await;
        assert!(pool.is_closed());
    }
}

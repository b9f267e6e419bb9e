//! # SQLite Store
//!
//! Renders repository calls into parameterized SQLite statements.
//!
//! ## Statement Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert       INSERT INTO "t" ("k", "c1", "c2") VALUES (?, ?, ?)       │
//! │               ("k" omitted when the store assigns the key)             │
//! │  insert_all   INSERT INTO "t" (...) VALUES (...), (...), ...           │
//! │               chunked below the bind-parameter limit                   │
//! │  update       UPDATE "t" SET "c1" = ?, "c2" = ? WHERE "k" = ?          │
//! │  delete       DELETE FROM "t" WHERE "k" = ?                            │
//! │  get          SELECT "k", "c1", "c2" FROM "t" WHERE "k" = ?            │
//! │  select       SELECT ... FROM "t" [WHERE ...]                          │
//! │               [ORDER BY "k" LIMIT ? OFFSET ?]  (paged only)            │
//! │  first        SELECT ... FROM "t" [WHERE ...] LIMIT 1                  │
//! │  count        SELECT COUNT(*) FROM "t" [WHERE ...]                     │
//! │  exists       SELECT EXISTS(SELECT 1 FROM "t" [WHERE ...])             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers come from a validated [`EntityMap`] and filter columns are
//! checked against it before any SQL is built, so only values are ever bound.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use strata_core::{CompareOp, Entity, EntityMap, Filter, GeneratedKey, PageRequest, RepoKey, Value};

use super::Store;
use crate::error::RepoResult;
use crate::pool::Database;

/// Bound parameters allowed per statement by older SQLite builds.
const MAX_BIND_PARAMS: usize = 999;

// =============================================================================
// Scoped Connection
// =============================================================================

/// The connection one store call runs on.
///
/// Either the caller's (usually a transaction) or one taken from the pool and
/// returned when the call finishes.
enum ScopedConnection<'a> {
    Borrowed(&'a mut SqliteConnection),
    Pooled(PoolConnection<Sqlite>),
}

impl<'a> ScopedConnection<'a> {
    async fn open(db: &Database, conn: Option<&'a mut SqliteConnection>) -> RepoResult<Self> {
        match conn {
            Some(conn) => Ok(ScopedConnection::Borrowed(conn)),
            None => Ok(ScopedConnection::Pooled(db.acquire().await?)),
        }
    }
}

impl Deref for ScopedConnection<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            ScopedConnection::Borrowed(conn) => conn,
            ScopedConnection::Pooled(conn) => conn,
        }
    }
}

impl DerefMut for ScopedConnection<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            ScopedConnection::Borrowed(conn) => conn,
            ScopedConnection::Pooled(conn) => conn,
        }
    }
}

// =============================================================================
// SqliteStore
// =============================================================================

/// SQLite implementation of [`Store`].
///
/// ## Pool Ownership
/// - `shared(db)`: the pool belongs to someone else; `close()` leaves it open
/// - `owned(db)`: the store was given the pool; `close()` closes it
pub struct SqliteStore<E> {
    db: Database,
    map: EntityMap,
    owns_pool: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteStore<E> {
    /// Creates a store over a pool someone else owns.
    pub fn shared(db: Database) -> RepoResult<Self> {
        Self::build(db, false)
    }

    /// Creates a store that owns its pool and closes it on `close()`.
    pub fn owned(db: Database) -> RepoResult<Self> {
        Self::build(db, true)
    }

    fn build(db: Database, owns_pool: bool) -> RepoResult<Self> {
        let map = EntityMap::of::<E>()?;
        debug!(table = map.table(), owns_pool, "Store created");
        Ok(SqliteStore {
            db,
            map,
            owns_pool,
            _entity: PhantomData,
        })
    }

    /// The validated mapping this store renders with.
    pub fn map(&self) -> &EntityMap {
        &self.map
    }

    /// The database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns true if `close()` closes the pool.
    pub fn owns_pool(&self) -> bool {
        self.owns_pool
    }

    fn check_filter(&self, filter: Option<&Filter>) -> RepoResult<()> {
        if let Some(filter) = filter {
            self.map.check_filter(filter)?;
        }
        Ok(())
    }
}

impl<E> Clone for SqliteStore<E> {
    fn clone(&self) -> Self {
        SqliteStore {
            db: self.db.clone(),
            map: self.map.clone(),
            owns_pool: self.owns_pool,
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for SqliteStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("table", &self.map.table())
            .field("owns_pool", &self.owns_pool)
            .finish()
    }
}

#[async_trait]
impl<E> Store<E> for SqliteStore<E>
where
    E: Entity + for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
    type Connection = SqliteConnection;

    async fn insert(
        &self,
        conn: Option<&mut SqliteConnection>,
        key: Option<Value>,
        entity: &E,
    ) -> RepoResult<GeneratedKey> {
        let values = entity.values();
        self.map.check_values(&values)?;

        let mut query = insert_sql(&self.map, key.is_some(), vec![(key, values)]);
        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let result = query.build().execute(&mut *conn).await?;

        debug!(table = self.map.table(), rowid = result.last_insert_rowid(), "Inserted row");
        Ok(GeneratedKey::Integer(result.last_insert_rowid()))
    }

    async fn insert_all(
        &self,
        conn: Option<&mut SqliteConnection>,
        rows: &[(Option<Value>, &E)],
    ) -> RepoResult<u64> {
        let mut prepared = Vec::with_capacity(rows.len());
        for (key, entity) in rows {
            let values = entity.values();
            self.map.check_values(&values)?;
            prepared.push((key.clone(), values));
        }

        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let mut written = 0;
        for (with_key, chunk) in insert_chunks(&self.map, prepared) {
            let rows_in_chunk = chunk.len();
            let mut query = insert_sql(&self.map, with_key, chunk);
            written += query.build().execute(&mut *conn).await?.rows_affected();
            debug!(table = self.map.table(), rows = rows_in_chunk, "Inserted batch");
        }

        Ok(written)
    }

    async fn update(&self, conn: Option<&mut SqliteConnection>, entity: &E) -> RepoResult<bool> {
        let values = entity.values();
        self.map.check_values(&values)?;

        let mut query = update_sql(&self.map, entity.key().to_value(), values);
        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let affected = query.build().execute(&mut *conn).await?.rows_affected();

        debug!(table = self.map.table(), affected, "Updated row");
        Ok(affected > 0)
    }

    async fn delete(&self, conn: Option<&mut SqliteConnection>, key: &E::Key) -> RepoResult<bool> {
        let mut query = QueryBuilder::new(format!("DELETE FROM {}", quote(self.map.table())));
        push_key_match(&mut query, &self.map, key.to_value());

        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let affected = query.build().execute(&mut *conn).await?.rows_affected();

        debug!(table = self.map.table(), affected, "Deleted row");
        Ok(affected > 0)
    }

    async fn delete_where(
        &self,
        conn: Option<&mut SqliteConnection>,
        filter: &Filter,
    ) -> RepoResult<u64> {
        self.map.check_filter(filter)?;

        let mut query = QueryBuilder::new(format!("DELETE FROM {}", quote(self.map.table())));
        push_where(&mut query, Some(filter));

        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let affected = query.build().execute(&mut *conn).await?.rows_affected();

        debug!(table = self.map.table(), %filter, affected, "Deleted matching rows");
        Ok(affected)
    }

    async fn get(
        &self,
        conn: Option<&mut SqliteConnection>,
        key: &E::Key,
    ) -> RepoResult<Option<E>> {
        let mut query = select_sql(&self.map, None, None);
        push_key_match(&mut query, &self.map, key.to_value());

        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let row = query.build_query_as::<E>().fetch_optional(&mut *conn).await?;
        Ok(row)
    }

    async fn select(
        &self,
        conn: Option<&mut SqliteConnection>,
        filter: Option<&Filter>,
        page: Option<PageRequest>,
    ) -> RepoResult<Vec<E>> {
        self.check_filter(filter)?;

        let mut query = select_sql(&self.map, filter, page);
        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let rows = query.build_query_as::<E>().fetch_all(&mut *conn).await?;

        debug!(table = self.map.table(), rows = rows.len(), ?page, "Selected rows");
        Ok(rows)
    }

    async fn first(
        &self,
        conn: Option<&mut SqliteConnection>,
        filter: Option<&Filter>,
    ) -> RepoResult<Option<E>> {
        self.check_filter(filter)?;

        let mut query = select_sql(&self.map, filter, None);
        query.push(" LIMIT 1");

        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let row = query.build_query_as::<E>().fetch_optional(&mut *conn).await?;
        Ok(row)
    }

    async fn count(
        &self,
        conn: Option<&mut SqliteConnection>,
        filter: Option<&Filter>,
    ) -> RepoResult<i64> {
        self.check_filter(filter)?;

        let mut query = count_sql(&self.map, filter);
        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let total: i64 = query.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(total)
    }

    async fn exists(
        &self,
        conn: Option<&mut SqliteConnection>,
        filter: Option<&Filter>,
    ) -> RepoResult<bool> {
        self.check_filter(filter)?;

        let mut query = exists_sql(&self.map, filter);
        let mut conn = ScopedConnection::open(&self.db, conn).await?;
        let found: i64 = query.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(found != 0)
    }

    async fn close(&self) {
        if self.owns_pool {
            self.db.close().await;
        } else {
            debug!(table = self.map.table(), "Leaving shared pool open");
        }
    }
}

// =============================================================================
// SQL Rendering
// =============================================================================

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn column_list(map: &EntityMap) -> String {
    std::iter::once(map.key_column())
        .chain(map.columns().iter().copied())
        .map(quote)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(query: &mut QueryBuilder<'static, Sqlite>, value: &Value) {
    match value {
        Value::Null => query.push("NULL"),
        Value::Bool(v) => query.push_bind(*v),
        Value::Integer(v) => query.push_bind(*v),
        Value::Real(v) => query.push_bind(*v),
        Value::Text(v) => query.push_bind(v.clone()),
        Value::Timestamp(v) => query.push_bind(*v),
        Value::Blob(v) => query.push_bind(v.clone()),
    };
}

fn push_key_match(query: &mut QueryBuilder<'static, Sqlite>, map: &EntityMap, key: Value) {
    query.push(format!(" WHERE {} = ", quote(map.key_column())));
    push_value(query, &key);
}

fn push_where(query: &mut QueryBuilder<'static, Sqlite>, filter: Option<&Filter>) {
    match filter {
        None | Some(Filter::All) => {}
        Some(filter) => {
            query.push(" WHERE ");
            push_filter(query, filter);
        }
    }
}

fn comparison(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

/// Renders a filter tree. Empty `And` is true, empty `Or` and empty `In` are
/// false, and equality against `Null` becomes `IS [NOT] NULL`.
fn push_filter(query: &mut QueryBuilder<'static, Sqlite>, filter: &Filter) {
    match filter {
        Filter::All => {
            query.push("1 = 1");
        }
        Filter::Compare {
            column,
            op: CompareOp::Eq,
            value: Value::Null,
        }
        | Filter::IsNull { column } => {
            query.push(format!("{} IS NULL", quote(column)));
        }
        Filter::Compare {
            column,
            op: CompareOp::Ne,
            value: Value::Null,
        }
        | Filter::IsNotNull { column } => {
            query.push(format!("{} IS NOT NULL", quote(column)));
        }
        Filter::Compare { column, op, value } => {
            query.push(format!("{} {} ", quote(column), comparison(*op)));
            push_value(query, value);
        }
        Filter::In { values, .. } if values.is_empty() => {
            query.push("0 = 1");
        }
        Filter::In { column, values } => {
            query.push(format!("{} IN (", quote(column)));
            for (idx, value) in values.iter().enumerate() {
                if idx > 0 {
                    query.push(", ");
                }
                push_value(query, value);
            }
            query.push(")");
        }
        Filter::Like { column, pattern } => {
            query.push(format!("{} LIKE ", quote(column)));
            query.push_bind(pattern.clone());
        }
        Filter::And { filters } if filters.is_empty() => {
            query.push("1 = 1");
        }
        Filter::Or { filters } if filters.is_empty() => {
            query.push("0 = 1");
        }
        Filter::And { filters } => push_joined(query, filters, " AND "),
        Filter::Or { filters } => push_joined(query, filters, " OR "),
        Filter::Not { filter } => {
            query.push("NOT (");
            push_filter(query, filter);
            query.push(")");
        }
    }
}

fn push_joined(query: &mut QueryBuilder<'static, Sqlite>, filters: &[Filter], separator: &str) {
    for (idx, filter) in filters.iter().enumerate() {
        if idx > 0 {
            query.push(separator);
        }
        query.push("(");
        push_filter(query, filter);
        query.push(")");
    }
}

fn insert_sql(
    map: &EntityMap,
    with_key: bool,
    rows: Vec<(Option<Value>, Vec<Value>)>,
) -> QueryBuilder<'static, Sqlite> {
    let mut columns: Vec<&str> = Vec::with_capacity(map.columns().len() + 1);
    if with_key {
        columns.push(map.key_column());
    }
    columns.extend(map.columns().iter().copied());

    let column_sql = columns
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(", ");

    let mut query = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) VALUES ",
        quote(map.table()),
        column_sql
    ));

    for (row_idx, (key, values)) in rows.into_iter().enumerate() {
        if row_idx > 0 {
            query.push(", ");
        }
        query.push("(");
        let leading = key.filter(|_| with_key);
        for (idx, value) in leading.iter().chain(values.iter()).enumerate() {
            if idx > 0 {
                query.push(", ");
            }
            push_value(&mut query, value);
        }
        query.push(")");
    }

    query
}

/// Splits rows into runs of the same shape (key written or not), each small
/// enough to stay under [`MAX_BIND_PARAMS`]. Input order is preserved.
fn insert_chunks(
    map: &EntityMap,
    rows: Vec<(Option<Value>, Vec<Value>)>,
) -> Vec<(bool, Vec<(Option<Value>, Vec<Value>)>)> {
    let mut chunks: Vec<(bool, Vec<(Option<Value>, Vec<Value>)>)> = Vec::new();

    for row in rows {
        let with_key = row.0.is_some();
        let width = map.columns().len() + usize::from(with_key);
        let per_chunk = (MAX_BIND_PARAMS / width).max(1);

        let extends_last = chunks
            .last()
            .is_some_and(|(shape, chunk)| *shape == with_key && chunk.len() < per_chunk);
        if extends_last {
            let last = chunks.len() - 1;
            chunks[last].1.push(row);
        } else {
            chunks.push((with_key, vec![row]));
        }
    }

    chunks
}

fn update_sql(map: &EntityMap, key: Value, values: Vec<Value>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!("UPDATE {} SET ", quote(map.table())));
    for (idx, (column, value)) in map.columns().iter().zip(values.iter()).enumerate() {
        if idx > 0 {
            query.push(", ");
        }
        query.push(format!("{} = ", quote(column)));
        push_value(&mut query, value);
    }
    push_key_match(&mut query, map, key);
    query
}

fn select_sql(
    map: &EntityMap,
    filter: Option<&Filter>,
    page: Option<PageRequest>,
) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        column_list(map),
        quote(map.table())
    ));
    push_where(&mut query, filter);

    if let Some(page) = page {
        // Stable order so consecutive pages neither overlap nor skip rows
        query.push(format!(" ORDER BY {}", quote(map.key_column())));
        query.push(" LIMIT ");
        query.push_bind(i64::try_from(page.take).unwrap_or(i64::MAX));
        query.push(" OFFSET ");
        query.push_bind(i64::try_from(page.skip).unwrap_or(i64::MAX));
    }

    query
}

fn count_sql(map: &EntityMap, filter: Option<&Filter>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", quote(map.table())));
    push_where(&mut query, filter);
    query
}

fn exists_sql(map: &EntityMap, filter: Option<&Filter>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!("SELECT EXISTS(SELECT 1 FROM {}", quote(map.table())));
    push_where(&mut query, filter);
    query.push(")");
    query
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::error::{RepoError, StorageError};
    use strata_core::MappingError;

    #[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
    struct Note {
        id: i64,
        title: String,
        pinned: bool,
        rank: Option<i64>,
    }

    impl Entity for Note {
        type Key = i64;
        const TABLE: &'static str = "notes";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["title", "pinned", "rank"];

        fn key(&self) -> i64 {
            self.id
        }

        fn values(&self) -> Vec<Value> {
            vec![
                self.title.clone().into(),
                self.pinned.into(),
                self.rank.into(),
            ]
        }
    }

    fn note(id: i64, title: &str, rank: Option<i64>) -> Note {
        Note {
            id,
            title: title.to_string(),
            pinned: false,
            rank,
        }
    }

    fn notes_map() -> EntityMap {
        EntityMap::of::<Note>().unwrap()
    }

    async fn setup() -> SqliteStore<Note> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, title TEXT NOT NULL, pinned INTEGER NOT NULL, rank INTEGER)",
        )
        .execute(db.pool())
        .await
        .unwrap();
        SqliteStore::owned(db).unwrap()
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    #[test]
    fn test_select_sql_unpaged_has_no_order() {
        let query = select_sql(&notes_map(), None, None);
        assert_eq!(
            query.sql(),
            r#"SELECT "id", "title", "pinned", "rank" FROM "notes""#
        );
    }

    #[test]
    fn test_select_sql_paged_orders_by_key() {
        let filter = Filter::eq("pinned", true);
        let query = select_sql(&notes_map(), Some(&filter), Some(PageRequest::new(20, 10)));
        assert_eq!(
            query.sql(),
            r#"SELECT "id", "title", "pinned", "rank" FROM "notes" WHERE "pinned" = ? ORDER BY "id" LIMIT ? OFFSET ?"#
        );
    }

    #[test]
    fn test_filter_rendering() {
        let filter = Filter::eq("rank", Value::Null)
            .and(Filter::like("title", "a%").or(Filter::in_list("id", Vec::<i64>::new())))
            .and(Filter::gt("rank", 3).negate());

        let mut query = QueryBuilder::new("");
        push_filter(&mut query, &filter);
        assert_eq!(
            query.sql(),
            r#"("rank" IS NULL) AND (("title" LIKE ?) OR (0 = 1)) AND (NOT ("rank" > ?))"#
        );
    }

    #[test]
    fn test_empty_groups() {
        let mut query = QueryBuilder::new("");
        push_filter(&mut query, &Filter::all_of([]));
        assert_eq!(query.sql(), "1 = 1");

        let mut query = QueryBuilder::new("");
        push_filter(&mut query, &Filter::any_of([]));
        assert_eq!(query.sql(), "0 = 1");

        let query = count_sql(&notes_map(), Some(&Filter::All));
        assert_eq!(query.sql(), r#"SELECT COUNT(*) FROM "notes""#);
    }

    #[test]
    fn test_insert_and_update_sql() {
        let map = notes_map();
        let n = note(0, "a", None);

        let query = insert_sql(&map, false, vec![(None, n.values())]);
        assert_eq!(
            query.sql(),
            r#"INSERT INTO "notes" ("title", "pinned", "rank") VALUES (?, ?, NULL)"#
        );

        let query = insert_sql(&map, true, vec![(Some(Value::Integer(7)), n.values())]);
        assert_eq!(
            query.sql(),
            r#"INSERT INTO "notes" ("id", "title", "pinned", "rank") VALUES (?, ?, ?, NULL)"#
        );

        let query = update_sql(&map, Value::Integer(7), note(7, "b", Some(1)).values());
        assert_eq!(
            query.sql(),
            r#"UPDATE "notes" SET "title" = ?, "pinned" = ?, "rank" = ? WHERE "id" = ?"#
        );
    }

    #[test]
    fn test_insert_chunks_split_by_shape_and_size() {
        let map = notes_map();
        let unkeyed = |n: usize| (0..n).map(|_| (None::<Value>, note(0, "x", None).values()));

        let mut rows: Vec<_> = unkeyed(2).collect();
        rows.push((Some(Value::Integer(9)), note(9, "y", None).values()));
        rows.extend(unkeyed(1));

        let chunks = insert_chunks(&map, rows);
        let shapes: Vec<(bool, usize)> = chunks.iter().map(|(k, c)| (*k, c.len())).collect();
        assert_eq!(shapes, vec![(false, 2), (true, 1), (false, 1)]);

        // 3 columns per row: 333 rows fit under the parameter limit
        let chunks = insert_chunks(&map, unkeyed(700).collect());
        let sizes: Vec<usize> = chunks.iter().map(|(_, c)| c.len()).collect();
        assert_eq!(sizes, vec![333, 333, 34]);
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let store = setup().await;

        let key = store.insert(None, None, &note(0, "first", None)).await.unwrap();
        assert_eq!(key, GeneratedKey::Integer(1));

        let mut stored = store.get(None, &1).await.unwrap().unwrap();
        assert_eq!(stored, note(1, "first", None));

        stored.rank = Some(4);
        assert!(store.update(None, &stored).await.unwrap());
        assert_eq!(store.get(None, &1).await.unwrap().unwrap().rank, Some(4));

        assert!(!store.update(None, &note(99, "ghost", None)).await.unwrap());
        assert!(store.delete(None, &1).await.unwrap());
        assert!(!store.delete(None, &1).await.unwrap());
        assert!(store.get(None, &1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queries_with_filters() {
        let store = setup().await;
        let a = note(0, "alpha", Some(1));
        let b = note(0, "beta", None);
        let c = note(0, "gamma", Some(3));
        let written = store
            .insert_all(None, &[(None, &a), (None, &b), (None, &c)])
            .await
            .unwrap();
        assert_eq!(written, 3);

        assert_eq!(store.count(None, None).await.unwrap(), 3);
        assert_eq!(
            store.count(None, Some(&Filter::is_null("rank"))).await.unwrap(),
            1
        );
        assert!(store.exists(None, Some(&Filter::like("title", "g%"))).await.unwrap());
        assert!(!store.exists(None, Some(&Filter::in_list("id", Vec::<i64>::new()))).await.unwrap());

        let page = store
            .select(None, None, Some(PageRequest::new(1, 1)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "beta");

        let found = store.first(None, Some(&Filter::ge("rank", 2))).await.unwrap();
        assert_eq!(found.map(|n| n.title), Some("gamma".to_string()));

        let removed = store
            .delete_where(None, &Filter::is_not_null("rank"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count(None, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_filter_column_is_a_mapping_error() {
        let store = setup().await;
        let err = store
            .count(None, Some(&Filter::eq("colour", "red")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Mapping(MappingError::UnknownColumn { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_a_storage_error() {
        let store = setup().await;
        store.insert(None, Some(Value::Integer(5)), &note(5, "a", None)).await.unwrap();
        let err = store
            .insert(None, Some(Value::Integer(5)), &note(5, "b", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Storage(StorageError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_calls_run_on_the_given_connection() {
        let store = setup().await;
        let mut tx = store.database().begin().await.unwrap();

        store.insert(Some(&mut *tx), None, &note(0, "draft", None)).await.unwrap();
        assert_eq!(store.count(Some(&mut *tx), None).await.unwrap(), 1);
        tx.rollback().await.unwrap();

        assert_eq!(store.count(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_respects_ownership() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let shared = SqliteStore::<Note>::shared(db.clone()).unwrap();
        shared.close().await;
        assert!(!db.is_closed());

        let owned = SqliteStore::<Note>::owned(db.clone()).unwrap();
        owned.close().await;
        assert!(db.is_closed());
    }
}

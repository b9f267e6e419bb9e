//! # Entity Mapping
//!
//! Compile-time mapping between a Rust record and a table.
//!
//! ## How an Entity Maps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Entity → Table Mapping                             │
//! │                                                                         │
//! │  struct Expense {            TABLE      = "expenses"                    │
//! │      id: i64,          ───►  KEY_COLUMN = "id"                          │
//! │      category_id: String,    COLUMNS    = ["category_id",               │
//! │      amount_cents: i64,                    "amount_cents", ...]         │
//! │      ...                                                                │
//! │  }                           key()      → self.id                       │
//! │                              values()   → [category_id, amount, ...]   │
//! │                                                                         │
//! │  EntityMap::of::<Expense>() validates the above ONCE, when the store   │
//! │  is built. Repositories never inspect fields at runtime.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Set / Unset Rule
//! A key is **set** iff it differs from `Default::default()` for its type:
//! `0` for integers, `""` for strings, the nil UUID for `Uuid`. Upsert uses
//! this rule alone to choose between insert and update.

use std::fmt;

use uuid::Uuid;

use crate::error::{MappingError, MappingResult};
use crate::filter::Filter;
use crate::value::Value;

// =============================================================================
// Entity
// =============================================================================

/// A record type stored in one table with a single-column primary key.
///
/// ## Example
/// ```rust
/// use strata_core::{Entity, Value};
///
/// struct Tag {
///     id: i64,
///     label: String,
/// }
///
/// impl Entity for Tag {
///     type Key = i64;
///     const TABLE: &'static str = "tags";
///     const KEY_COLUMN: &'static str = "id";
///     const COLUMNS: &'static [&'static str] = &["label"];
///
///     fn key(&self) -> i64 {
///         self.id
///     }
///
///     fn values(&self) -> Vec<Value> {
///         vec![self.label.clone().into()]
///     }
/// }
/// ```
pub trait Entity: Send + Sync {
    /// Primary key type.
    type Key: RepoKey;

    /// Table name.
    const TABLE: &'static str;

    /// Primary key column.
    const KEY_COLUMN: &'static str;

    /// Non-key columns, in the order `values()` yields them.
    const COLUMNS: &'static [&'static str];

    /// Returns the primary key value (possibly unset).
    fn key(&self) -> Self::Key;

    /// Returns the non-key column values in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;
}

// =============================================================================
// Keys
// =============================================================================

/// A key value produced by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKey {
    /// Integer key, e.g. SQLite `last_insert_rowid()`.
    Integer(i64),
    /// Text key returned by the store.
    Text(String),
}

impl fmt::Display for GeneratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedKey::Integer(v) => write!(f, "{}", v),
            GeneratedKey::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A primary key type.
///
/// ## Responsibilities
/// - Decide whether a key is set (`is_set`)
/// - Convert a store-generated key to the key type (`from_generated`)
/// - Optionally generate a key client-side (`generate`)
/// - Bind as a storage value (`to_value`)
pub trait RepoKey: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Type name used in coercion errors.
    const TYPE_NAME: &'static str;

    /// Converts a store-generated key into this key type.
    fn from_generated(key: GeneratedKey) -> MappingResult<Self>;

    /// Converts the key into a bindable value.
    fn to_value(&self) -> Value;

    /// Generates a fresh key for an unset one, when the store cannot.
    ///
    /// Integer keys return `None`: the store assigns them.
    fn generate() -> Option<Self> {
        None
    }

    /// Returns true if the key differs from the type's default value.
    fn is_set(&self) -> bool {
        *self != Self::default()
    }
}

impl RepoKey for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        match key {
            GeneratedKey::Integer(v) => Ok(v),
            GeneratedKey::Text(s) => s
                .parse()
                .map_err(|_| MappingError::key_coercion(s, Self::TYPE_NAME)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl RepoKey for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        match key {
            GeneratedKey::Integer(v) => {
                i32::try_from(v).map_err(|_| MappingError::key_coercion(v, Self::TYPE_NAME))
            }
            GeneratedKey::Text(s) => s
                .parse()
                .map_err(|_| MappingError::key_coercion(s, Self::TYPE_NAME)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl RepoKey for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        match key {
            GeneratedKey::Integer(v) => {
                u32::try_from(v).map_err(|_| MappingError::key_coercion(v, Self::TYPE_NAME))
            }
            GeneratedKey::Text(s) => s
                .parse()
                .map_err(|_| MappingError::key_coercion(s, Self::TYPE_NAME)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

/// SQLite integers are signed 64-bit, so `u64` keys above `i64::MAX` bind as
/// decimal text. An `INTEGER PRIMARY KEY` column rejects those at the store.
impl RepoKey for u64 {
    const TYPE_NAME: &'static str = "u64";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        match key {
            GeneratedKey::Integer(v) => {
                u64::try_from(v).map_err(|_| MappingError::key_coercion(v, Self::TYPE_NAME))
            }
            GeneratedKey::Text(s) => s
                .parse()
                .map_err(|_| MappingError::key_coercion(s, Self::TYPE_NAME)),
        }
    }

    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Text(self.to_string()),
        }
    }
}

/// String keys hold UUID v4 text, generated client-side when unset.
impl RepoKey for String {
    const TYPE_NAME: &'static str = "String";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        Ok(key.to_string())
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn generate() -> Option<Self> {
        Some(Uuid::new_v4().to_string())
    }
}

impl RepoKey for Uuid {
    const TYPE_NAME: &'static str = "Uuid";

    fn from_generated(key: GeneratedKey) -> MappingResult<Self> {
        match key {
            GeneratedKey::Text(s) => {
                Uuid::parse_str(&s).map_err(|_| MappingError::key_coercion(s, Self::TYPE_NAME))
            }
            GeneratedKey::Integer(v) => Err(MappingError::key_coercion(v, Self::TYPE_NAME)),
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn generate() -> Option<Self> {
        Some(Uuid::new_v4())
    }
}

// =============================================================================
// Entity Map
// =============================================================================

/// Validated mapping metadata for one entity type.
///
/// Built once per store with [`EntityMap::of`]; every identifier in it has
/// been checked, so stores may quote them into SQL directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMap {
    table: &'static str,
    key_column: &'static str,
    columns: &'static [&'static str],
}

impl EntityMap {
    /// Resolves and validates the mapping of `E`.
    ///
    /// ## Returns
    /// * `Ok(EntityMap)` - Mapping is usable
    /// * `Err(MappingError::NoPrimaryKey)` - `KEY_COLUMN` is empty
    /// * `Err(MappingError::NoColumns)` - `COLUMNS` is empty
    /// * `Err(MappingError::InvalidIdentifier)` - bad table/column name
    /// * `Err(MappingError::DuplicateColumn)` - repeated column
    pub fn of<E: Entity>() -> MappingResult<Self> {
        let entity = E::TABLE;

        if !is_identifier(entity) {
            return Err(MappingError::InvalidIdentifier {
                entity: entity.to_string(),
                identifier: entity.to_string(),
            });
        }

        if E::KEY_COLUMN.trim().is_empty() {
            return Err(MappingError::NoPrimaryKey {
                entity: entity.to_string(),
            });
        }

        if E::COLUMNS.is_empty() {
            return Err(MappingError::NoColumns {
                entity: entity.to_string(),
            });
        }

        let key_column: &'static str = E::KEY_COLUMN;
        let all = std::iter::once(key_column).chain(E::COLUMNS.iter().copied());
        for (idx, column) in all.enumerate() {
            if !is_identifier(column) {
                return Err(MappingError::InvalidIdentifier {
                    entity: entity.to_string(),
                    identifier: column.to_string(),
                });
            }

            // idx 0 is the key; data columns are compared against everything before them
            let earlier: &[&str] = if idx == 0 {
                &[]
            } else {
                &E::COLUMNS[..idx - 1]
            };
            if (idx > 0 && column == key_column) || earlier.contains(&column) {
                return Err(MappingError::DuplicateColumn {
                    entity: entity.to_string(),
                    column: column.to_string(),
                });
            }
        }

        Ok(EntityMap {
            table: E::TABLE,
            key_column: E::KEY_COLUMN,
            columns: E::COLUMNS,
        })
    }

    /// Table name.
    #[inline]
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Primary key column.
    #[inline]
    pub fn key_column(&self) -> &'static str {
        self.key_column
    }

    /// Non-key columns in bind order.
    #[inline]
    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    /// Returns true if `name` is the key column or a mapped column.
    pub fn has_column(&self, name: &str) -> bool {
        name == self.key_column || self.columns.contains(&name)
    }

    /// Checks that an entity supplied one value per mapped column.
    pub fn check_values(&self, values: &[Value]) -> MappingResult<()> {
        if values.len() != self.columns.len() {
            return Err(MappingError::ColumnMismatch {
                entity: self.table.to_string(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// Checks that every column referenced by `filter` is mapped.
    pub fn check_filter(&self, filter: &Filter) -> MappingResult<()> {
        for column in filter.columns() {
            if !self.has_column(column) {
                return Err(MappingError::unknown_column(self.table, column));
            }
        }
        Ok(())
    }
}

/// Plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Unit Tests
// =============================================================================

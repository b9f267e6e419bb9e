//! # Storage Values
//!
//! `Value` is the storage-neutral scalar that carries column values and filter
//! literals from entities to a store. Stores bind values as parameters; they
//! are never spliced into SQL text.
//!
//! ## Mapping
//! ```text
//! ┌──────────────────────────┬───────────────────┬──────────────────────┐
//! │ Rust type                │ Value             │ SQLite storage class │
//! ├──────────────────────────┼───────────────────┼──────────────────────┤
//! │ bool                     │ Bool              │ INTEGER (0/1)        │
//! │ i8..i64, u8..u32         │ Integer(i64)      │ INTEGER              │
//! │ f32, f64                 │ Real(f64)         │ REAL                 │
//! │ String, &str, Uuid       │ Text              │ TEXT                 │
//! │ DateTime<Utc>            │ Timestamp         │ TEXT (RFC 3339)      │
//! │ Vec<u8>                  │ Blob              │ BLOB                 │
//! │ Option<T> (None)         │ Null              │ NULL                 │
//! └──────────────────────────┴───────────────────┴──────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single column value or filter literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns true for `Value::Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v),
            Value::Timestamp(v) => write!(f, "'{}'", v.to_rfc3339()),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

/// UUIDs are stored as hyphenated text so they stay readable in SQL tools.
impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Text(v.hyphenated().to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Error Types
//!
//! Mapping errors raised before any storage call is made.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  strata-core errors (this file)                                        │
//! │  └── MappingError     - Entity metadata or key conversion problems     │
//! │                                                                         │
//! │  strata-db errors (separate crate)                                     │
//! │  ├── StorageError     - Driver / constraint / connection failures      │
//! │  └── RepoError        - MappingError | StorageError                    │
//! │                                                                         │
//! │  Flow: MappingError ──┐                                                │
//! │                       ├──► RepoError ──► caller                        │
//! │        StorageError ──┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the entity/table name in every message
//! 3. Mapping errors are never retried: the metadata will not fix itself

use thiserror::Error;

// =============================================================================
// Mapping Error
// =============================================================================

/// Entity mapping and key conversion failures.
///
/// These are programming or configuration errors: the entity's metadata is
/// wrong, or a generated key cannot be represented by the key type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The entity declares no primary key column.
    ///
    /// ## When This Occurs
    /// - `Entity::KEY_COLUMN` is an empty string
    /// - Raised once, when the store resolves the mapping
    #[error("No primary key is defined for entity '{entity}'")]
    NoPrimaryKey { entity: String },

    /// The entity declares no columns besides its key.
    #[error("Entity '{entity}' maps no columns besides its primary key")]
    NoColumns { entity: String },

    /// A table or column name is not a plain SQL identifier.
    ///
    /// ## Rules
    /// - Must start with a letter or underscore
    /// - Only ASCII letters, digits and underscores afterwards
    #[error("Invalid identifier '{identifier}' on entity '{entity}'")]
    InvalidIdentifier { entity: String, identifier: String },

    /// A column is listed twice, or the key column is listed as a data column.
    #[error("Column '{column}' is mapped more than once on entity '{entity}'")]
    DuplicateColumn { entity: String, column: String },

    /// `Entity::values()` returned a different number of values than
    /// `Entity::COLUMNS` declares.
    #[error("Entity '{entity}' maps {expected} columns but supplied {actual} values")]
    ColumnMismatch {
        entity: String,
        expected: usize,
        actual: usize,
    },

    /// A filter references a column the entity does not map.
    #[error("Unknown column '{column}' in filter for entity '{entity}'")]
    UnknownColumn { entity: String, column: String },

    /// A store-generated key cannot be converted to the entity's key type.
    ///
    /// ## When This Occurs
    /// - rowid does not fit in `i32` / `u32`
    /// - integer rowid returned for a `Uuid` key
    /// - text that does not parse as the key type
    #[error("Cannot convert generated key '{value}' to {target}")]
    KeyCoercion { value: String, target: &'static str },
}

impl MappingError {
    /// Creates an UnknownColumn error.
    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        MappingError::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    /// Creates a KeyCoercion error.
    pub fn key_coercion(value: impl ToString, target: &'static str) -> Self {
        MappingError::KeyCoercion {
            value: value.to_string(),
            target,
        }
    }
}

/// Convenience type alias for Results with MappingError.
pub type MappingResult<T> = Result<T, MappingError>;

// =============================================================================
// Unit Tests
// =============================================================================

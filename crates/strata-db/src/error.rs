//! # Database Error Types
//!
//! Error types for store and repository operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Entity metadata / key coercion    │
//! │       │                                       │                         │
//! │       ▼                                       ▼                         │
//! │  StorageError (this module)          MappingError (strata-core)        │
//! │       │  categorized, unchanged otherwise     │                         │
//! │       └──────────────────┬────────────────────┘                         │
//! │                          ▼                                              │
//! │                     RepoError ← what every repository call returns     │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                   Application code                                     │
//! │                                                                         │
//! │  "No such row" is NEVER an error: it is `false` or `None`.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retry, backoff or compensation happens at this layer.

use strata_core::MappingError;
use thiserror::Error;

// =============================================================================
// Storage Error
// =============================================================================

/// Failures reported by the database driver.
///
/// These errors wrap sqlx errors and categorize them so callers can react to
/// constraint violations without parsing messages themselves.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a row whose primary key already exists
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent parent row
    /// - Deleting a parent row that children still reference
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - The pool was closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Missing table or column (schema out of sync with the entity mapping)
    /// - Other constraint failures (CHECK, NOT NULL)
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction begin/commit/rollback failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use until the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        StorageError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true for unique and foreign key violations.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StorageError::UniqueViolation { .. } | StorageError::ForeignKeyViolation { .. }
        )
    }
}

/// Convert sqlx errors to StorageError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → StorageError::PoolExhausted
/// sqlx::Error::PoolClosed     → StorageError::ConnectionFailed
/// Other                       → StorageError::Internal
/// ```
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // PRIMARY KEY on rowid tables reports the same UNIQUE message
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    StorageError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    StorageError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    StorageError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => StorageError::PoolExhausted,

            sqlx::Error::PoolClosed => {
                StorageError::ConnectionFailed("Pool is closed".to_string())
            }

            sqlx::Error::ColumnNotFound(column) => {
                StorageError::QueryFailed(format!("column not found: {}", column))
            }

            _ => StorageError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}

/// Result type for store-level operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Repository Error
// =============================================================================

/// Everything a repository call can fail with.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Entity metadata or key conversion problem. Not retryable.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Driver, constraint or connection failure, surfaced unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Storage(err.into())
    }
}

impl RepoError {
    /// Returns the storage error, if this is one.
    pub fn as_storage(&self) -> Option<&StorageError> {
        match self {
            RepoError::Storage(err) => Some(err),
            RepoError::Mapping(_) => None,
        }
    }

    /// Returns the mapping error, if this is one.
    pub fn as_mapping(&self) -> Option<&MappingError> {
        match self {
            RepoError::Mapping(err) => Some(err),
            RepoError::Storage(_) => None,
        }
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_categorized() {
        assert!(matches!(
            StorageError::from(sqlx::Error::PoolTimedOut),
            StorageError::PoolExhausted
        ));
        assert!(matches!(
            StorageError::from(sqlx::Error::PoolClosed),
            StorageError::ConnectionFailed(_)
        ));
        assert!(matches!(
            StorageError::from(sqlx::Error::RowNotFound),
            StorageError::Internal(_)
        ));
    }

    #[test]
    fn test_repo_error_wraps_both_kinds() {
        let err: RepoError = MappingError::NoPrimaryKey {
            entity: "expenses".to_string(),
        }
        .into();
        assert!(err.as_mapping().is_some());
        assert_eq!(
            err.to_string(),
            "No primary key is defined for entity 'expenses'"
        );

        let err: RepoError = StorageError::duplicate("categories.name", "Food").into();
        assert!(err.as_storage().is_some_and(|e| e.is_constraint_violation()));
        assert_eq!(
            err.to_string(),
            "Duplicate categories.name: 'Food' already exists"
        );
    }
}

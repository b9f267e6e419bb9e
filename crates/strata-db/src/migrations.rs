//! # Database Migrations
//!
//! Runs embedded SQL migrations supplied by the application.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  static MIGRATOR = sqlx::migrate!("path/to/migrations")  (app crate)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path).migrations(&MIGRATOR)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config) → run_migrations(pool, &MIGRATOR)               │
//! │       │                                                                 │
//! │       ├── _sqlx_migrations missing? Create it                          │
//! │       ├── 001_ledger.sql ✓ (already applied)                           │
//! │       └── 002_...        ⬜ (NEW - runs now, inside a transaction)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories map onto tables; they never create them. The schema is owned
//! by whoever owns the migrator.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::StorageResult;

/// Runs all pending migrations of `migrator`.
///
/// ## Safety
/// - Idempotent: safe to run multiple times
/// - Transactional: each migration runs in a transaction
/// - Ordered: migrations run in version order
pub async fn run_migrations(pool: &SqlitePool, migrator: &Migrator) -> StorageResult<()> {
    info!(
        available = migrator.iter().count(),
        "Checking for pending migrations"
    );

    migrator.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns information about migrations.
///
/// ## Returns
/// Tuple of (total_migrations, applied_migrations). A database that never
/// ran a migration reports zero applied; any other failure is returned.
pub async fn migration_status(pool: &SqlitePool, migrator: &Migrator) -> StorageResult<(usize, usize)> {
    let total = migrator.iter().count();

    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if tracked == 0 {
        return Ok((total, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::error::StorageError;
    use crate::pool::Database;
    use crate::sample::LEDGER_MIGRATOR;

    #[tokio::test]
    async fn test_status_before_and_after() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (total, applied) = migration_status(db.pool(), &LEDGER_MIGRATOR).await.unwrap();
        assert!(total > 0);
        assert_eq!(applied, 0);

        run_migrations(db.pool(), &LEDGER_MIGRATOR).await.unwrap();
        // Second run is a no-op
        run_migrations(db.pool(), &LEDGER_MIGRATOR).await.unwrap();

        let (total, applied) = migration_status(db.pool(), &LEDGER_MIGRATOR).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_status_fails_on_closed_pool() {
        let db = Database::new(DbConfig::in_memory().migrations(&LEDGER_MIGRATOR))
            .await
            .unwrap();
        assert_eq!(db.migration_status(&LEDGER_MIGRATOR).await.unwrap(), (1, 1));

        db.close().await;
        let err = db.migration_status(&LEDGER_MIGRATOR).await.unwrap_err();
        assert!(matches!(err, StorageError::ConnectionFailed(_)));
    }
}

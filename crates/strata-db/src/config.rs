//! # Database Configuration
//!
//! `DbConfig` is built in code (builder methods) or loaded from environment
//! variables with fallback to defaults.
//!
//! ## Environment Variables
//! ```text
//! ┌─────────────────────────────────┬──────────────────┬───────────────────┐
//! │ Variable                        │ Default          │ Field             │
//! ├─────────────────────────────────┼──────────────────┼───────────────────┤
//! │ STRATA_DB_PATH                  │ ./strata.db      │ database_path     │
//! │ STRATA_DB_MAX_CONNECTIONS       │ 5                │ max_connections   │
//! │ STRATA_DB_MIN_CONNECTIONS       │ 1                │ min_connections   │
//! │ STRATA_DB_CONNECT_TIMEOUT_SECS  │ 30               │ connect_timeout   │
//! │ STRATA_DB_IDLE_TIMEOUT_SECS     │ 600              │ idle_timeout      │
//! └─────────────────────────────────┴──────────────────┴───────────────────┘
//! ```
//! `STRATA_DB_PATH=:memory:` selects an in-memory database.

use sqlx::migrate::Migrator;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Path value that selects an in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Default database file when `STRATA_DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "./strata.db";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/ledger.db")
///     .max_connections(5)
///     .min_connections(1)
///     .migrations(&MY_MIGRATOR);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a pooled connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Migrations to run on connect. The schema belongs to the application,
    /// so none run unless one is supplied.
    pub migrator: Option<&'static Migrator>,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            migrator: None,
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = DbConfig::in_memory();
    /// let db = Database::new(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            migrator: None,
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests pass a map lookup instead of touching
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("STRATA_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        if path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("STRATA_DB_PATH".to_string()));
        }

        let base = if path == IN_MEMORY_PATH {
            DbConfig::in_memory()
        } else {
            DbConfig::new(path)
        };

        let config = DbConfig {
            max_connections: parse_or(&lookup, "STRATA_DB_MAX_CONNECTIONS", base.max_connections)?,
            min_connections: parse_or(&lookup, "STRATA_DB_MIN_CONNECTIONS", base.min_connections)?,
            connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STRATA_DB_CONNECT_TIMEOUT_SECS",
                base.connect_timeout.as_secs(),
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STRATA_DB_IDLE_TIMEOUT_SECS",
                base.idle_timeout.as_secs(),
            )?),
            ..base
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks pool sizing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STRATA_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "STRATA_DB_MIN_CONNECTIONS".to_string(),
            ));
        }
        if self.is_in_memory() && self.max_connections != 1 {
            return Err(ConfigError::InMemoryPoolSize);
        }
        Ok(())
    }

    /// Returns true if this configuration targets an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the migrations to run on connect.
    pub fn migrations(mut self, migrator: &'static Migrator) -> Self {
        self.migrator = Some(migrator);
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("In-memory databases must use exactly one connection")]
    InMemoryPoolSize,
}

// =============================================================================
// Unit Tests
// =============================================================================

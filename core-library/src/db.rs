//! # Catalog Database
//!
//! Opens the SQLite pool behind the local catalog store and applies the
//! embedded migrations.
//!
//! File-backed databases run in WAL mode so readers (the host listing the
//! catalog) never wait on the refresh pipeline's writes.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("shelf.db")).await?;
//! let repository = SqliteLocalCatalogRepository::new(pool);
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
    /// Maximum time to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// A database file at `database_path`, created if missing.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();

        Self {
            database_url: format!("sqlite:{}", path.display()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn in_memory() -> Self {
        // Every in-memory connection is its own database, so the pool must
        // never open a second one.
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }
}

/// Open the pool, run migrations and check that a query goes through.
///
/// # Errors
///
/// - `LibraryError::Database` when the file cannot be opened or queried
/// - `LibraryError::Migration` when a migration fails
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening catalog database"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to open catalog database");
            LibraryError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// In-memory database with migrations applied, for tests.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Apply the migrations embedded from `migrations/`.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    debug!("Catalog migrations applied");
    Ok(())
}

pub async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(LibraryError::Database)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[core_async::test]
    async fn test_migrations_create_catalog_table() {
        let pool = create_test_pool().await.unwrap();

        let (tables,): (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='catalog_records'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 1);

        let (indexes,): (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_catalog_records_audience'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(indexes, 1);
    }

    #[core_async::test]
    async fn test_audience_constraint_is_enforced() {
        let pool = create_test_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO catalog_records (id, title, audience, document_url, created_at, updated_at)
             VALUES ('x', 'X', 'grandparent', 'https://example.com/x.pdf', 0, 0)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "unknown audience should be rejected");
    }

    #[core_async::test]
    async fn test_file_backed_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");

        let pool = create_pool(DatabaseConfig::new(&path).max_connections(2))
            .await
            .unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(path.exists());
    }

    #[core_async::test]
    async fn test_reopening_applies_no_new_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");

        let first = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        first.close().await;

        let second = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        health_check(&second).await.unwrap();
    }
}

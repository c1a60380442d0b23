//! SQLite-backed [`SettingsStore`]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Each row holds exactly one of `text_value` / `int_value`, so an integer
/// key can never be read back as a string.
const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key        TEXT PRIMARY KEY,
        text_value TEXT,
        int_value  INTEGER,
        updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
        CHECK ((text_value IS NULL) <> (int_value IS NULL))
    )
"#;

fn db_error(action: &str, key: &str, e: sqlx::Error) -> BridgeError {
    BridgeError::DatabaseError(format!("{} '{}': {}", action, key, e))
}

pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Open the settings database at `db_path`, creating the file and its
    /// parent directory when missing.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let store = Self::open(options, 2).await?;

        debug!(path = ?db_path, "Opened settings store");
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        // A second connection would see a different, empty database.
        Self::open(options, 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("open settings database: {}", e)))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("create settings table: {}", e)))?;

        Ok(Self { pool })
    }

    /// `(text_value, int_value)` for `key`, if present
    async fn load(&self, key: &str) -> Result<Option<(Option<String>, Option<i64>)>> {
        sqlx::query_as("SELECT text_value, int_value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("read setting", key, e))
    }

    async fn store(&self, key: &str, text: Option<&str>, int: Option<i64>) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, text_value, int_value) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 text_value = excluded.text_value,
                 int_value = excluded.int_value,
                 updated_at = strftime('%s', 'now')",
        )
        .bind(key)
        .bind(text)
        .bind(int)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("write setting", key, e))?;

        debug!(key, "Stored setting");
        Ok(())
    }
}

fn type_mismatch(key: &str, expected: &str) -> BridgeError {
    BridgeError::OperationFailed(format!("setting '{}' is not a {}", key, expected))
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.store(key, Some(value), None).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.load(key).await? {
            None => Ok(None),
            Some((Some(text), _)) => Ok(Some(text)),
            Some((None, _)) => Err(type_mismatch(key, "string")),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.store(key, None, Some(value)).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.load(key).await? {
            None => Ok(None),
            Some((_, Some(int))) => Ok(Some(int)),
            Some((_, None)) => Err(type_mismatch(key, "i64")),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete setting", key, e))?;
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.load(key).await?.is_some())
    }
}

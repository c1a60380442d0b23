//! Local catalog repository trait and SQLite implementation

use crate::error::{LibraryError, Result};
use crate::models::{
    dedup_last_wins, Audience, CacheState, CatalogEntry, CatalogRecordRow, LocalCatalogRecord,
};
use async_trait::async_trait;
use core_async::sync::Mutex;
use sqlx::{query_as, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const ENTITY_TYPE: &str = "catalog_record";

/// What a reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Records created for entries that were not stored yet
    pub inserted: u64,
    /// Existing records whose remote fields changed
    pub updated: u64,
    /// Existing records that already matched their entry
    pub unchanged: u64,
    /// Records deleted because their id vanished from the catalog.
    ///
    /// Returned in full so the caller can evict their cached files.
    pub removed: Vec<LocalCatalogRecord>,
    /// Records whose document URL changed; their old cached file is orphaned
    pub invalidated: Vec<LocalCatalogRecord>,
}

/// Local catalog store interface
#[async_trait]
pub trait LocalCatalogRepository: Send + Sync {
    /// Make the stored set of records match `entries` exactly.
    ///
    /// Persisting records keep their local fields; a record whose document
    /// URL changed loses its cached file reference. Runs in one transaction.
    async fn reconcile(&self, entries: &[CatalogEntry]) -> Result<ReconcileOutcome>;

    /// All records ordered by audience, then title
    async fn find_all(&self) -> Result<Vec<LocalCatalogRecord>>;

    /// Find a record by its ID
    ///
    /// # Returns
    /// - `Ok(Some(record))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: &str) -> Result<Option<LocalCatalogRecord>>;

    async fn find_by_audience(&self, audience: Audience) -> Result<Vec<LocalCatalogRecord>>;

    /// Record where the document for `id` is cached.
    ///
    /// # Errors
    /// `LibraryError::NotFound` if no record has this id.
    async fn set_cache_state(&self, id: &str, state: &CacheState) -> Result<()>;

    /// # Errors
    /// `LibraryError::NotFound` if no record has this id.
    async fn set_page_count(&self, id: &str, pages: u32) -> Result<()>;

    /// Delete every record, returning how many were removed
    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<u64>;
}

/// SQLite implementation of LocalCatalogRepository
pub struct SqliteLocalCatalogRepository {
    pool: SqlitePool,
    /// Serializes every mutation of the catalog table
    write_lock: Mutex<()>,
}

impl SqliteLocalCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn not_found(id: &str) -> LibraryError {
        LibraryError::NotFound {
            entity_type: ENTITY_TYPE.to_string(),
            id: id.to_string(),
        }
    }

    fn into_records(rows: Vec<CatalogRecordRow>) -> Result<Vec<LocalCatalogRecord>> {
        rows.into_iter().map(LocalCatalogRecord::try_from).collect()
    }
}

#[async_trait]
impl LocalCatalogRepository for SqliteLocalCatalogRepository {
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn reconcile(&self, entries: &[CatalogEntry]) -> Result<ReconcileOutcome> {
        for entry in entries {
            entry.validate().map_err(|message| LibraryError::InvalidInput {
                field: "catalog_entry".to_string(),
                message,
            })?;
        }

        let (entries, duplicates) = dedup_last_wins(entries);
        if !duplicates.is_empty() {
            warn!(ids = ?duplicates, "Duplicate catalog ids; keeping the last occurrence");
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = Self::now();

        let rows = query_as::<_, CatalogRecordRow>("SELECT * FROM catalog_records")
            .fetch_all(&mut *tx)
            .await?;
        let mut existing: HashMap<String, LocalCatalogRecord> = Self::into_records(rows)?
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        let mut outcome = ReconcileOutcome::default();
        for entry in &entries {
            match existing.remove(&entry.id) {
                Some(record) if !record.differs_from(entry) => {
                    outcome.unchanged += 1;
                }
                Some(record) => {
                    let url_changed = record.document_url != entry.document_url;
                    let local_file_path = if url_changed {
                        None
                    } else {
                        record.cache.to_column()
                    };

                    sqlx::query(
                        r#"
                        UPDATE catalog_records SET
                            title = ?, audience = ?, document_url = ?,
                            local_file_path = ?, updated_at = ?
                        WHERE id = ?
                        "#,
                    )
                    .bind(&entry.title)
                    .bind(entry.audience.as_str())
                    .bind(&entry.document_url)
                    .bind(local_file_path)
                    .bind(now)
                    .bind(&entry.id)
                    .execute(&mut *tx)
                    .await?;

                    outcome.updated += 1;
                    if url_changed && record.cache.is_cached() {
                        outcome.invalidated.push(record);
                    }
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO catalog_records (
                            id, title, audience, document_url,
                            local_file_path, total_pages, created_at, updated_at
                        ) VALUES (?, ?, ?, ?, NULL, NULL, ?, ?)
                        "#,
                    )
                    .bind(&entry.id)
                    .bind(&entry.title)
                    .bind(entry.audience.as_str())
                    .bind(&entry.document_url)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    outcome.inserted += 1;
                }
            }
        }

        // Whatever is left in `existing` was not in the catalog.
        let mut stale: Vec<LocalCatalogRecord> = existing.into_values().collect();
        stale.sort_by(|a, b| a.id.cmp(&b.id));

        for record in &stale {
            sqlx::query("DELETE FROM catalog_records WHERE id = ?")
                .bind(&record.id)
                .execute(&mut *tx)
                .await?;
        }
        outcome.removed = stale;

        tx.commit().await?;

        info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            removed = outcome.removed.len(),
            "Reconciled local catalog"
        );

        Ok(outcome)
    }

    async fn find_all(&self) -> Result<Vec<LocalCatalogRecord>> {
        let rows = query_as::<_, CatalogRecordRow>(
            "SELECT * FROM catalog_records ORDER BY audience, title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Self::into_records(rows)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LocalCatalogRecord>> {
        let row = query_as::<_, CatalogRecordRow>("SELECT * FROM catalog_records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LocalCatalogRecord::try_from).transpose()
    }

    async fn find_by_audience(&self, audience: Audience) -> Result<Vec<LocalCatalogRecord>> {
        let rows = query_as::<_, CatalogRecordRow>(
            "SELECT * FROM catalog_records WHERE audience = ? ORDER BY title, id",
        )
        .bind(audience.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::into_records(rows)
    }

    async fn set_cache_state(&self, id: &str, state: &CacheState) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "UPDATE catalog_records SET local_file_path = ?, updated_at = ? WHERE id = ?",
        )
        .bind(state.to_column())
        .bind(Self::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }

        debug!(id, cached = state.is_cached(), "Updated cache state");
        Ok(())
    }

    async fn set_page_count(&self, id: &str, pages: u32) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "UPDATE catalog_records SET total_pages = ?, updated_at = ? WHERE id = ?",
        )
        .bind(i64::from(pages))
        .bind(Self::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }

        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query("DELETE FROM catalog_records")
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Cleared local catalog");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM catalog_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

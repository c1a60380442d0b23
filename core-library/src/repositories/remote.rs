//! Remote catalog store interface
//!
//! The remote store is a durable, queryable mirror of the catalog kept by a
//! document index service. Implementations live in provider crates.

use crate::error::Result;
use crate::models::CatalogEntry;
use async_trait::async_trait;

/// Durable remote mirror of catalog entries
#[async_trait]
pub trait RemoteCatalogStore: Send + Sync {
    /// Remove every entry. Completes before any repopulation starts.
    async fn delete_all(&self) -> Result<()>;

    /// Upsert one document per entry, keyed by id.
    ///
    /// Within one batch the last occurrence of a duplicated id is the one
    /// written.
    async fn add_entries(&self, entries: &[CatalogEntry]) -> Result<()>;

    /// Every entry currently stored
    async fn fetch_all(&self) -> Result<Vec<CatalogEntry>>;
}

//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! settings, clock) into the reading shelf core and exposes the handful of
//! operations a host application needs: refresh the catalog, read it, and
//! follow progress through the event stream.
//!
//! Desktop apps typically enable the `desktop-shims` feature so that bridges
//! they leave unset in [`CoreConfig`] fall back to the `bridge-desktop`
//! implementations.
//!
//! ```rust,ignore
//! use core_runtime::config::{ContentHostConfig, CoreConfig, DocumentIndexConfig};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/reading-shelf/shelf.db")
//!     .content_host(ContentHostConfig::new("https://api.github.com/repos/acme/shelf/contents"))
//!     .document_index(DocumentIndexConfig::new("https://index.example.com"))
//!     .build()?;
//!
//! let core = core_service::bootstrap(config).await?;
//! core.refresh_if_needed().await?;
//! let books = core.catalog_for(Audience::Child).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::models::{Audience, CacheState, LocalCatalogRecord};
pub use core_runtime::events::{CoreEvent, Receiver};
pub use core_sync::{RefreshOutcome, SyncReport};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_cache::{CacheConfig, ContentCache};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::{LocalCatalogRepository, SqliteLocalCatalogRepository};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use core_sync::{CatalogFetcher, ClearPolicy, StalenessPolicy, SyncOrchestrator};
use provider_content_host::ContentHostConnector;
use provider_document_index::DocumentIndexCatalogStore;
use tracing::{debug, info, instrument};

struct ServiceInner {
    orchestrator: SyncOrchestrator,
    local_store: Arc<dyn LocalCatalogRepository>,
    cache: Arc<ContentCache>,
    event_bus: EventBus,
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap and every clone shares the same refresh lock.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Assemble a service from already constructed components.
    ///
    /// `cache` must be initialized. Most hosts use [`bootstrap`] instead.
    pub fn new(
        orchestrator: SyncOrchestrator,
        local_store: Arc<dyn LocalCatalogRepository>,
        cache: Arc<ContentCache>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                orchestrator,
                local_store,
                cache,
                event_bus,
            }),
        }
    }

    /// Run a full catalog refresh now, waiting for one already in flight.
    pub async fn refresh(&self) -> Result<SyncReport> {
        Ok(self.inner.orchestrator.refresh().await?)
    }

    /// Refresh only if the last successful refresh is older than the
    /// configured interval.
    pub async fn refresh_if_needed(&self) -> Result<RefreshOutcome> {
        Ok(self.inner.orchestrator.refresh_if_needed().await?)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.orchestrator.is_refreshing()
    }

    /// Every local record, ordered by audience then title.
    ///
    /// A record whose cached file has disappeared is reported as
    /// [`CacheState::NotCached`]; the next refresh downloads it again.
    #[instrument(skip(self))]
    pub async fn catalog(&self) -> Result<Vec<LocalCatalogRecord>> {
        let records = self.inner.local_store.find_all().await?;
        self.verified(records).await
    }

    /// Records for one audience, ordered by title.
    #[instrument(skip(self))]
    pub async fn catalog_for(&self, audience: Audience) -> Result<Vec<LocalCatalogRecord>> {
        let records = self.inner.local_store.find_by_audience(audience).await?;
        self.verified(records).await
    }

    pub async fn record(&self, id: &str) -> Result<Option<LocalCatalogRecord>> {
        match self.inner.local_store.find_by_id(id).await? {
            Some(record) => Ok(Some(self.verify(record).await?)),
            None => Ok(None),
        }
    }

    /// Remember the page count the reader found when opening a document.
    ///
    /// The value survives later refreshes as long as the entry stays in the
    /// catalog.
    pub async fn record_page_count(&self, id: &str, pages: u32) -> Result<()> {
        self.inner.local_store.set_page_count(id, pages).await?;
        debug!(id, pages, "Recorded page count");
        Ok(())
    }

    pub async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner.orchestrator.staleness().last_refreshed_at().await?)
    }

    /// Mark the catalog stale so the next `refresh_if_needed` runs.
    pub async fn invalidate(&self) -> Result<()> {
        self.inner.orchestrator.staleness().invalidate().await?;
        info!("Catalog marked stale");
        Ok(())
    }

    /// Subscribe to sync and cache events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.event_bus.subscribe()
    }

    async fn verified(&self, records: Vec<LocalCatalogRecord>) -> Result<Vec<LocalCatalogRecord>> {
        let mut verified = Vec::with_capacity(records.len());
        for record in records {
            verified.push(self.verify(record).await?);
        }
        Ok(verified)
    }

    async fn verify(&self, mut record: LocalCatalogRecord) -> Result<LocalCatalogRecord> {
        let missing = match record.cache.path() {
            Some(path) => !self.inner.cache.contains(path).await?,
            None => false,
        };
        if missing {
            debug!(id = %record.id, "Cached document is missing");
            record.cache = CacheState::NotCached;
        }
        Ok(record)
    }
}

/// Build a ready-to-use [`CoreService`] from a validated configuration.
///
/// Opens (and migrates) the catalog database, creates the document cache
/// directory and wires the content host and document index providers.
#[instrument(skip(config), fields(database = %config.database_path.display()))]
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    config.validate()?;

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            config.file_system.create_dir_all(parent).await.map_err(|e| {
                CoreError::InitializationFailed(format!(
                    "Cannot create database directory: {}",
                    e
                ))
            })?;
        }
    }

    let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
    let local_store: Arc<dyn LocalCatalogRepository> =
        Arc::new(SqliteLocalCatalogRepository::new(pool));

    let event_bus = EventBus::default();

    let cache = Arc::new(
        ContentCache::new(
            CacheConfig::default()
                .with_file_extension(config.content_host.document_extension.trim())
                .with_max_concurrent_downloads(config.sync.max_concurrent_downloads),
            config.file_system.clone(),
            config.http_client.clone(),
        )
        .with_event_bus(event_bus.clone()),
    );
    cache.initialize().await?;

    let connector = Arc::new(ContentHostConnector::new(
        config.http_client.clone(),
        &config.content_host,
    ));
    let remote_store = Arc::new(DocumentIndexCatalogStore::new(
        config.http_client.clone(),
        &config.document_index,
    )?);

    let staleness = StalenessPolicy::new(
        config.settings_store.clone(),
        config.clock.clone(),
        config.sync.staleness_interval,
    );

    let orchestrator = SyncOrchestrator::new(
        CatalogFetcher::new(connector, &config.content_host),
        remote_store,
        local_store.clone(),
        cache.clone(),
        staleness,
        event_bus.clone(),
    )
    .with_clear_policy(ClearPolicy::from_clear_local_state(
        config.sync.clear_local_state,
    ));

    info!(
        clear_local_state = config.sync.clear_local_state,
        max_concurrent_downloads = config.sync.max_concurrent_downloads,
        "Reading shelf core initialized"
    );

    Ok(CoreService::new(orchestrator, local_store, cache, event_bus))
}

/// Build the configuration with desktop defaults for every bridge left unset
/// on `builder`, then [`bootstrap`] it.
///
/// Must be called from inside an async runtime.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    builder: core_runtime::config::CoreConfigBuilder,
) -> Result<CoreService> {
    let config = builder.build()?;
    bootstrap(config).await
}

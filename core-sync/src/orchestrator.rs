//! # Sync Orchestrator
//!
//! Runs the catalog refresh pipeline and guarantees that only one refresh
//! runs at a time.
//!
//! ## Workflow
//!
//! 1. **Clear**: empty the remote store, and (under [`ClearPolicy::Full`])
//!    the content cache and local store, concurrently
//! 2. **Populate**: fetch the catalog, write it to the remote store, reconcile
//!    the local store and evict cache files nothing references anymore
//! 3. **Materialize**: download every document without a local file, one
//!    task per document, and record each file as its task completes
//! 4. Mark the catalog fresh
//!
//! Stages run strictly in order and the first failing stage aborts the run.
//! Inside stage 3 a failure only affects its own document, but any failure
//! keeps the catalog stale so the next `refresh_if_needed` tries again.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = SyncOrchestrator::new(
//!     fetcher,
//!     remote_store,
//!     local_store,
//!     cache,
//!     staleness,
//!     event_bus,
//! );
//!
//! match orchestrator.refresh_if_needed().await? {
//!     RefreshOutcome::Fresh => {}
//!     RefreshOutcome::Refreshed(report) => println!("{} documents", report.entries_fetched),
//! }
//! ```

use crate::error::{EntryFailure, Result, SyncError};
use crate::fetcher::CatalogFetcher;
use crate::staleness::StalenessPolicy;
use core_async::sync::Mutex;
use core_async::time::Instant;
use core_cache::{CacheError, CacheOutcome, ContentCache};
use core_library::models::{CacheState, CatalogEntry, LocalCatalogRecord};
use core_library::{LocalCatalogRepository, ReconcileOutcome, RemoteCatalogStore};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, SyncEvent, SyncStage};
use core_runtime::logging::strip_path;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// What the clear stage wipes before repopulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    /// Remote store, content cache and local store
    #[default]
    Full,
    /// Only the remote store; local records and cached files are reconciled
    /// in place
    RemoteOnly,
}

impl ClearPolicy {
    pub fn from_clear_local_state(clear_local_state: bool) -> Self {
        if clear_local_state {
            ClearPolicy::Full
        } else {
            ClearPolicy::RemoteOnly
        }
    }

    pub fn clears_local_state(&self) -> bool {
        matches!(self, ClearPolicy::Full)
    }
}

/// Statistics of one successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: String,
    pub entries_fetched: u64,
    pub records_inserted: u64,
    pub records_updated: u64,
    /// Records wiped by the clear stage plus records swept by reconcile
    pub records_removed: u64,
    pub documents_downloaded: u64,
    /// Documents whose file was already on disk
    pub documents_reused: u64,
    /// Cache files deleted by the clear stage or the orphan sweep
    pub files_evicted: u64,
    pub duration: Duration,
}

/// Result of [`SyncOrchestrator::refresh_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The catalog was fresh; nothing ran.
    Fresh,
    Refreshed(SyncReport),
}

impl RefreshOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            RefreshOutcome::Fresh => None,
            RefreshOutcome::Refreshed(report) => Some(report),
        }
    }
}

pub struct SyncOrchestrator {
    fetcher: CatalogFetcher,
    remote_store: Arc<dyn RemoteCatalogStore>,
    local_store: Arc<dyn LocalCatalogRepository>,
    cache: Arc<ContentCache>,
    staleness: StalenessPolicy,
    event_bus: EventBus,
    clear_policy: ClearPolicy,

    /// Held for the whole pipeline of one refresh
    refresh_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        fetcher: CatalogFetcher,
        remote_store: Arc<dyn RemoteCatalogStore>,
        local_store: Arc<dyn LocalCatalogRepository>,
        cache: Arc<ContentCache>,
        staleness: StalenessPolicy,
        event_bus: EventBus,
    ) -> Self {
        Self {
            fetcher,
            remote_store,
            local_store,
            cache,
            staleness,
            event_bus,
            clear_policy: ClearPolicy::default(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_clear_policy(mut self, policy: ClearPolicy) -> Self {
        self.clear_policy = policy;
        self
    }

    pub fn clear_policy(&self) -> ClearPolicy {
        self.clear_policy
    }

    pub fn staleness(&self) -> &StalenessPolicy {
        &self.staleness
    }

    /// Whether a refresh currently holds the lock.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Run the full pipeline now.
    ///
    /// A second caller waits for the refresh in flight to finish and then
    /// runs its own.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<SyncReport> {
        let _guard = self.refresh_lock.lock().await;
        self.run_pipeline().await
    }

    /// Run the pipeline only if the catalog is stale.
    ///
    /// A fresh catalog returns [`RefreshOutcome::Fresh`] without touching the
    /// network or the lock. Staleness is checked again once the lock is held
    /// so a refresh that finished while this caller waited is not repeated.
    #[instrument(skip(self))]
    pub async fn refresh_if_needed(&self) -> Result<RefreshOutcome> {
        if !self.staleness.should_refresh().await? {
            self.emit_skipped().await;
            return Ok(RefreshOutcome::Fresh);
        }

        let _guard = self.refresh_lock.lock().await;
        if !self.staleness.should_refresh().await? {
            debug!("Catalog refreshed while waiting for the lock");
            self.emit_skipped().await;
            return Ok(RefreshOutcome::Fresh);
        }

        self.run_pipeline().await.map(RefreshOutcome::Refreshed)
    }

    /// Caller must hold `refresh_lock`.
    async fn run_pipeline(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport {
            run_id: Uuid::new_v4().to_string(),
            ..SyncReport::default()
        };

        info!(
            run_id = %report.run_id,
            policy = ?self.clear_policy,
            "Starting catalog refresh"
        );
        self.emit(SyncEvent::Started {
            run_id: report.run_id.clone(),
            clears_local_state: self.clear_policy.clears_local_state(),
        });

        if let Err((stage, error)) = self.run_stages(&mut report).await {
            return Err(self.fail(&report.run_id, Some(stage), error));
        }

        if let Err(error) = self.staleness.mark_refreshed().await {
            return Err(self.fail(&report.run_id, None, error));
        }

        report.duration = started.elapsed();
        info!(
            run_id = %report.run_id,
            entries = report.entries_fetched,
            downloaded = report.documents_downloaded,
            reused = report.documents_reused,
            duration_ms = report.duration.as_millis() as u64,
            "Catalog refresh completed"
        );
        self.emit(SyncEvent::Completed {
            run_id: report.run_id.clone(),
            entries_fetched: report.entries_fetched,
            records_inserted: report.records_inserted,
            records_updated: report.records_updated,
            records_removed: report.records_removed,
            documents_downloaded: report.documents_downloaded,
            documents_reused: report.documents_reused,
            duration_ms: report.duration.as_millis() as u64,
        });

        Ok(report)
    }

    async fn run_stages(
        &self,
        report: &mut SyncReport,
    ) -> std::result::Result<(), (SyncStage, SyncError)> {
        self.clear_stage(report)
            .await
            .map_err(|e| (SyncStage::Clear, e))?;
        self.populate_stage(report)
            .await
            .map_err(|e| (SyncStage::Populate, e))?;
        self.materialize_stage(report)
            .await
            .map_err(|e| (SyncStage::Materialize, e))
    }

    fn fail(&self, run_id: &str, stage: Option<SyncStage>, error: SyncError) -> SyncError {
        error!(
            run_id,
            stage = stage.map(|s| s.as_str()).unwrap_or("finalize"),
            kind = %error.kind(),
            error = %error,
            "Catalog refresh failed"
        );
        self.emit(SyncEvent::Failed {
            run_id: run_id.to_string(),
            stage,
            message: error.to_string(),
            recoverable: error.is_retryable(),
        });
        error
    }

    // ------------------------------------------------------------------
    // Stage 1: clear
    // ------------------------------------------------------------------

    async fn clear_stage(&self, report: &mut SyncReport) -> Result<()> {
        self.stage_started(&report.run_id, SyncStage::Clear);

        match self.clear_policy {
            ClearPolicy::Full => {
                let ((), files_removed, records_removed) = futures::try_join!(
                    async { Ok::<_, SyncError>(self.remote_store.delete_all().await?) },
                    async { Ok::<_, SyncError>(self.cache.clear().await?) },
                    async { Ok::<_, SyncError>(self.local_store.delete_all().await?) },
                )?;

                report.files_evicted += files_removed as u64;
                report.records_removed += records_removed;
                debug!(files_removed, records_removed, "Cleared remote and local state");
            }
            ClearPolicy::RemoteOnly => {
                self.remote_store.delete_all().await?;
                debug!("Cleared remote store");
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Stage 2: populate
    // ------------------------------------------------------------------

    async fn populate_stage(&self, report: &mut SyncReport) -> Result<()> {
        self.stage_started(&report.run_id, SyncStage::Populate);

        let entries = self.fetcher.fetch_catalog().await?;
        report.entries_fetched = entries.len() as u64;

        self.remote_store.add_entries(&entries).await?;
        let outcome = self.local_store.reconcile(&entries).await?;

        report.records_inserted = outcome.inserted;
        report.records_updated = outcome.updated;
        report.records_removed += outcome.removed.len() as u64;
        report.files_evicted += self.evict_orphans(&outcome, &entries).await?;

        Ok(())
    }

    /// Delete cache files that belonged to removed or re-pointed records,
    /// unless a surviving record still uses them.
    async fn evict_orphans(
        &self,
        outcome: &ReconcileOutcome,
        entries: &[CatalogEntry],
    ) -> Result<u64> {
        let candidates: Vec<PathBuf> = outcome
            .removed
            .iter()
            .chain(outcome.invalidated.iter())
            .filter_map(|record| record.cache.path().map(|p| p.to_path_buf()))
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut in_use: HashSet<PathBuf> = HashSet::new();
        for entry in entries {
            in_use.insert(self.cache.path_for(&entry.document_url).await?);
        }
        for record in self.local_store.find_all().await? {
            if let Some(path) = record.cache.path() {
                in_use.insert(path.to_path_buf());
            }
        }

        let mut evicted = 0;
        for path in candidates.iter().filter(|path| !in_use.contains(*path)) {
            match self.cache.evict(path).await {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(CacheError::OutsideCacheDir(_)) => {
                    debug!(file = %strip_path(&path.to_string_lossy()), "Leaving file outside the cache alone");
                }
                Err(error) => {
                    warn!(
                        file = %strip_path(&path.to_string_lossy()),
                        error = %error,
                        "Failed to evict orphaned document"
                    );
                }
            }
        }

        if evicted > 0 {
            info!(evicted, "Evicted orphaned documents");
        }
        Ok(evicted)
    }

    // ------------------------------------------------------------------
    // Stage 3: materialize
    // ------------------------------------------------------------------

    async fn materialize_stage(&self, report: &mut SyncReport) -> Result<()> {
        self.stage_started(&report.run_id, SyncStage::Materialize);

        let pending = self.records_needing_download().await?;
        let total = pending.len();
        if total == 0 {
            debug!("Every document is already cached");
            return Ok(());
        }

        // Fan out: one task per document, throttled by the cache's semaphore.
        let mut tasks = FuturesUnordered::new();
        for record in pending {
            let id = record.id.clone();
            let cache = Arc::clone(&self.cache);
            let handle = core_async::task::spawn(async move { cache.ensure_cached(&record).await });
            tasks.push(async move { (id, handle.await) });
        }

        // Fan in: the only place that writes `local_file_path` during a refresh.
        let mut failures = Vec::new();
        let mut completed = 0u64;
        while let Some((id, joined)) = tasks.next().await {
            completed += 1;

            let result = match joined {
                Ok(Ok(outcome)) => self.record_outcome(&id, &outcome, report).await,
                Ok(Err(error)) => Err(EntryFailure::from_cache_error(&id, error)),
                Err(join_error) => Err(EntryFailure::new(&id, &SyncError::from(join_error))),
            };

            if let Err(failure) = result {
                warn!(id = %id, kind = %failure.kind, error = %failure.message, "Document failed");
                self.emit_cache(CacheEvent::DocumentFailed {
                    entry_id: id,
                    message: failure.message.clone(),
                });
                failures.push(failure);
            }

            self.emit(SyncEvent::Progress {
                run_id: report.run_id.clone(),
                stage: SyncStage::Materialize,
                completed,
                total: total as u64,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
            Err(SyncError::Materialize {
                failed: failures.len(),
                total,
                failures,
            })
        }
    }

    /// Records that are not cached, or whose cached file has vanished.
    async fn records_needing_download(&self) -> Result<Vec<LocalCatalogRecord>> {
        let mut pending = Vec::new();

        for record in self.local_store.find_all().await? {
            let needs_download = match &record.cache {
                CacheState::NotCached => true,
                CacheState::Cached(path) => !self.cache.contains(path).await?,
            };
            if needs_download {
                pending.push(record);
            }
        }

        Ok(pending)
    }

    async fn record_outcome(
        &self,
        id: &str,
        outcome: &CacheOutcome,
        report: &mut SyncReport,
    ) -> std::result::Result<(), EntryFailure> {
        self.local_store
            .set_cache_state(id, &outcome.cache_state())
            .await
            .map_err(|e| EntryFailure::new(id, &SyncError::from(e)))?;

        if outcome.was_downloaded() {
            report.documents_downloaded += 1;
        } else {
            report.documents_reused += 1;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn stage_started(&self, run_id: &str, stage: SyncStage) {
        info!(run_id, %stage, "Refresh stage started");
        self.emit(SyncEvent::StageStarted {
            run_id: run_id.to_string(),
            stage,
        });
    }

    async fn emit_skipped(&self) {
        let last_refreshed_at = match self.staleness.last_refreshed_at().await {
            Ok(Some(at)) => at.timestamp(),
            _ => return,
        };
        debug!(last_refreshed_at, "Catalog is fresh");
        self.emit(SyncEvent::Skipped { last_refreshed_at });
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }

    fn emit_cache(&self, event: CacheEvent) {
        self.event_bus.emit(CoreEvent::Cache(event)).ok();
    }
}

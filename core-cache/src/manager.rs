//! # Content Cache
//!
//! Content-addressed store of downloaded documents on local disk.
//!
//! - Files are named after the SHA-256 of their URL, so a document is
//!   downloaded at most once however many refreshes run
//! - Concurrent downloads are throttled by a semaphore
//! - Bodies are streamed into a unique temp file and atomically renamed, so a
//!   reader never observes a partial document
//! - The directory is flagged as excluded from device backups

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use bridge_traits::{http::HttpClient, storage::FileSystemAccess};
use core_async::io::{AsyncReadExt, AsyncWriteExt};
use core_async::sync::{RwLock, Semaphore};
use core_async::time::timeout;
use core_library::models::{CacheState, LocalCatalogRecord};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::{redact_url, strip_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

const TEMP_SUFFIX: &str = "part";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// How [`ContentCache::ensure_cached`] satisfied a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The content-addressed file was already on disk.
    AlreadyCached(PathBuf),
    /// The record's existing file (e.g. from an older layout) is still present.
    Reused(PathBuf),
    /// The document was fetched over the network.
    Downloaded { path: PathBuf, bytes: u64 },
}

impl CacheOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CacheOutcome::AlreadyCached(path) | CacheOutcome::Reused(path) => path,
            CacheOutcome::Downloaded { path, .. } => path,
        }
    }

    pub fn was_downloaded(&self) -> bool {
        matches!(self, CacheOutcome::Downloaded { .. })
    }

    /// The cache state a record should carry afterwards.
    pub fn cache_state(&self) -> CacheState {
        CacheState::Cached(self.path().to_path_buf())
    }
}

/// Document cache backed by the host file system.
pub struct ContentCache {
    config: CacheConfig,
    fs: Arc<dyn FileSystemAccess>,
    http_client: Arc<dyn HttpClient>,
    event_bus: Option<EventBus>,
    download_semaphore: Arc<Semaphore>,
    cache_dir: RwLock<Option<PathBuf>>,
}

impl ContentCache {
    /// Create a new content cache.
    ///
    /// [`initialize`](Self::initialize) must be called before any other
    /// operation.
    ///
    /// ```rust,ignore
    /// let cache = ContentCache::new(CacheConfig::default(), fs, http_client);
    /// cache.initialize().await?;
    /// ```
    pub fn new(
        config: CacheConfig,
        fs: Arc<dyn FileSystemAccess>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        let download_semaphore = Arc::new(Semaphore::new(config.max_concurrent_downloads));

        Self {
            config,
            fs,
            http_client,
            event_bus: None,
            download_semaphore,
            cache_dir: RwLock::new(None),
        }
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve `<data-dir>/<directory_name>`, create it and exclude it from
    /// backups.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<PathBuf> {
        self.config.validate().map_err(CacheError::InvalidConfig)?;

        let data_dir = self.fs.get_data_directory().await?;
        let cache_dir = data_dir.join(&self.config.directory_name);

        self.fs.create_dir_all(&cache_dir).await?;
        self.fs.exclude_from_backup(&cache_dir).await?;

        *self.cache_dir.write().await = Some(cache_dir.clone());

        info!(dir = %strip_path(&cache_dir.to_string_lossy()), "Content cache initialized");
        Ok(cache_dir)
    }

    /// # Errors
    /// `CacheError::NotInitialized` before [`initialize`](Self::initialize).
    pub async fn cache_dir(&self) -> Result<PathBuf> {
        self.cache_dir
            .read()
            .await
            .clone()
            .ok_or(CacheError::NotInitialized)
    }

    pub fn key_for(&self, url: &str) -> CacheKey {
        CacheKey::for_url(url)
    }

    /// Where the document at `url` is (or would be) cached.
    pub async fn path_for(&self, url: &str) -> Result<PathBuf> {
        let dir = self.cache_dir().await?;
        Ok(dir.join(self.key_for(url).file_name(&self.config.file_extension)))
    }

    pub async fn contains(&self, path: &Path) -> Result<bool> {
        Ok(self.fs.exists(path).await?)
    }

    /// Number of downloads that could start right now.
    pub fn available_download_slots(&self) -> usize {
        self.download_semaphore.available_permits()
    }

    /// Make sure the record's document is on disk, downloading it if needed.
    ///
    /// Safe to call concurrently for different records. Files belonging to
    /// other records are never touched.
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub async fn ensure_cached(&self, record: &LocalCatalogRecord) -> Result<CacheOutcome> {
        let target = self.path_for(&record.document_url).await?;

        if self.fs.exists(&target).await? {
            debug!("Document already cached");
            return Ok(CacheOutcome::AlreadyCached(target));
        }

        if let CacheState::Cached(existing) = &record.cache {
            if existing != &target && self.fs.exists(existing).await? {
                debug!(file = %strip_path(&existing.to_string_lossy()), "Reusing existing file");
                self.emit_cached(record, existing, 0);
                return Ok(CacheOutcome::Reused(existing.clone()));
            }
        }

        let url = validate_url(&record.document_url)?;

        let _permit = timeout(self.config.permit_timeout, self.download_semaphore.acquire())
            .await
            .map_err(|_| CacheError::PermitTimeout(self.config.permit_timeout))?
            .map_err(|_| CacheError::SemaphoreClosed)?;

        // A record sharing this URL may have finished while we waited.
        if self.fs.exists(&target).await? {
            return Ok(CacheOutcome::AlreadyCached(target));
        }

        let bytes = self.download_to(url, &target).await?;

        self.emit_cached(record, &target, bytes);
        Ok(CacheOutcome::Downloaded {
            path: target,
            bytes,
        })
    }

    /// Stream `url` into a temp file next to `target`, then rename it into place.
    async fn download_to(&self, url: Url, target: &Path) -> Result<u64> {
        let temp = temp_path_for(target);
        let display_url = redact_url(url.as_str()).to_string();

        debug!(url = %display_url, "Downloading document");
        let result = match self.config.request_timeout {
            Some(limit) => timeout(limit, self.stream_into(url.to_string(), &temp))
                .await
                .unwrap_or_else(|_| {
                    Err(CacheError::Transport(format!("Transfer exceeded {:?}", limit)))
                }),
            None => self.stream_into(url.to_string(), &temp).await,
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(error) => {
                self.discard(&temp).await;
                warn!(url = %display_url, error = %error, "Document download failed");
                return Err(error);
            }
        };

        if let Err(error) = self.fs.rename(&temp, target).await {
            self.discard(&temp).await;
            return Err(error.into());
        }

        info!(url = %display_url, bytes, "Document cached");
        Ok(bytes)
    }

    async fn stream_into(&self, url: String, temp: &Path) -> Result<u64> {
        let mut reader = self.http_client.download_stream(url).await?;
        let mut writer = self.fs.open_write_stream(temp).await?;

        // Reads fail on the wire, writes fail on the device.
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut bytes = 0u64;
        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| CacheError::Transport(e.to_string()))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .await
                .map_err(|e| CacheError::Io(e.to_string()))?;
            bytes += read as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;
        writer
            .shutdown()
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;

        Ok(bytes)
    }

    async fn discard(&self, temp: &Path) {
        if let Ok(true) = self.fs.exists(temp).await {
            if let Err(error) = self.fs.delete_file(temp).await {
                warn!(error = %error, "Failed to remove partial download");
            }
        }
    }

    /// Remove every cached document and leftover partial download.
    ///
    /// The backup-exclusion marker is left alone.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<usize> {
        let dir = self.cache_dir().await?;
        let mut removed = 0;

        for path in self.fs.list_directory(&dir).await? {
            if !self.is_cache_file(&path) {
                continue;
            }
            self.fs.delete_file(&path).await?;
            removed += 1;
        }

        info!(removed, "Cleared content cache");
        self.emit(CacheEvent::Cleared {
            files_removed: removed as u64,
        });
        Ok(removed)
    }

    /// Remove one cached file.
    ///
    /// Returns `false` when the file did not exist.
    ///
    /// # Errors
    /// `CacheError::OutsideCacheDir` for any path not directly inside the
    /// cache directory.
    pub async fn evict(&self, path: &Path) -> Result<bool> {
        let dir = self.cache_dir().await?;
        if path.parent() != Some(dir.as_path()) || !self.is_cache_file(path) {
            return Err(CacheError::OutsideCacheDir(path.to_path_buf()));
        }

        if !self.fs.exists(path).await? {
            return Ok(false);
        }

        self.fs.delete_file(path).await?;

        let file_name = strip_path(&path.to_string_lossy()).to_string();
        debug!(file = %file_name, "Evicted cached document");
        self.emit(CacheEvent::DocumentEvicted { file_name });
        Ok(true)
    }

    fn is_cache_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(TEMP_SUFFIX) => true,
            Some(ext) => ext.eq_ignore_ascii_case(&self.config.file_extension),
            None => false,
        }
    }

    fn emit_cached(&self, record: &LocalCatalogRecord, path: &Path, bytes: u64) {
        self.emit(CacheEvent::DocumentCached {
            entry_id: record.id.clone(),
            file_name: strip_path(&path.to_string_lossy()).to_string(),
            bytes,
        });
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

/// Only absolute http(s) URLs are fetched.
fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| CacheError::InvalidUrl {
        url: redact_url(raw).to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CacheError::InvalidUrl {
            url: redact_url(raw).to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// `<key>.pdf` becomes `<key>.pdf.<uuid>.part`, unique per transfer.
fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}", Uuid::new_v4().simple(), TEMP_SUFFIX));
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_schemes() {
        assert!(validate_url("https://raw.example.com/a.pdf").is_ok());
        assert!(validate_url("http://localhost:8080/a.pdf").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_inputs() {
        assert!(matches!(
            validate_url("not a url"),
            Err(CacheError::InvalidUrl { .. })
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(CacheError::InvalidUrl { reason, .. }) if reason.contains("file")
        ));
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let target = Path::new("/books/abc.pdf");
        let first = temp_path_for(target);
        let second = temp_path_for(target);

        assert_ne!(first, second);
        assert_eq!(first.parent(), target.parent());
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("abc.pdf."));
        assert!(name.ends_with(".part"));
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = CacheOutcome::Downloaded {
            path: PathBuf::from("/books/abc.pdf"),
            bytes: 10,
        };
        assert!(outcome.was_downloaded());
        assert_eq!(
            outcome.cache_state(),
            CacheState::Cached(PathBuf::from("/books/abc.pdf"))
        );
        assert!(!CacheOutcome::AlreadyCached(PathBuf::from("/x.pdf")).was_downloaded());
    }
}

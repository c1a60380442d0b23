//! # Core Configuration Module
//!
//! Provides configuration management for the reading shelf core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding every bridge and setting the catalog sync pipeline needs.
//! Validation is fail-fast: malformed endpoints and out-of-range settings are
//! rejected by [`CoreConfigBuilder::build`] before any component is created.
//!
//! ## Required Settings
//!
//! - `database_path` - local catalog database
//! - `content_host` - where the catalog listing comes from
//! - `document_index` - the remote durable catalog mirror
//!
//! ## Bridges (with desktop defaults)
//!
//! - `HttpClient` - desktop default: reqwest
//! - `FileSystemAccess` - desktop default: tokio fs
//! - `SettingsStore` - desktop default: SQLite next to the database
//! - `Clock` - default: system clock
//!
//! Without the `desktop-shims` feature the first three must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{ContentHostConfig, CoreConfig, DocumentIndexConfig};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/shelf.db")
//!     .content_host(ContentHostConfig::new("https://api.example.com/repos/acme/shelf/contents"))
//!     .document_index(DocumentIndexConfig::new("https://index.example.com/v1"))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing content host and document index
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/shelf.db")
//!     .build()
//!     .expect("Should fail - missing endpoints");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, HttpClient, SettingsStore, SystemClock};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default time after which the catalog is considered stale.
pub const DEFAULT_STALENESS_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of documents downloaded in parallel.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 64;

/// Core configuration for the reading shelf core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database holding local catalog records
    pub database_path: PathBuf,

    /// Catalog listing source
    pub content_host: ContentHostConfig,

    /// Remote durable catalog mirror
    pub document_index: DocumentIndexConfig,

    /// Refresh policy knobs
    pub sync: CatalogSyncSettings,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    /// Persists the last successful refresh timestamp
    pub settings_store: Arc<dyn SettingsStore>,

    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("content_host", &self.content_host)
            .field("document_index", &self.document_index)
            .field("sync", &self.sync)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

/// Directory-style content host that lists the catalog documents.
///
/// Each audience has its own folder; only files ending in
/// `document_extension` are catalog entries.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentHostConfig {
    /// Base URL of the listing API, e.g. a GitHub contents endpoint
    pub base_url: String,
    /// Optional bearer token sent with listing requests
    pub auth_token: Option<String>,
    pub parent_path: String,
    pub child_path: String,
    /// Extension without the dot, compared case-insensitively
    pub document_extension: String,
}

impl ContentHostConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            parent_path: "parent".to_string(),
            child_path: "child".to_string(),
            document_extension: "pdf".to_string(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Overrides the folder listed for each audience.
    pub fn with_partition_paths(
        mut self,
        parent_path: impl Into<String>,
        child_path: impl Into<String>,
    ) -> Self {
        self.parent_path = parent_path.into();
        self.child_path = child_path.into();
        self
    }

    pub fn with_document_extension(mut self, extension: impl Into<String>) -> Self {
        self.document_extension = extension.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("Content host base URL", &self.base_url)?;

        if self.parent_path.trim().is_empty() || self.child_path.trim().is_empty() {
            return Err(Error::Config(
                "Content host partition paths cannot be empty".to_string(),
            ));
        }

        let extension = self.document_extension.trim();
        if extension.is_empty() || extension.contains('.') {
            return Err(Error::Config(
                "Document extension must be non-empty and given without a dot (e.g. \"pdf\")"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for ContentHostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHostConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("parent_path", &self.parent_path)
            .field("child_path", &self.child_path)
            .field("document_extension", &self.document_extension)
            .finish()
    }
}

/// REST document index that mirrors the catalog remotely.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentIndexConfig {
    pub base_url: String,
    /// Collection holding the catalog documents
    pub collection: String,
    /// Optional bearer API key
    pub api_key: Option<String>,
}

impl DocumentIndexConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection: "books".to_string(),
            api_key: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("Document index base URL", &self.base_url)?;

        let collection = self.collection.trim();
        if collection.is_empty() || collection.contains('/') {
            return Err(Error::Config(
                "Document index collection must be a non-empty name without '/'".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for DocumentIndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentIndexConfig")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Knobs for the catalog refresh pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSyncSettings {
    /// Age after which `refresh_if_needed` runs a full refresh
    pub staleness_interval: Duration,
    /// Upper bound on parallel document downloads
    pub max_concurrent_downloads: usize,
    /// Wipe local records and cached files before repopulating.
    ///
    /// When false, local state is reconciled in place and only missing
    /// documents are downloaded.
    pub clear_local_state: bool,
}

impl Default for CatalogSyncSettings {
    fn default() -> Self {
        Self {
            staleness_interval: DEFAULT_STALENESS_INTERVAL,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            clear_local_state: true,
        }
    }
}

impl CatalogSyncSettings {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.staleness_interval.is_zero() {
            return Err(Error::Config(
                "Staleness interval must be greater than zero".to_string(),
            ));
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "Max concurrent downloads must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT {
            return Err(Error::Config(format!(
                "Max concurrent downloads exceeds maximum of {}",
                MAX_CONCURRENT_DOWNLOADS_LIMIT
            )));
        }

        Ok(())
    }
}

fn validate_http_url(label: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", label, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got '{}'",
            label, other
        ))),
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Endpoints parse as http(s) URLs
    /// - Sync settings are in range
    pub fn validate(&self) -> Result<()> {
        validate_values(
            &self.database_path,
            &self.content_host,
            &self.document_index,
            &self.sync,
        )
    }
}

fn validate_values(
    database_path: &Path,
    content_host: &ContentHostConfig,
    document_index: &DocumentIndexConfig,
    sync: &CatalogSyncSettings,
) -> Result<()> {
    if database_path.as_os_str().is_empty() {
        return Err(Error::Config("Database path cannot be empty".to_string()));
    }

    content_host.validate()?;
    document_index.validate()?;
    sync.validate()
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default implementation. \
             Other hosts: inject a platform implementation through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "catalog listing and document downloads"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    Ok(Arc::new(TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "the document cache"))
}

/// Path of the default settings database, placed beside the catalog database.
#[cfg(feature = "desktop-shims")]
fn default_settings_path(database_path: &Path) -> PathBuf {
    match database_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("settings.db"),
        _ => PathBuf::from("settings.db"),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use core_async::runtime::{Handle, Runtime};
    use std::thread;

    let candidate = default_settings_path(database_path);

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // A runtime cannot be blocked on from inside another one.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(candidate))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(candidate)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing(
        "SettingsStore",
        "persisting the last successful refresh",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every required setting is
/// provided. Bridges left unset fall back to the desktop defaults when the
/// `desktop-shims` feature is enabled.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    content_host: Option<ContentHostConfig>,
    document_index: Option<DocumentIndexConfig>,
    sync: CatalogSyncSettings,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/path/to/shelf.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn content_host(mut self, config: ContentHostConfig) -> Self {
        self.content_host = Some(config);
        self
    }

    pub fn document_index(mut self, config: DocumentIndexConfig) -> Self {
        self.document_index = Some(config);
        self
    }

    /// Replaces all sync settings at once.
    pub fn sync_settings(mut self, settings: CatalogSyncSettings) -> Self {
        self.sync = settings;
        self
    }

    pub fn staleness_interval(mut self, interval: Duration) -> Self {
        self.sync.staleness_interval = interval;
        self
    }

    pub fn max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.sync.max_concurrent_downloads = limit;
        self
    }

    /// Whether a refresh wipes local records and cached files first.
    pub fn clear_local_state(mut self, enabled: bool) -> Self {
        self.sync.clear_local_state = enabled;
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Overrides the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Settings are validated before any default bridge is created, so a
    /// malformed URL never opens a settings database.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when a required setting is missing or invalid
    /// - `Error::CapabilityMissing` when a bridge is absent and no desktop
    ///   default is available
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let content_host = self.content_host.ok_or_else(|| {
            Error::Config("Content host is required. Use .content_host() to set it.".to_string())
        })?;

        let document_index = self.document_index.ok_or_else(|| {
            Error::Config(
                "Document index is required. Use .document_index() to set it.".to_string(),
            )
        })?;

        validate_values(&database_path, &content_host, &document_index, &self.sync)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&database_path)?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        Ok(CoreConfig {
            database_path,
            content_host,
            document_index,
            sync: self.sync,
            http_client,
            file_system,
            settings_store,
            clock,
        })
    }
}

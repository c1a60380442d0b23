//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the reading
//! shelf core.
//!
//! ## Overview
//!
//! The core never touches sockets, disks or preference stores directly. Each
//! capability it needs is expressed as a trait here and implemented per
//! platform (`bridge-desktop` for desktop hosts, native adapters on mobile).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry and streaming downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O, atomic rename, backup exclusion
//! - [`StorageProvider`](storage::StorageProvider) - Directory-style remote listings
//!
//! ### Persistence
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! let http_client = builder.http_client.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "HttpClient".to_string(),
//!     message: "No HTTP client implementation provided. \
//!               Desktop: enable the desktop-shims feature. \
//!               Mobile: inject a platform-native adapter.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Implementations
//! should keep the transport / decode / I/O distinction intact so callers can
//! classify failures without string matching.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! across concurrently running download tasks.

pub mod error;
pub mod http;
pub mod platform;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use platform::{DynAsyncRead, DynAsyncWrite};
pub use storage::{FileSystemAccess, RemoteFile, SettingsStore, StorageProvider};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};

//! # Content Cache Module
//!
//! Content-addressed download cache for catalog documents.
//!
//! ## Overview
//!
//! Each document is stored once under `<data-dir>/Books/<sha256(url)>.pdf`.
//! Repeated refreshes find the file already present and skip the network;
//! interrupted transfers never leave a half-written document behind.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     ContentCache                       │
//! │  - ensure_cached()                     │
//! │  - evict() / clear()                   │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> FileSystemAccess (temp file, rename, backup exclusion)
//!          ├──> HttpClient (streamed download)
//!          └──> EventBus (optional progress events)
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod manager;

pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use manager::{CacheOutcome, ContentCache};

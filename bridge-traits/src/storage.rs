//! Storage and File System Abstractions
//!
//! Platform-agnostic traits for local file I/O, key-value settings and
//! directory-style remote listings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::platform::DynAsyncWrite;

/// File system access trait
///
/// Abstracts the handful of file operations the document cache needs, so it
/// can run against the desktop filesystem, a mobile sandbox or a fake.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn books_dir(fs: &dyn FileSystemAccess) -> Result<PathBuf> {
///     let dir = fs.get_data_directory().await?.join("Books");
///     fs.create_dir_all(&dir).await?;
///     fs.exclude_from_backup(&dir).await?;
///     Ok(dir)
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's data directory
    ///
    /// Suitable for data that must survive storage pressure, such as
    /// documents the user expects to read offline.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    ///
    /// Within one directory this is atomic on every supported platform, which
    /// is what the download cache relies on to publish finished files.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// List the entries of a directory (not recursive)
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for streaming writes, creating or truncating it
    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>>;

    /// Mark a directory so its contents are excluded from device backups
    ///
    /// Implementations use whatever the platform offers (a backup-exclusion
    /// attribute, a `CACHEDIR.TAG` marker). Calling it repeatedly is harmless.
    async fn exclude_from_backup(&self, path: &Path) -> Result<()>;
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite-backed settings table
///
/// Keys should be namespaced by the component that owns them, for example
/// `catalog_sync.last_full_sync_at`.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;
}

/// One entry of a directory-style remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File or folder name, including its extension
    pub name: String,
    /// Path of the entry relative to the listing root
    pub path: String,
    /// Direct download URL; folders and some hosts leave it empty
    pub download_url: Option<String>,
    /// Size in bytes when the host reports it
    pub size: Option<u64>,
    pub is_folder: bool,
}

/// Directory-style remote content host
///
/// Lists the entries of one remote folder. Authentication, paging and retry
/// are the implementation's concern.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List the entries directly under `path`
    ///
    /// # Errors
    ///
    /// Transport failures surface as [`crate::BridgeError::Network`] or
    /// [`crate::BridgeError::HttpStatus`]; a listing that cannot be parsed
    /// surfaces as [`crate::BridgeError::Decode`].
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteFile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_serialization() {
        let file = RemoteFile {
            name: "Alpha.pdf".to_string(),
            path: "child/Alpha.pdf".to_string(),
            download_url: Some("https://cdn.example.com/child/Alpha.pdf".to_string()),
            size: Some(2048),
            is_folder: false,
        };

        let json = serde_json::to_string(&file).unwrap();
        let back: RemoteFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, file);
    }
}

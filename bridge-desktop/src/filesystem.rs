//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    platform::DynAsyncWrite,
    storage::FileSystemAccess,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "reading-shelf";

/// Marker file recognised by backup tools that honour the Cache Directory
/// Tagging convention (restic, borg, tar --exclude-caches).
const CACHEDIR_TAG_NAME: &str = "CACHEDIR.TAG";
const CACHEDIR_TAG_CONTENTS: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file marks the reading shelf document cache.\n\
# Its contents can be downloaded again and need not be backed up.\n";

/// `tokio::fs` backed file access rooted at the platform data directory.
pub struct TokioFileSystem {
    data_dir: PathBuf,
}

impl TokioFileSystem {
    /// Use the platform data directory (`~/.local/share/reading-shelf` on Linux).
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME);

        Self { data_dir }
    }

    pub fn with_data_directory(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        if !self.exists(&self.data_dir).await? {
            self.create_dir_all(&self.data_dir).await?;
        }
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(BridgeError::Io)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(BridgeError::Io)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(BridgeError::Io)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(BridgeError::Io)
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(BridgeError::Io)?;

        while let Some(entry) = read_dir.next_entry().await.map_err(BridgeError::Io)? {
            entries.push(entry.path());
        }

        Ok(entries)
    }

    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(BridgeError::Io)?;
        }

        let file = fs::File::create(path).await.map_err(BridgeError::Io)?;
        Ok(Box::new(file))
    }

    async fn exclude_from_backup(&self, path: &Path) -> Result<()> {
        let tag = path.join(CACHEDIR_TAG_NAME);
        if self.exists(&tag).await? {
            return Ok(());
        }

        fs::write(&tag, CACHEDIR_TAG_CONTENTS)
            .await
            .map_err(BridgeError::Io)?;
        debug!(path = ?path, "Excluded directory from backups");
        Ok(())
    }
}

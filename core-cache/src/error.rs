use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Content cache used before initialize()")]
    NotInitialized,

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid document URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transfer failed: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Io(String),

    #[error("Timed out after {0:?} waiting for a download slot")]
    PermitTimeout(Duration),

    #[error("Download slots are no longer available")]
    SemaphoreClosed,

    #[error("Refusing to touch {0:?}: not inside the cache directory")]
    OutsideCacheDir(PathBuf),
}

impl CacheError {
    /// Whether retrying the same transfer later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            CacheError::Transport(_) | CacheError::PermitTimeout(_) => true,
            _ => false,
        }
    }
}

impl From<BridgeError> for CacheError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::HttpStatus { status, url } => CacheError::HttpStatus { status, url },
            BridgeError::InvalidUrl(url) => CacheError::InvalidUrl {
                url,
                reason: "rejected by the HTTP client".to_string(),
            },
            BridgeError::Network(message) | BridgeError::Decode(message) => {
                CacheError::Transport(message)
            }
            other => CacheError::Io(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

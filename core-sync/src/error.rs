use bridge_traits::error::BridgeError;
use core_async::task::JoinError;
use core_cache::CacheError;
use core_library::LibraryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a refresh failure, stable enough for hosts to
/// pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Decode,
    Storage,
    Concurrency,
    Materialize,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::Storage => "storage",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::Materialize => "materialize",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document that could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub entry_id: String,
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl EntryFailure {
    pub fn new(entry_id: impl Into<String>, error: &SyncError) -> Self {
        Self {
            entry_id: entry_id.into(),
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    /// Keeps the cache's own retry verdict, which knows a 404 from a 503.
    pub fn from_cache_error(entry_id: impl Into<String>, error: CacheError) -> Self {
        let retryable = error.is_retryable();
        let error = SyncError::from(error);
        Self {
            retryable,
            ..Self::new(entry_id, &error)
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed URL, non-success status or network failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A listing or index response had an unexpected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Local store, settings or disk failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// A download task died, or a component was used before it was ready
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    #[error("{failed} of {total} documents could not be downloaded")]
    Materialize {
        failed: usize,
        total: usize,
        failures: Vec<EntryFailure>,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Transport(_) => ErrorKind::Transport,
            SyncError::Decode(_) => ErrorKind::Decode,
            SyncError::Storage(_) => ErrorKind::Storage,
            SyncError::Concurrency(_) => ErrorKind::Concurrency,
            SyncError::Materialize { .. } => ErrorKind::Materialize,
        }
    }

    /// Whether running the refresh again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) | SyncError::Concurrency(_) => true,
            SyncError::Decode(_) | SyncError::Storage(_) => false,
            SyncError::Materialize { failures, .. } => failures.iter().any(|f| f.retryable),
        }
    }
}

impl From<BridgeError> for SyncError {
    fn from(error: BridgeError) -> Self {
        match error {
            e if e.is_transport() => SyncError::Transport(e.to_string()),
            BridgeError::Decode(message) => SyncError::Decode(message),
            other => SyncError::Storage(other.to_string()),
        }
    }
}

impl From<LibraryError> for SyncError {
    fn from(error: LibraryError) -> Self {
        match error {
            LibraryError::Bridge(e) => e.into(),
            other => SyncError::Storage(other.to_string()),
        }
    }
}

impl From<CacheError> for SyncError {
    fn from(error: CacheError) -> Self {
        match error {
            e @ (CacheError::InvalidUrl { .. }
            | CacheError::HttpStatus { .. }
            | CacheError::Transport(_)) => SyncError::Transport(e.to_string()),
            e @ (CacheError::NotInitialized
            | CacheError::PermitTimeout(_)
            | CacheError::SemaphoreClosed) => SyncError::Concurrency(e.to_string()),
            e @ (CacheError::InvalidConfig(_)
            | CacheError::Io(_)
            | CacheError::OutsideCacheDir(_)) => SyncError::Storage(e.to_string()),
        }
    }
}

impl From<JoinError> for SyncError {
    fn from(error: JoinError) -> Self {
        SyncError::Concurrency(format!("Download task did not complete: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_errors_are_classified() {
        let status: SyncError = BridgeError::HttpStatus {
            status: 502,
            url: "https://api.example.com/child".to_string(),
        }
        .into();
        assert_eq!(status.kind(), ErrorKind::Transport);
        assert!(status.is_retryable());

        let decode: SyncError = BridgeError::Decode("expected array".to_string()).into();
        assert_eq!(decode.kind(), ErrorKind::Decode);
        assert!(!decode.is_retryable());

        let settings: SyncError = BridgeError::DatabaseError("locked".to_string()).into();
        assert_eq!(settings.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_library_errors_keep_bridge_classification() {
        let wrapped: SyncError =
            LibraryError::Bridge(BridgeError::Network("reset".to_string())).into();
        assert_eq!(wrapped.kind(), ErrorKind::Transport);

        let missing: SyncError = LibraryError::NotFound {
            entity_type: "catalog_record".to_string(),
            id: "Alpha".to_string(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_cache_errors_are_classified() {
        let cases = [
            (
                CacheError::InvalidUrl {
                    url: "ftp://x".to_string(),
                    reason: "scheme".to_string(),
                },
                ErrorKind::Transport,
            ),
            (CacheError::NotInitialized, ErrorKind::Concurrency),
            (CacheError::Io("disk full".to_string()), ErrorKind::Storage),
        ];

        for (error, expected) in cases {
            assert_eq!(SyncError::from(error).kind(), expected);
        }
    }

    #[test]
    fn test_materialize_retryable_if_any_entry_is() {
        let not_found = SyncError::Transport("HTTP 404".to_string());
        let mut failure = EntryFailure::new("Beta", &not_found);
        failure.retryable = false;

        let error = SyncError::Materialize {
            failed: 1,
            total: 2,
            failures: vec![failure.clone()],
        };
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "1 of 2 documents could not be downloaded");

        failure.retryable = true;
        let error = SyncError::Materialize {
            failed: 1,
            total: 2,
            failures: vec![failure],
        };
        assert!(error.is_retryable());
    }

    #[test]
    fn test_entry_failure_keeps_cache_retry_verdict() {
        let failure = EntryFailure::from_cache_error(
            "Beta",
            CacheError::HttpStatus {
                status: 404,
                url: "https://raw.example.com/Beta.pdf".to_string(),
            },
        );

        assert_eq!(failure.kind, ErrorKind::Transport);
        assert!(!failure.retryable);
        assert!(failure.message.contains("404"));
    }
}

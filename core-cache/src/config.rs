//! Content cache configuration

use std::time::Duration;

/// Configuration for the document cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory under the app data dir holding cached documents (default: "Books")
    pub directory_name: String,

    /// Extension given to cached files, without the dot (default: "pdf")
    pub file_extension: String,

    /// Number of concurrent downloads allowed (default: 4)
    pub max_concurrent_downloads: usize,

    /// Longest wait for a download slot before giving up (default: 5 minutes)
    pub permit_timeout: Duration,

    /// Per-transfer deadline; `None` leaves it to the HTTP client
    pub request_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory_name: "Books".to_string(),
            file_extension: "pdf".to_string(),
            max_concurrent_downloads: 4,
            permit_timeout: Duration::from_secs(300),
            request_timeout: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory_name(mut self, name: impl Into<String>) -> Self {
        self.directory_name = name.into();
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Set maximum concurrent downloads.
    pub fn with_max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = count;
        self
    }

    pub fn with_permit_timeout(mut self, timeout: Duration) -> Self {
        self.permit_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_downloads == 0 {
            return Err("max_concurrent_downloads must be at least 1".to_string());
        }

        let name = self.directory_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err("directory_name must be a single non-empty path segment".to_string());
        }

        if self.file_extension.is_empty() || self.file_extension.contains('.') {
            return Err("file_extension must be non-empty and given without a dot".to_string());
        }

        if self.permit_timeout.is_zero() {
            return Err("permit_timeout must be greater than zero".to_string());
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err("request_timeout must be greater than zero when set".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.directory_name, "Books");
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.permit_timeout, Duration::from_secs(300));
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        assert!(CacheConfig::default()
            .with_max_concurrent_downloads(0)
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_directory_name("../escape")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_directory_name("")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_file_extension(".epub")
            .validate()
            .is_err());
        assert!(CacheConfig::default()
            .with_file_extension("epub")
            .validate()
            .is_ok());
        assert!(CacheConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}

//! Content-addressed cache keys

use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hex SHA-256 of a document URL.
///
/// The key is the cached file's stem, so the same URL always lands on the
/// same file and different URLs never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of the hex digest.
    pub const LEN: usize = 64;

    pub fn for_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the cached document, e.g. `3f2a….pdf`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let url = "https://raw.example.com/shelf/child/Alpha.pdf";
        assert_eq!(CacheKey::for_url(url), CacheKey::for_url(url));
    }

    #[test]
    fn test_distinct_urls_have_distinct_keys() {
        let a = CacheKey::for_url("https://raw.example.com/shelf/child/Alpha.pdf");
        let b = CacheKey::for_url("https://raw.example.com/shelf/child/Beta.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_shape() {
        let key = CacheKey::for_url("");
        assert_eq!(key.as_str().len(), CacheKey::LEN);
        assert!(key
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        // SHA-256 of the empty string
        assert_eq!(
            key.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(key.file_name("pdf"), format!("{}.pdf", key));
    }
}

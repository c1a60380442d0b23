//! Error types for the document index provider

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Document index provider errors
#[derive(Error, Debug)]
pub enum DocumentIndexError {
    /// The index answered with a non-success status
    #[error("Document index returned status {status_code} for {url}")]
    ApiError { status_code: u16, url: String },

    /// The response body could not be parsed
    #[error("Failed to parse document index response: {0}")]
    ParseError(String),

    /// A stored document does not map to a catalog entry
    #[error("Invalid document '{id}': {message}")]
    InvalidDocument { id: String, message: String },

    /// The configured base URL cannot carry path segments
    #[error("Invalid document index URL '{0}'")]
    InvalidBaseUrl(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for document index operations
pub type Result<T> = std::result::Result<T, DocumentIndexError>;

impl From<DocumentIndexError> for BridgeError {
    fn from(error: DocumentIndexError) -> Self {
        match error {
            DocumentIndexError::ApiError { status_code, url } => BridgeError::HttpStatus {
                status: status_code,
                url,
            },
            DocumentIndexError::ParseError(msg) => BridgeError::Decode(msg),
            e @ DocumentIndexError::InvalidDocument { .. } => BridgeError::Decode(e.to_string()),
            DocumentIndexError::InvalidBaseUrl(url) => BridgeError::InvalidUrl(url),
            DocumentIndexError::BridgeError(e) => e,
        }
    }
}

impl From<DocumentIndexError> for LibraryError {
    fn from(error: DocumentIndexError) -> Self {
        LibraryError::Bridge(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DocumentIndexError::InvalidDocument {
            id: "Alpha".to_string(),
            message: "Unknown audience: grandparent".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Invalid document 'Alpha': Unknown audience: grandparent"
        );
    }

    #[test]
    fn test_conversion_into_library_error() {
        let error: LibraryError = DocumentIndexError::ApiError {
            status_code: 503,
            url: "https://index.example.com/collections/books/documents".to_string(),
        }
        .into();

        assert!(matches!(
            error,
            LibraryError::Bridge(BridgeError::HttpStatus { status: 503, .. })
        ));

        let decode: BridgeError = DocumentIndexError::ParseError("eof".to_string()).into();
        assert!(matches!(decode, BridgeError::Decode(_)));
    }
}

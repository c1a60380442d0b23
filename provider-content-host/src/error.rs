//! Error types for the content host provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Content host provider errors
#[derive(Error, Debug)]
pub enum ContentHostError {
    /// The host answered with a non-success status
    #[error("Content host returned status {status_code} for {url}")]
    ApiError { status_code: u16, url: String },

    /// The listing body is not valid JSON or has the wrong field types
    #[error("Failed to parse content host listing: {0}")]
    ParseError(String),

    /// The path resolved to a single file instead of a folder
    #[error("Expected a folder listing at '{path}'")]
    NotAFolder { path: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for content host operations
pub type Result<T> = std::result::Result<T, ContentHostError>;

impl From<ContentHostError> for BridgeError {
    fn from(error: ContentHostError) -> Self {
        match error {
            ContentHostError::ApiError { status_code, url } => BridgeError::HttpStatus {
                status: status_code,
                url,
            },
            ContentHostError::ParseError(msg) => BridgeError::Decode(msg),
            ContentHostError::NotAFolder { path } => {
                BridgeError::Decode(format!("Expected a folder listing at '{}'", path))
            }
            ContentHostError::BridgeError(e) => e,
        }
    }
}

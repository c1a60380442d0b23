use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` for failures that originate on the wire rather than on
    /// the local device.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidUrl(_) | BridgeError::HttpStatus { .. } | BridgeError::Network(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

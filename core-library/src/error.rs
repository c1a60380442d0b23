//! Errors shared by the catalog stores.

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("catalog database: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport or host failure surfaced by a platform bridge.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("no {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },

    /// A record failed validation before it reached a store.
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("schema migration: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;

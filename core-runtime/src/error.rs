use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The host did not register a bridge the core cannot run without.
    #[error("{capability} is not available: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("runtime failure: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error type shared by the Galaxy crates
//!
//! Directory and HTTP failures never reach this type: adapters degrade them to
//! empty results. What remains are failures of the run's own inputs and setup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading a request or writing a profile failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or output JSON could not be encoded or decoded
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unusable configuration file, setting or adapter set
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request cannot be reconciled as given
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// Process-level setup failure (e.g. logging already installed)
    #[error("Internal error: {0}")]
    Internal(String),
}

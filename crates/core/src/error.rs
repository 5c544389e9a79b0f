//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid asset id: {0}")]
    InvalidAssetId(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

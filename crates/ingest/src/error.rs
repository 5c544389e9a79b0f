//! Ingestion error taxonomy.

use bindery_core::QuotaBreach;
use bindery_store::StoreError;
use thiserror::Error;

/// Content verification failures during asset upload.
///
/// These leave the upload slot untouched: the caller may retry with the
/// correct bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("size mismatch: declared {expected} bytes, got {actual}")]
    Size { expected: u64, actual: u64 },

    #[error("md5 mismatch: identifier says {expected}, content is {actual}")]
    Md5 { expected: String, actual: String },

    #[error("sha256 mismatch: declared {expected}, content is {actual}")]
    Sha256 { expected: String, actual: String },
}

/// Ingestion operation errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    QuotaExceeded(#[from] QuotaBreach),

    /// Deliberately carries no detail: callers must not be able to tell a
    /// missing project from an incomplete one, or probe for stored content.
    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Stable machine-readable code for transport mappings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Integrity(_) => "integrity",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::QuotaExceeded(breach) => Self::QuotaExceeded(breach),
            StoreError::Database(e) => Self::Internal(e.to_string()),
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<bindery_core::Error> for IngestError {
    fn from(e: bindery_core::Error) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Result type for ingestion operations.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

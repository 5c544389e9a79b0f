//! Ingestion orchestration for the bindery project-bundle store.
//!
//! [`IngestionService`] is the library's operational surface: it validates
//! and verifies everything a caller submits, then drives the transactional
//! store. Errors map one-to-one onto a small taxonomy meant to translate
//! directly into transport-level responses.

pub mod error;
pub mod service;
pub mod types;

pub use error::{IngestError, IngestResult, IntegrityError};
pub use service::IngestionService;
pub use types::{CreateProjectOutcome, CreateProjectRequest, DeclaredAsset};

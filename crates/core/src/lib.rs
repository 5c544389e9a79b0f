//! Core domain types and shared logic for the bindery project-bundle store.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content hashes (SHA-256) and legacy MD5 digests
//! - Asset identifiers (md5ext) and data formats
//! - Manifest parsing and validation
//! - Project identity and lifecycle state
//! - Ownership token generation and hashing
//! - Size limits and quota checks

pub mod asset_id;
pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod project;
pub mod quota;
pub mod token;

pub use asset_id::{AssetId, DataFormat};
pub use config::{Limits, StoreConfig};
pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher, Md5Hash};
pub use manifest::{ParsedManifest, parse_manifest};
pub use project::{ProjectId, ProjectState};
pub use quota::{QuotaBreach, QuotaEnforcer, QuotaKind};
pub use token::{OwnershipToken, hash_token};

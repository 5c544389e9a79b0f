//! Request and response shapes for the ingestion API.

use bindery_core::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the creator claims about one asset, keyed by its md5ext in the
/// request's asset-manifest map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredAsset {
    /// SHA-256 hex digest of the asset bytes.
    pub sha256: String,
    /// Declared size in bytes.
    pub size: u64,
}

/// A project creation request.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    /// Raw manifest bytes, stored verbatim and parsed for asset references.
    pub manifest: Vec<u8>,
    pub title: String,
    /// Declared assets by md5ext. Must cover every asset the manifest
    /// references; entries the manifest never mentions are ignored.
    pub assets: HashMap<String, DeclaredAsset>,
}

/// The outcome of a successful project creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectOutcome {
    pub project_id: ProjectId,
    /// Token secret, surfaced exactly once. Only its hash is stored.
    pub ownership_token: String,
    /// md5exts the caller still needs to upload, in manifest order.
    pub missing_md5exts: Vec<String>,
}

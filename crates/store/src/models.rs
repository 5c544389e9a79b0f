//! Database models mapping to the store schema.

use bindery_core::ProjectState;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Project record.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub project_id: Uuid,
    /// Raw manifest bytes exactly as submitted.
    pub data: Vec<u8>,
    pub title: String,
    pub description: String,
    pub complete: bool,
    pub created_at: OffsetDateTime,
    /// Projects past this instant are eligible for expiry sweeps, complete
    /// or not. NULL when retention is disabled.
    pub expires_at: Option<OffsetDateTime>,
}

impl ProjectRow {
    /// Lifecycle state derived from the completeness flag.
    pub fn state(&self) -> ProjectState {
        ProjectState::from_flag(self.complete)
    }
}

/// Content-addressed asset record, keyed by SHA-256 hex.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    pub sha256: String,
    pub data: Vec<u8>,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
}

/// An upload slot: an asset a project declared but has not uploaded yet.
#[derive(Debug, Clone, FromRow)]
pub struct IncompleteAssetRow {
    pub project_id: Uuid,
    pub md5ext: String,
    pub expected_sha256: String,
    pub expected_size: i64,
    pub created_at: OffsetDateTime,
}

/// Reference link from a project to stored asset content.
#[derive(Debug, Clone, FromRow)]
pub struct CompleteAssetRow {
    pub project_id: Uuid,
    pub sha256: String,
    pub md5ext: String,
    pub created_at: OffsetDateTime,
}

/// Persisted ownership token hash. The secret itself is never stored.
#[derive(Debug, Clone, FromRow)]
pub struct OwnershipTokenRow {
    pub project_id: Uuid,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
}

/// One declared asset in a project creation request, keyed by md5ext.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub md5ext: String,
    pub declared_sha256: String,
    pub declared_size: u64,
}

/// Everything needed to persist a new project in one transaction.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub project_id: Uuid,
    pub data: Vec<u8>,
    pub title: String,
    pub token_hash: String,
    pub entries: Vec<ManifestEntry>,
    pub expires_at: Option<OffsetDateTime>,
}

/// Current store usage, as the global quota check sees it.
///
/// Pending declared bytes count the upload slots that have been promised but
/// not yet filled, so concurrent creations cannot overshoot the cap by
/// declaring space that is already spoken for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreUsage {
    pub manifest_bytes: u64,
    pub asset_bytes: u64,
    pub pending_declared_bytes: u64,
}

impl StoreUsage {
    pub fn total(&self) -> u64 {
        self.manifest_bytes
            .saturating_add(self.asset_bytes)
            .saturating_add(self.pending_declared_bytes)
    }
}

//! Asset repository.

use crate::error::StoreResult;
use crate::models::{IncompleteAssetRow, StoreUsage};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for content-addressed asset operations.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Check whether asset content exists for a SHA-256 hex digest.
    async fn asset_exists(&self, sha256: &str) -> StoreResult<bool>;

    /// Get stored asset bytes by SHA-256 hex digest.
    async fn get_asset_data(&self, sha256: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Look up a project's upload slot for an md5ext.
    async fn get_incomplete_slot(
        &self,
        project_id: Uuid,
        md5ext: &str,
    ) -> StoreResult<Option<IncompleteAssetRow>>;

    /// Fill an upload slot with verified content, atomically: the slot is
    /// consumed, the content stored (a no-op if the digest already exists),
    /// and the project linked to it.
    ///
    /// Fails with `NotFound` if the slot does not exist, which also covers
    /// losing a race against a concurrent upload of the same slot.
    async fn commit_asset(
        &self,
        project_id: Uuid,
        md5ext: &str,
        sha256: &str,
        data: &[u8],
    ) -> StoreResult<()>;

    /// Store asset content directly, outside any upload slot. Idempotent:
    /// returns true if the row was inserted, false if the digest already
    /// existed.
    async fn put_asset(&self, sha256: &str, data: &[u8]) -> StoreResult<bool>;

    /// Remove one project's link to a digest, reclaiming the content in the
    /// same transaction if no other project references it.
    ///
    /// Fails with `NotFound` if the link does not exist.
    async fn unlink(&self, project_id: Uuid, sha256: &str) -> StoreResult<()>;

    /// Count a project's remaining upload slots.
    async fn count_incomplete(&self, project_id: Uuid) -> StoreResult<u64>;

    /// Measure current store usage for the global quota check.
    async fn usage(&self) -> StoreResult<StoreUsage>;
}

//! Project repository.

use crate::error::StoreResult;
use crate::models::{NewProject, ProjectRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for project lifecycle operations.
#[async_trait]
pub trait ProjectRepo: Send + Sync {
    /// Persist a new project with its declared upload slots, atomically.
    ///
    /// Declared assets whose content already exists in the store are linked
    /// immediately; the rest get upload slots. Returns the md5exts the caller
    /// still needs to upload, in declaration order.
    ///
    /// Fails with `QuotaExceeded` if the declared footprint would push the
    /// store past its global cap, leaving no rows behind.
    async fn create_project(&self, project: &NewProject) -> StoreResult<Vec<String>>;

    /// Get a project row by ID, complete or not.
    async fn get_project(&self, project_id: Uuid) -> StoreResult<Option<ProjectRow>>;

    /// Get the manifest bytes of a complete project.
    ///
    /// Returns None for unknown projects and for projects that have not
    /// completed yet, so callers cannot distinguish the two.
    async fn get_project_data(&self, project_id: Uuid) -> StoreResult<Option<Vec<u8>>>;

    /// Transition a project to complete.
    ///
    /// Fails with `Conflict` if upload slots remain unfilled or the project
    /// is already complete, and `NotFound` if the project does not exist.
    async fn finish_project(&self, project_id: Uuid) -> StoreResult<()>;

    /// Delete a project and everything reachable only through it: its
    /// ownership tokens, upload slots, asset links, and any asset content no
    /// other project references. All in one transaction.
    async fn delete_project(&self, project_id: Uuid) -> StoreResult<()>;

    /// Update the title. Allowed in any lifecycle state.
    async fn set_title(&self, project_id: Uuid, title: &str) -> StoreResult<()>;

    /// Update the description. Allowed in any lifecycle state.
    async fn set_description(&self, project_id: Uuid, description: &str) -> StoreResult<()>;

    /// Delete projects whose expiry instant has passed, complete or not.
    /// Returns the IDs that were removed.
    async fn remove_expired_projects(&self, now: OffsetDateTime) -> StoreResult<Vec<Uuid>>;
}

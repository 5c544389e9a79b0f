//! Ownership token repository.

use crate::error::StoreResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for ownership token operations.
///
/// The first token is written inside the project creation transaction; all
/// token rows go away with the project.
#[async_trait]
pub trait TokenRepo: Send + Sync {
    /// Check whether `token_hash` is a valid ownership token for the project.
    async fn is_valid_ownership_token(
        &self,
        project_id: Uuid,
        token_hash: &str,
    ) -> StoreResult<bool>;

    /// Register an additional token hash for an existing project.
    /// Idempotent for a hash that is already registered.
    async fn issue_token(&self, project_id: Uuid, token_hash: &str) -> StoreResult<()>;
}

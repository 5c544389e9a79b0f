//! The ingestion service.

use crate::error::{IngestError, IngestResult, IntegrityError};
use crate::types::{CreateProjectOutcome, CreateProjectRequest};
use bindery_core::{
    AssetId, ContentHash, Limits, Md5Hash, OwnershipToken, ProjectId, QuotaEnforcer, hash_token,
    parse_manifest,
};
use bindery_store::{AssetRepo, ManifestEntry, NewProject, ProjectRepo, ProjectStore, TokenRepo};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// Orchestrates validation, verification, and the transactional store.
///
/// Content hashing runs on the caller's task before any transaction opens;
/// the store only ever sees verified bytes.
pub struct IngestionService {
    store: Arc<dyn ProjectStore>,
    quota: QuotaEnforcer,
}

impl IngestionService {
    pub fn new(store: Arc<dyn ProjectStore>, limits: Limits) -> Self {
        Self {
            store,
            quota: QuotaEnforcer::new(limits),
        }
    }

    fn limits(&self) -> &Limits {
        self.quota.limits()
    }

    /// Create a project from a manifest and its declared assets.
    ///
    /// Returns the new project's ID, its ownership token secret, and the
    /// md5exts whose content still needs uploading. Assets whose declared
    /// SHA-256 is already stored are linked immediately and do not appear in
    /// the missing list.
    pub async fn create_project(
        &self,
        req: CreateProjectRequest,
    ) -> IngestResult<CreateProjectOutcome> {
        self.quota.check_manifest_size(req.manifest.len() as u64)?;
        if req.title.chars().count() > self.limits().max_title_len {
            return Err(IngestError::Validation(format!(
                "title exceeds {} characters",
                self.limits().max_title_len
            )));
        }

        let parsed = parse_manifest(&req.manifest)?;

        // Every referenced asset must come with a well-formed declaration.
        // The declared hex is round-tripped so uppercase digests normalize to
        // the store's lowercase keys.
        let mut entries = Vec::with_capacity(parsed.md5exts.len());
        for id in &parsed.md5exts {
            let md5ext = id.to_string();
            let declared = req.assets.get(&md5ext).ok_or_else(|| {
                IngestError::Validation(format!("no declared asset for {md5ext}"))
            })?;
            let sha256 = ContentHash::from_hex(&declared.sha256)?;
            entries.push(ManifestEntry {
                md5ext,
                declared_sha256: sha256.to_hex(),
                declared_size: declared.size,
            });
        }

        let project_id = ProjectId::new();
        let token = OwnershipToken::generate();
        let expires_at = self
            .limits()
            .retention_secs
            .map(|secs| OffsetDateTime::now_utc() + Duration::seconds(secs as i64));

        let missing_md5exts = self
            .store
            .create_project(&NewProject {
                project_id: *project_id.as_uuid(),
                data: req.manifest,
                title: req.title,
                token_hash: token.hash(),
                entries,
                expires_at,
            })
            .await?;

        Ok(CreateProjectOutcome {
            project_id,
            ownership_token: token.into_secret(),
            missing_md5exts,
        })
    }

    /// Upload the bytes for one declared asset.
    ///
    /// Verification order is size, then MD5 (the identifier's own digest),
    /// then SHA-256 (the declared storage key). A failed verification leaves
    /// the upload slot in place so the caller can retry.
    pub async fn complete_asset(
        &self,
        project_id: ProjectId,
        md5ext: &str,
        data: &[u8],
    ) -> IngestResult<()> {
        // A malformed identifier cannot name a slot; answer as if it didn't.
        let id = AssetId::parse(md5ext).map_err(|_| IngestError::NotFound)?;

        let slot = self
            .store
            .get_incomplete_slot(*project_id.as_uuid(), &id.to_string())
            .await?
            .ok_or(IngestError::NotFound)?;

        let expected_size = slot.expected_size.max(0) as u64;
        if data.len() as u64 != expected_size {
            return Err(IntegrityError::Size {
                expected: expected_size,
                actual: data.len() as u64,
            }
            .into());
        }

        let md5 = Md5Hash::compute(data);
        if md5 != *id.md5() {
            tracing::warn!(
                project_id = %project_id,
                md5ext = %slot.md5ext,
                "asset failed md5 verification"
            );
            return Err(IntegrityError::Md5 {
                expected: id.md5().to_hex(),
                actual: md5.to_hex(),
            }
            .into());
        }

        let sha256 = ContentHash::compute(data);
        if sha256.to_hex() != slot.expected_sha256 {
            tracing::warn!(
                project_id = %project_id,
                md5ext = %slot.md5ext,
                "asset failed sha256 verification"
            );
            return Err(IntegrityError::Sha256 {
                expected: slot.expected_sha256.clone(),
                actual: sha256.to_hex(),
            }
            .into());
        }

        self.store
            .commit_asset(
                *project_id.as_uuid(),
                &slot.md5ext,
                &slot.expected_sha256,
                data,
            )
            .await?;
        Ok(())
    }

    /// Mark a project complete once every declared asset is uploaded.
    pub async fn finish_project(&self, project_id: ProjectId, token: &str) -> IngestResult<()> {
        self.authorize(project_id, token).await?;
        self.store.finish_project(*project_id.as_uuid()).await?;
        Ok(())
    }

    /// Delete a project and reclaim any content only it referenced.
    pub async fn delete_project(&self, project_id: ProjectId, token: &str) -> IngestResult<()> {
        self.authorize(project_id, token).await?;
        self.store.delete_project(*project_id.as_uuid()).await?;
        Ok(())
    }

    /// Update a project's title.
    pub async fn set_title(
        &self,
        project_id: ProjectId,
        token: &str,
        title: &str,
    ) -> IngestResult<()> {
        self.authorize(project_id, token).await?;
        if title.chars().count() > self.limits().max_title_len {
            return Err(IngestError::Validation(format!(
                "title exceeds {} characters",
                self.limits().max_title_len
            )));
        }
        self.store.set_title(*project_id.as_uuid(), title).await?;
        Ok(())
    }

    /// Update a project's description.
    pub async fn set_description(
        &self,
        project_id: ProjectId,
        token: &str,
        description: &str,
    ) -> IngestResult<()> {
        self.authorize(project_id, token).await?;
        if description.chars().count() > self.limits().max_description_len {
            return Err(IngestError::Validation(format!(
                "description exceeds {} characters",
                self.limits().max_description_len
            )));
        }
        self.store
            .set_description(*project_id.as_uuid(), description)
            .await?;
        Ok(())
    }

    /// Get the manifest bytes of a complete project.
    ///
    /// Incomplete and unknown projects answer identically.
    pub async fn get_project_data(&self, project_id: ProjectId) -> IngestResult<Vec<u8>> {
        self.store
            .get_project_data(*project_id.as_uuid())
            .await?
            .ok_or(IngestError::NotFound)
    }

    /// Get stored asset bytes by SHA-256 hex digest.
    pub async fn get_asset_data(&self, sha256: &str) -> IngestResult<Vec<u8>> {
        let sha256 = ContentHash::from_hex(sha256).map_err(|_| IngestError::NotFound)?;
        self.store
            .get_asset_data(&sha256.to_hex())
            .await?
            .ok_or(IngestError::NotFound)
    }

    /// Remove projects past their retention deadline, complete or not.
    /// Returns the IDs that were removed.
    pub async fn sweep_expired(&self) -> IngestResult<Vec<ProjectId>> {
        let removed = self
            .store
            .remove_expired_projects(OffsetDateTime::now_utc())
            .await?;
        Ok(removed.into_iter().map(ProjectId::from_uuid).collect())
    }

    /// Existence gates the token check so an invalid token against an
    /// unknown project reads as NotFound, not Unauthorized.
    async fn authorize(&self, project_id: ProjectId, token: &str) -> IngestResult<()> {
        let uuid = *project_id.as_uuid();
        if self.store.get_project(uuid).await?.is_none() {
            return Err(IngestError::NotFound);
        }
        if !self
            .store
            .is_valid_ownership_token(uuid, &hash_token(token))
            .await?
        {
            return Err(IngestError::Unauthorized);
        }
        Ok(())
    }
}

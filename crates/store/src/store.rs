//! Project store trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::repos::{AssetRepo, ProjectRepo, TokenRepo};
use async_trait::async_trait;
use bindery_core::{Limits, QuotaEnforcer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined project store trait.
#[async_trait]
pub trait ProjectStore: ProjectRepo + AssetRepo + TokenRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based project store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    quota: QuotaEnforcer,
}

impl SqliteStore {
    /// Open (or create) a store at the given database path.
    pub async fn new(path: impl AsRef<Path>, limits: Limits) -> StoreResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection keeps
            // the quota check and the writes it gates on one serialized timeline.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            quota: QuotaEnforcer::new(limits),
        };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// The limits this store enforces.
    pub fn limits(&self) -> &Limits {
        self.quota.limits()
    }

    /// Close the pool, flushing WAL state.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Sum current usage on whatever connection the caller holds, so the global
/// quota check can run inside the creation transaction.
///
/// Pending slots only count when their content is still absent; a slot whose
/// digest another project has since uploaded costs nothing more to fill.
async fn query_usage(conn: &mut SqliteConnection) -> StoreResult<crate::models::StoreUsage> {
    let manifest_bytes: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(LENGTH(data)), 0) FROM projects")
            .fetch_one(&mut *conn)
            .await?;
    let asset_bytes: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(size_bytes), 0) FROM assets")
        .fetch_one(&mut *conn)
        .await?;
    let pending_declared_bytes: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(expected_size), 0) FROM incomplete_assets ia \
         WHERE NOT EXISTS (SELECT 1 FROM assets a WHERE a.sha256 = ia.expected_sha256)",
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(crate::models::StoreUsage {
        manifest_bytes: manifest_bytes.max(0) as u64,
        asset_bytes: asset_bytes.max(0) as u64,
        pending_declared_bytes: pending_declared_bytes.max(0) as u64,
    })
}

/// Delete one project's rows and reclaim asset content nothing else
/// references. Runs inside the caller's transaction; the caller has already
/// established that the project exists.
async fn delete_project_in_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    project_id: uuid::Uuid,
) -> StoreResult<u64> {
    let shas: Vec<String> =
        sqlx::query_scalar("SELECT sha256 FROM complete_assets WHERE project_id = ?")
            .bind(project_id)
            .fetch_all(&mut **tx)
            .await?;

    sqlx::query("DELETE FROM complete_assets WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM incomplete_assets WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM ownership_tokens WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    // Content is shared across projects; only reclaim digests with no
    // remaining references now that this project's links are gone.
    let mut reclaimed = 0u64;
    for sha in &shas {
        let result = sqlx::query(
            "DELETE FROM assets WHERE sha256 = ? \
             AND NOT EXISTS (SELECT 1 FROM complete_assets WHERE sha256 = ?)",
        )
        .bind(sha)
        .bind(sha)
        .execute(&mut **tx)
        .await?;
        reclaimed += result.rows_affected();
    }

    sqlx::query("DELETE FROM projects WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    Ok(reclaimed)
}

// Implement the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use std::collections::HashSet;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl ProjectRepo for SqliteStore {
        async fn create_project(&self, project: &NewProject) -> StoreResult<Vec<String>> {
            let manifest_len = project.data.len() as u64;
            self.quota.check_manifest_size(manifest_len)?;
            for entry in &project.entries {
                self.quota.check_asset_size(entry.declared_size)?;
            }
            self.quota.check_project_total(
                manifest_len,
                project.entries.iter().map(|e| e.declared_size),
            )?;

            let now = OffsetDateTime::now_utc();
            let mut tx = self.pool.begin().await?;

            // Which declared digests already have content, as of this
            // transaction's snapshot.
            let mut existing = HashSet::new();
            for entry in &project.entries {
                if existing.contains(entry.declared_sha256.as_str()) {
                    continue;
                }
                let found: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM assets WHERE sha256 = ?)")
                        .bind(&entry.declared_sha256)
                        .fetch_one(&mut *tx)
                        .await?;
                if found {
                    existing.insert(entry.declared_sha256.as_str());
                }
            }

            // Global check covers the manifest plus the bytes this project
            // still has to upload. Digests declared more than once are
            // counted once.
            let mut incoming = manifest_len;
            let mut counted = HashSet::new();
            for entry in &project.entries {
                if !existing.contains(entry.declared_sha256.as_str())
                    && counted.insert(entry.declared_sha256.as_str())
                {
                    incoming = incoming.saturating_add(entry.declared_size);
                }
            }
            let usage = query_usage(&mut *tx).await?;
            self.quota.check_global(usage.total(), incoming)?;

            sqlx::query(
                "INSERT INTO projects (project_id, data, title, description, complete, created_at, expires_at) \
                 VALUES (?, ?, ?, '', 0, ?, ?)",
            )
            .bind(project.project_id)
            .bind(&project.data)
            .bind(&project.title)
            .bind(now)
            .bind(project.expires_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO ownership_tokens (project_id, token_hash, created_at) VALUES (?, ?, ?)",
            )
            .bind(project.project_id)
            .bind(&project.token_hash)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            let mut missing = Vec::new();
            for entry in &project.entries {
                if existing.contains(entry.declared_sha256.as_str()) {
                    sqlx::query(
                        "INSERT OR IGNORE INTO complete_assets (project_id, sha256, md5ext, created_at) \
                         VALUES (?, ?, ?, ?)",
                    )
                    .bind(project.project_id)
                    .bind(&entry.declared_sha256)
                    .bind(&entry.md5ext)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query(
                        "INSERT INTO incomplete_assets (project_id, md5ext, expected_sha256, expected_size, created_at) \
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(project.project_id)
                    .bind(&entry.md5ext)
                    .bind(&entry.declared_sha256)
                    .bind(entry.declared_size as i64)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                    missing.push(entry.md5ext.clone());
                }
            }

            tx.commit().await?;

            tracing::info!(
                project_id = %project.project_id,
                declared = project.entries.len(),
                missing = missing.len(),
                "created project"
            );

            Ok(missing)
        }

        async fn get_project(&self, project_id: Uuid) -> StoreResult<Option<ProjectRow>> {
            let row = sqlx::query_as::<_, ProjectRow>(
                "SELECT project_id, data, title, description, complete, created_at, expires_at \
                 FROM projects WHERE project_id = ?",
            )
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_project_data(&self, project_id: Uuid) -> StoreResult<Option<Vec<u8>>> {
            let data: Option<Vec<u8>> =
                sqlx::query_scalar("SELECT data FROM projects WHERE project_id = ? AND complete = 1")
                    .bind(project_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(data)
        }

        async fn finish_project(&self, project_id: Uuid) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let complete: Option<bool> =
                sqlx::query_scalar("SELECT complete FROM projects WHERE project_id = ?")
                    .bind(project_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            match complete {
                None => {
                    return Err(StoreError::NotFound(format!("project {project_id}")));
                }
                Some(true) => {
                    return Err(StoreError::Conflict(format!(
                        "project {project_id} is already complete"
                    )));
                }
                Some(false) => {}
            }

            let remaining: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM incomplete_assets WHERE project_id = ?")
                    .bind(project_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if remaining > 0 {
                return Err(StoreError::Conflict(format!(
                    "project {project_id} has {remaining} assets not yet uploaded"
                )));
            }

            sqlx::query("UPDATE projects SET complete = 1 WHERE project_id = ?")
                .bind(project_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!(project_id = %project_id, "project completed");
            Ok(())
        }

        async fn delete_project(&self, project_id: Uuid) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?)")
                    .bind(project_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound(format!("project {project_id}")));
            }

            let reclaimed = delete_project_in_tx(&mut tx, project_id).await?;
            tx.commit().await?;

            tracing::info!(
                project_id = %project_id,
                assets_reclaimed = reclaimed,
                "deleted project"
            );
            Ok(())
        }

        async fn set_title(&self, project_id: Uuid, title: &str) -> StoreResult<()> {
            let result = sqlx::query("UPDATE projects SET title = ? WHERE project_id = ?")
                .bind(title)
                .bind(project_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("project {project_id}")));
            }
            Ok(())
        }

        async fn set_description(&self, project_id: Uuid, description: &str) -> StoreResult<()> {
            let result = sqlx::query("UPDATE projects SET description = ? WHERE project_id = ?")
                .bind(description)
                .bind(project_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("project {project_id}")));
            }
            Ok(())
        }

        async fn remove_expired_projects(&self, now: OffsetDateTime) -> StoreResult<Vec<Uuid>> {
            let mut tx = self.pool.begin().await?;

            // Expiry applies regardless of lifecycle state: a project lives
            // for the retention window from its creation.
            let expired: Vec<Uuid> = sqlx::query_scalar(
                "SELECT project_id FROM projects \
                 WHERE expires_at IS NOT NULL AND expires_at <= ?",
            )
            .bind(now)
            .fetch_all(&mut *tx)
            .await?;

            for project_id in &expired {
                delete_project_in_tx(&mut tx, *project_id).await?;
            }

            tx.commit().await?;

            if !expired.is_empty() {
                tracing::info!(count = expired.len(), "removed expired projects");
            }
            Ok(expired)
        }
    }

    #[async_trait]
    impl AssetRepo for SqliteStore {
        async fn asset_exists(&self, sha256: &str) -> StoreResult<bool> {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM assets WHERE sha256 = ?)")
                    .bind(sha256)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(exists)
        }

        async fn get_asset_data(&self, sha256: &str) -> StoreResult<Option<Vec<u8>>> {
            let data: Option<Vec<u8>> =
                sqlx::query_scalar("SELECT data FROM assets WHERE sha256 = ?")
                    .bind(sha256)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(data)
        }

        async fn get_incomplete_slot(
            &self,
            project_id: Uuid,
            md5ext: &str,
        ) -> StoreResult<Option<IncompleteAssetRow>> {
            let row = sqlx::query_as::<_, IncompleteAssetRow>(
                "SELECT project_id, md5ext, expected_sha256, expected_size, created_at \
                 FROM incomplete_assets WHERE project_id = ? AND md5ext = ?",
            )
            .bind(project_id)
            .bind(md5ext)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn commit_asset(
            &self,
            project_id: Uuid,
            md5ext: &str,
            sha256: &str,
            data: &[u8],
        ) -> StoreResult<()> {
            let now = OffsetDateTime::now_utc();
            let mut tx = self.pool.begin().await?;

            // Consuming the slot first makes concurrent uploads of the same
            // slot race on this delete; the loser sees zero rows and backs
            // out without touching content.
            let result =
                sqlx::query("DELETE FROM incomplete_assets WHERE project_id = ? AND md5ext = ?")
                    .bind(project_id)
                    .bind(md5ext)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "no upload slot for {md5ext} in project {project_id}"
                )));
            }

            sqlx::query(
                "INSERT OR IGNORE INTO assets (sha256, data, size_bytes, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(sha256)
            .bind(data)
            .bind(data.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT OR IGNORE INTO complete_assets (project_id, sha256, md5ext, created_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(project_id)
            .bind(sha256)
            .bind(md5ext)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            tracing::debug!(
                project_id = %project_id,
                md5ext = md5ext,
                size = data.len(),
                "asset committed"
            );
            Ok(())
        }

        async fn put_asset(&self, sha256: &str, data: &[u8]) -> StoreResult<bool> {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO assets (sha256, data, size_bytes, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(sha256)
            .bind(data)
            .bind(data.len() as i64)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn unlink(&self, project_id: Uuid, sha256: &str) -> StoreResult<()> {
            let mut tx = self.pool.begin().await?;

            let result =
                sqlx::query("DELETE FROM complete_assets WHERE project_id = ? AND sha256 = ?")
                    .bind(project_id)
                    .bind(sha256)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "no link to {sha256} in project {project_id}"
                )));
            }

            sqlx::query(
                "DELETE FROM assets WHERE sha256 = ? \
                 AND NOT EXISTS (SELECT 1 FROM complete_assets WHERE sha256 = ?)",
            )
            .bind(sha256)
            .bind(sha256)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        }

        async fn count_incomplete(&self, project_id: Uuid) -> StoreResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM incomplete_assets WHERE project_id = ?")
                    .bind(project_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count.max(0) as u64)
        }

        async fn usage(&self) -> StoreResult<StoreUsage> {
            let mut conn = self.pool.acquire().await?;
            query_usage(&mut conn).await
        }
    }

    #[async_trait]
    impl TokenRepo for SqliteStore {
        async fn is_valid_ownership_token(
            &self,
            project_id: Uuid,
            token_hash: &str,
        ) -> StoreResult<bool> {
            let valid: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM ownership_tokens WHERE project_id = ? AND token_hash = ?)",
            )
            .bind(project_id)
            .bind(token_hash)
            .fetch_one(&self.pool)
            .await?;
            Ok(valid)
        }

        async fn issue_token(&self, project_id: Uuid, token_hash: &str) -> StoreResult<()> {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE project_id = ?)")
                    .bind(project_id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound(format!("project {project_id}")));
            }

            sqlx::query(
                "INSERT OR IGNORE INTO ownership_tokens (project_id, token_hash, created_at) \
                 VALUES (?, ?, ?)",
            )
            .bind(project_id)
            .bind(token_hash)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Projects
CREATE TABLE IF NOT EXISTS projects (
    project_id BLOB PRIMARY KEY,
    data BLOB NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    complete INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    expires_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_projects_expiry ON projects(expires_at);

-- Ownership tokens (hashes only; secrets are never persisted)
CREATE TABLE IF NOT EXISTS ownership_tokens (
    project_id BLOB NOT NULL,
    token_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (project_id, token_hash),
    FOREIGN KEY (project_id) REFERENCES projects(project_id) ON DELETE CASCADE
);

-- Content-addressed asset bytes, shared across projects
CREATE TABLE IF NOT EXISTS assets (
    sha256 TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    size_bytes INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Upload slots: declared assets awaiting their bytes
CREATE TABLE IF NOT EXISTS incomplete_assets (
    project_id BLOB NOT NULL,
    md5ext TEXT NOT NULL,
    expected_sha256 TEXT NOT NULL,
    expected_size INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (project_id, md5ext),
    FOREIGN KEY (project_id) REFERENCES projects(project_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_incomplete_assets_sha ON incomplete_assets(expected_sha256);

-- Reference links from projects to stored content
CREATE TABLE IF NOT EXISTS complete_assets (
    project_id BLOB NOT NULL,
    sha256 TEXT NOT NULL,
    md5ext TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (project_id, sha256),
    FOREIGN KEY (project_id) REFERENCES projects(project_id) ON DELETE CASCADE,
    FOREIGN KEY (sha256) REFERENCES assets(sha256)
);
CREATE INDEX IF NOT EXISTS idx_complete_assets_sha ON complete_assets(sha256);
"#;

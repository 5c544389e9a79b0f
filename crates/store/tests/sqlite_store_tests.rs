//! Integration tests for the SQLite store.

use bindery_core::{ContentHash, Limits, Md5Hash, ProjectState, StoreConfig};
use bindery_store::{
    AssetRepo, ManifestEntry, NewProject, ProjectRepo, ProjectStore, SqliteStore, StoreError,
    TokenRepo,
};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

async fn open_store(limits: Limits) -> (SqliteStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(dir.path().join("store.db"), limits)
        .await
        .unwrap();
    (store, dir)
}

/// Declared entry for `data`, as a creator who actually hashed the bytes
/// would submit it.
fn entry_for(data: &[u8], ext: &str) -> ManifestEntry {
    ManifestEntry {
        md5ext: format!("{}.{ext}", Md5Hash::compute(data).to_hex()),
        declared_sha256: ContentHash::compute(data).to_hex(),
        declared_size: data.len() as u64,
    }
}

fn new_project(entries: Vec<ManifestEntry>) -> NewProject {
    NewProject {
        project_id: Uuid::new_v4(),
        data: br#"{"targets":[]}"#.to_vec(),
        title: "test project".to_string(),
        token_hash: "a".repeat(64),
        entries,
        expires_at: None,
    }
}

#[tokio::test]
async fn test_create_project_returns_missing_slots() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"some costume bytes";
    let entry = entry_for(data, "png");
    let project = new_project(vec![entry.clone()]);

    let missing = store.create_project(&project).await.unwrap();
    assert_eq!(missing, vec![entry.md5ext.clone()]);

    let slot = store
        .get_incomplete_slot(project.project_id, &entry.md5ext)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(slot.expected_sha256, entry.declared_sha256);
    assert_eq!(slot.expected_size, data.len() as i64);
    assert_eq!(store.count_incomplete(project.project_id).await.unwrap(), 1);

    let row = store.get_project(project.project_id).await.unwrap().unwrap();
    assert_eq!(row.state(), ProjectState::Incomplete);
    assert_eq!(row.title, "test project");
}

#[tokio::test]
async fn test_create_project_links_already_stored_content() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"shared sound bytes";
    let sha = ContentHash::compute(data).to_hex();
    assert!(store.put_asset(&sha, data).await.unwrap());

    let project = new_project(vec![entry_for(data, "wav")]);
    let missing = store.create_project(&project).await.unwrap();
    assert!(missing.is_empty());
    assert_eq!(store.count_incomplete(project.project_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_commit_asset_consumes_slot_once() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"asset payload";
    let entry = entry_for(data, "png");
    let project = new_project(vec![entry.clone()]);
    store.create_project(&project).await.unwrap();

    store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, data)
        .await
        .unwrap();

    assert!(store.asset_exists(&entry.declared_sha256).await.unwrap());
    assert_eq!(
        store.get_asset_data(&entry.declared_sha256).await.unwrap(),
        Some(data.to_vec())
    );
    assert!(store
        .get_incomplete_slot(project.project_id, &entry.md5ext)
        .await
        .unwrap()
        .is_none());

    // The slot is gone; a second commit is the race-loser case.
    let err = store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, data)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_finish_project_requires_all_slots_filled() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"the one asset";
    let entry = entry_for(data, "svg");
    let project = new_project(vec![entry.clone()]);
    store.create_project(&project).await.unwrap();

    let err = store.finish_project(project.project_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert!(store
        .get_project_data(project.project_id)
        .await
        .unwrap()
        .is_none());

    store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, data)
        .await
        .unwrap();
    store.finish_project(project.project_id).await.unwrap();

    assert_eq!(
        store.get_project_data(project.project_id).await.unwrap(),
        Some(project.data.clone())
    );

    // Completion is one-way and happens once.
    let err = store.finish_project(project.project_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_finish_unknown_project_not_found() {
    let (store, _dir) = open_store(Limits::default()).await;
    let err = store.finish_project(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_reclaims_content_at_zero_references() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"bytes shared by two projects";
    let entry = entry_for(data, "jpg");
    let sha = entry.declared_sha256.clone();

    let p1 = new_project(vec![entry.clone()]);
    store.create_project(&p1).await.unwrap();
    store
        .commit_asset(p1.project_id, &entry.md5ext, &sha, data)
        .await
        .unwrap();

    // Second project links the now-stored content instantly.
    let p2 = new_project(vec![entry.clone()]);
    let missing = store.create_project(&p2).await.unwrap();
    assert!(missing.is_empty());

    store.delete_project(p1.project_id).await.unwrap();
    assert!(store.asset_exists(&sha).await.unwrap());
    assert!(store.get_project(p1.project_id).await.unwrap().is_none());

    store.delete_project(p2.project_id).await.unwrap();
    assert!(!store.asset_exists(&sha).await.unwrap());
    assert_eq!(store.get_asset_data(&sha).await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_unknown_project_not_found() {
    let (store, _dir) = open_store(Limits::default()).await;
    let err = store.delete_project(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_unlink_runs_synchronous_gc() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"soon to be orphaned";
    let entry = entry_for(data, "mp3");
    let project = new_project(vec![entry.clone()]);
    store.create_project(&project).await.unwrap();
    store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, data)
        .await
        .unwrap();

    store
        .unlink(project.project_id, &entry.declared_sha256)
        .await
        .unwrap();
    assert!(!store.asset_exists(&entry.declared_sha256).await.unwrap());

    let err = store
        .unlink(project.project_id, &entry.declared_sha256)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_put_asset_is_idempotent() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = b"stored twice";
    let sha = ContentHash::compute(data).to_hex();
    assert!(store.put_asset(&sha, data).await.unwrap());
    assert!(!store.put_asset(&sha, data).await.unwrap());
    assert_eq!(store.get_asset_data(&sha).await.unwrap(), Some(data.to_vec()));
}

#[tokio::test]
async fn test_global_quota_rejection_is_atomic() {
    let limits = Limits {
        max_store_size: 200,
        ..Limits::default()
    };
    let (store, _dir) = open_store(limits).await;

    // Manifest (14 bytes) plus a declared 200-byte asset overshoots the cap.
    let data = vec![7u8; 200];
    let project = new_project(vec![entry_for(&data, "png")]);

    let err = store.create_project(&project).await.unwrap_err();
    assert!(matches!(err, StoreError::QuotaExceeded(_)));

    // Nothing survived the rollback.
    assert!(store.get_project(project.project_id).await.unwrap().is_none());
    assert_eq!(store.count_incomplete(project.project_id).await.unwrap(), 0);
    assert_eq!(store.usage().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_usage_tracks_pending_and_stored_bytes() {
    let (store, _dir) = open_store(Limits::default()).await;

    let data = vec![1u8; 50];
    let entry = entry_for(&data, "png");
    let project = new_project(vec![entry.clone()]);
    store.create_project(&project).await.unwrap();

    let usage = store.usage().await.unwrap();
    assert_eq!(usage.manifest_bytes, project.data.len() as u64);
    assert_eq!(usage.pending_declared_bytes, 50);
    assert_eq!(usage.asset_bytes, 0);

    store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, &data)
        .await
        .unwrap();

    let usage = store.usage().await.unwrap();
    assert_eq!(usage.pending_declared_bytes, 0);
    assert_eq!(usage.asset_bytes, 50);
}

#[tokio::test]
async fn test_remove_expired_projects_sweeps_overdue_only() {
    let (store, _dir) = open_store(Limits::default()).await;
    let now = OffsetDateTime::now_utc();

    let data = b"expiring asset";
    let entry = entry_for(data, "png");

    let mut overdue = new_project(vec![entry.clone()]);
    overdue.expires_at = Some(now - Duration::hours(1));
    store.create_project(&overdue).await.unwrap();

    let mut fresh = new_project(vec![entry.clone()]);
    fresh.expires_at = Some(now + Duration::hours(1));
    store.create_project(&fresh).await.unwrap();

    let removed = store.remove_expired_projects(now).await.unwrap();
    assert_eq!(removed, vec![overdue.project_id]);
    assert!(store.get_project(overdue.project_id).await.unwrap().is_none());
    assert!(store.get_project(fresh.project_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_expiry_is_not_reset_by_completion() {
    let (store, _dir) = open_store(Limits::default()).await;
    let now = OffsetDateTime::now_utc();

    let data = b"complete yet overdue";
    let entry = entry_for(data, "png");
    let mut project = new_project(vec![entry.clone()]);
    project.expires_at = Some(now - Duration::hours(1));
    store.create_project(&project).await.unwrap();
    store
        .commit_asset(project.project_id, &entry.md5ext, &entry.declared_sha256, data)
        .await
        .unwrap();
    store.finish_project(project.project_id).await.unwrap();

    let row = store.get_project(project.project_id).await.unwrap().unwrap();
    assert_eq!(row.state(), ProjectState::Complete);
    assert!(row.expires_at.is_some());

    let removed = store.remove_expired_projects(now).await.unwrap();
    assert_eq!(removed, vec![project.project_id]);
    assert!(!store.asset_exists(&entry.declared_sha256).await.unwrap());
}

#[tokio::test]
async fn test_set_title_and_description() {
    let (store, _dir) = open_store(Limits::default()).await;

    let project = new_project(vec![]);
    store.create_project(&project).await.unwrap();

    store.set_title(project.project_id, "renamed").await.unwrap();
    store
        .set_description(project.project_id, "a description")
        .await
        .unwrap();

    let row = store.get_project(project.project_id).await.unwrap().unwrap();
    assert_eq!(row.title, "renamed");
    assert_eq!(row.description, "a description");

    let err = store.set_title(Uuid::new_v4(), "nope").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_ownership_tokens_live_and_die_with_the_project() {
    let (store, _dir) = open_store(Limits::default()).await;

    let project = new_project(vec![]);
    store.create_project(&project).await.unwrap();

    assert!(store
        .is_valid_ownership_token(project.project_id, &project.token_hash)
        .await
        .unwrap());
    assert!(!store
        .is_valid_ownership_token(project.project_id, &"b".repeat(64))
        .await
        .unwrap());

    // A second token can be issued for the same project.
    let second = "c".repeat(64);
    store.issue_token(project.project_id, &second).await.unwrap();
    assert!(store
        .is_valid_ownership_token(project.project_id, &second)
        .await
        .unwrap());

    let err = store
        .issue_token(Uuid::new_v4(), &second)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    store.delete_project(project.project_id).await.unwrap();
    assert!(!store
        .is_valid_ownership_token(project.project_id, &project.token_hash)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_health_check() {
    let (store, _dir) = open_store(Limits::default()).await;
    store.health_check().await.unwrap();
}

#[tokio::test]
async fn test_open_from_config() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        path: dir.path().join("bindery.db"),
        limits: Limits::for_testing(),
    };
    let store = bindery_store::open(&config).await.unwrap();
    store.health_check().await.unwrap();
    assert_eq!(store.limits(), &Limits::for_testing());
}

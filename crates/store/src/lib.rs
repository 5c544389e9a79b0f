//! SQLite-backed persistence for the bindery project-bundle store.
//!
//! Everything that must hold transactionally lives here: project creation
//! with its declared upload slots, asset commits, completion, deletion with
//! synchronous garbage collection of unreferenced content, and the usage
//! accounting the global quota check reads.

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{
    AssetRow, CompleteAssetRow, IncompleteAssetRow, ManifestEntry, NewProject, OwnershipTokenRow,
    ProjectRow, StoreUsage,
};
pub use repos::{AssetRepo, ProjectRepo, TokenRepo};
pub use store::{ProjectStore, SqliteStore};

use bindery_core::StoreConfig;

/// Open a [`SqliteStore`] from a [`StoreConfig`].
pub async fn open(config: &StoreConfig) -> StoreResult<SqliteStore> {
    SqliteStore::new(&config.path, config.limits.clone()).await
}

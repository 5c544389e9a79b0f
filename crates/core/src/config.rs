//! Store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Size and retention limits applied by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum manifest size in bytes.
    pub max_manifest_size: u64,
    /// Maximum size of a single asset in bytes.
    pub max_asset_size: u64,
    /// Maximum total size of a project (manifest plus all assets) in bytes.
    pub max_project_total_size: u64,
    /// Maximum total bytes the store may hold across all projects.
    pub max_store_size: u64,
    /// Maximum title length in characters.
    pub max_title_len: usize,
    /// Maximum description length in characters.
    pub max_description_len: usize,
    /// How long projects are retained after creation before expiry sweeps
    /// remove them. `None` disables expiry.
    pub retention_secs: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_manifest_size: 5_500_000,
            max_asset_size: 10_000_000,
            max_project_total_size: 500_000_000,
            max_store_size: 30_000_000_000,
            max_title_len: 100,
            max_description_len: 10_000,
            retention_secs: Some(86_400),
        }
    }
}

impl Limits {
    /// Small limits that make quota boundaries easy to hit in tests.
    pub fn for_testing() -> Self {
        Self {
            max_manifest_size: 1_000,
            max_asset_size: 100,
            max_project_total_size: 1_500,
            max_store_size: 10_000,
            max_title_len: 20,
            max_description_len: 50,
            retention_secs: Some(3_600),
        }
    }
}

/// Configuration for opening a store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    #[serde(default)]
    pub limits: Limits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let limits: Limits = serde_json::from_str(r#"{"max_asset_size": 42}"#).unwrap();
        assert_eq!(limits.max_asset_size, 42);
        assert_eq!(limits.max_manifest_size, Limits::default().max_manifest_size);
        assert_eq!(limits.retention_secs, Some(86_400));
    }

    #[test]
    fn test_config_parses_with_just_a_path() {
        let config: StoreConfig = serde_json::from_str(r#"{"path": "/tmp/bindery.db"}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/bindery.db"));
        assert_eq!(config.limits, Limits::default());
    }
}

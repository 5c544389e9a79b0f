//! Project identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a hosted project.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from the canonical hyphenated string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::InvalidProjectId(e.to_string()))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({})", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a stored project.
///
/// A project is created incomplete, becomes complete exactly once when its
/// owner finishes it, and is then immutable until deletion. Deleted projects
/// leave no row behind, so there is no variant for them here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Incomplete,
    Complete,
}

impl ProjectState {
    /// Derive the state from the persisted completeness flag.
    pub fn from_flag(complete: bool) -> Self {
        if complete {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_roundtrip() {
        let id = ProjectId::new();
        let parsed = ProjectId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_project_id_rejects_garbage() {
        assert!(ProjectId::parse("not-a-uuid").is_err());
        assert!(ProjectId::parse("").is_err());
    }

    #[test]
    fn test_state_from_flag() {
        assert_eq!(ProjectState::from_flag(false), ProjectState::Incomplete);
        assert_eq!(ProjectState::from_flag(true), ProjectState::Complete);
        assert!(ProjectState::Complete.is_complete());
        assert!(!ProjectState::Incomplete.is_complete());
    }
}

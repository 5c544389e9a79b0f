//! Size limit enforcement.
//!
//! Every check answers before any persistence happens, so a breached quota
//! never leaves partial state behind. Declared sizes are checked at project
//! creation and real byte counts are re-checked at upload time.

use crate::config::Limits;
use thiserror::Error;

/// Which limit a rejected request ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuotaKind {
    /// A single asset exceeded the per-asset cap.
    Asset,
    /// The manifest plus declared assets exceeded the per-project cap.
    Project,
    /// The whole store would exceed the global cap.
    Global,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Asset => "asset",
            Self::Project => "project",
            Self::Global => "store",
        };
        write!(f, "{s}")
    }
}

/// A quota rejection with enough detail to report the breach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{kind} size limit exceeded: requested {requested} bytes, limit {limit}")]
pub struct QuotaBreach {
    pub kind: QuotaKind,
    pub limit: u64,
    pub requested: u64,
}

/// Stateless checker over a set of configured limits.
#[derive(Clone, Debug)]
pub struct QuotaEnforcer {
    limits: Limits,
}

impl QuotaEnforcer {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Manifest bytes count against the per-project cap on their own too.
    pub fn check_manifest_size(&self, len: u64) -> Result<(), QuotaBreach> {
        if len > self.limits.max_manifest_size {
            return Err(QuotaBreach {
                kind: QuotaKind::Project,
                limit: self.limits.max_manifest_size,
                requested: len,
            });
        }
        Ok(())
    }

    /// Check a single asset's size, declared or actual.
    pub fn check_asset_size(&self, len: u64) -> Result<(), QuotaBreach> {
        if len > self.limits.max_asset_size {
            return Err(QuotaBreach {
                kind: QuotaKind::Asset,
                limit: self.limits.max_asset_size,
                requested: len,
            });
        }
        Ok(())
    }

    /// Check the manifest plus all declared asset sizes against the
    /// per-project total.
    pub fn check_project_total(
        &self,
        manifest_len: u64,
        asset_sizes: impl IntoIterator<Item = u64>,
    ) -> Result<(), QuotaBreach> {
        let mut total = manifest_len;
        for size in asset_sizes {
            total = total.saturating_add(size);
        }
        if total > self.limits.max_project_total_size {
            return Err(QuotaBreach {
                kind: QuotaKind::Project,
                limit: self.limits.max_project_total_size,
                requested: total,
            });
        }
        Ok(())
    }

    /// Check that adding `incoming` bytes on top of current usage stays under
    /// the global store cap.
    pub fn check_global(&self, current_usage: u64, incoming: u64) -> Result<(), QuotaBreach> {
        let projected = current_usage.saturating_add(incoming);
        if projected > self.limits.max_store_size {
            return Err(QuotaBreach {
                kind: QuotaKind::Global,
                limit: self.limits.max_store_size,
                requested: projected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer() -> QuotaEnforcer {
        QuotaEnforcer::new(Limits {
            max_manifest_size: 100,
            max_asset_size: 50,
            max_project_total_size: 200,
            max_store_size: 1000,
            ..Limits::default()
        })
    }

    #[test]
    fn test_manifest_size() {
        let q = enforcer();
        assert!(q.check_manifest_size(100).is_ok());
        let breach = q.check_manifest_size(101).unwrap_err();
        assert_eq!(breach.kind, QuotaKind::Project);
        assert_eq!(breach.requested, 101);
    }

    #[test]
    fn test_asset_size() {
        let q = enforcer();
        assert!(q.check_asset_size(50).is_ok());
        assert_eq!(q.check_asset_size(51).unwrap_err().kind, QuotaKind::Asset);
    }

    #[test]
    fn test_project_total_includes_manifest() {
        let q = enforcer();
        assert!(q.check_project_total(100, [50, 50]).is_ok());
        let breach = q.check_project_total(100, [50, 51]).unwrap_err();
        assert_eq!(breach.kind, QuotaKind::Project);
        assert_eq!(breach.requested, 201);
    }

    #[test]
    fn test_global_projection() {
        let q = enforcer();
        assert!(q.check_global(900, 100).is_ok());
        let breach = q.check_global(900, 101).unwrap_err();
        assert_eq!(breach.kind, QuotaKind::Global);
        assert_eq!(breach.limit, 1000);
    }

    #[test]
    fn test_total_does_not_overflow() {
        let q = enforcer();
        assert!(q.check_project_total(u64::MAX, [u64::MAX]).is_err());
        assert!(q.check_global(u64::MAX, u64::MAX).is_err());
    }
}

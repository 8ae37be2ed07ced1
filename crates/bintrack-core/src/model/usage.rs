/// Storage roots and the usage snapshots aggregated over them.
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One fixed volume and its recycle bin container candidates.
///
/// Re-enumerated on every aggregation call; never cached across polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    /// Mount point, e.g. `C:\`.
    pub mount: PathBuf,
    /// Modern per-volume container, e.g. `C:\$Recycle.Bin`.
    pub primary: PathBuf,
    /// Legacy container, e.g. `C:\RECYCLER`.
    pub legacy: PathBuf,
}

impl StorageRoot {
    pub fn new(mount: impl Into<PathBuf>, primary_name: &str, legacy_name: &str) -> Self {
        let mount = mount.into();
        Self {
            primary: mount.join(primary_name),
            legacy: mount.join(legacy_name),
            mount,
        }
    }

    /// The container to aggregate: primary if present, else legacy, else none.
    pub fn resolve_container(&self) -> Option<&Path> {
        if self.primary.is_dir() {
            Some(&self.primary)
        } else if self.legacy.is_dir() {
            Some(&self.legacy)
        } else {
            None
        }
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub total_bytes: u64,
    /// Bytes per storage root mount point. Roots without a container appear with 0.
    pub per_root_bytes: BTreeMap<PathBuf, u64>,
    /// Completion time of the aggregation.
    pub timestamp: DateTime<Local>,
}

impl UsageSnapshot {
    /// Build a snapshot from per-root totals, stamped now.
    pub fn from_roots(per_root_bytes: BTreeMap<PathBuf, u64>) -> Self {
        let total_bytes = per_root_bytes
            .values()
            .fold(0u64, |acc, bytes| acc.saturating_add(*bytes));
        Self {
            total_bytes,
            per_root_bytes,
            timestamp: Local::now(),
        }
    }

    /// A zero-byte snapshot with no roots.
    pub fn empty() -> Self {
        Self::from_roots(BTreeMap::new())
    }
}

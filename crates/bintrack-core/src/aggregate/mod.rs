/// Size aggregation — sums recycle bin usage across every fixed volume.
///
/// Aggregation never fails. Volumes without a container,
/// privileged owner directories, and unreadable nodes all contribute zero
/// and are logged; only a failure to enumerate volumes at all is reported,
/// and even that degrades to an empty snapshot.
///
/// Owner directories from all volumes are walked in parallel on a
/// dedicated `rayon` pool sized from `num_cpus`.
pub mod layout;
pub mod walk;

pub use layout::{TrashLayout, LEGACY_CONTAINER, LOCAL_SYSTEM_SID, PRIMARY_CONTAINER};
pub use walk::{directory_size, WalkTotals};

use crate::model::size::format_size;
use crate::model::{StorageRoot, UsageSnapshot};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anything that can produce a usage snapshot on demand.
///
/// The monitor and the reclaim executor depend on this rather than on
/// [`SizeAggregator`] so tests can script the readings.
pub trait UsageSource: Send + Sync {
    fn aggregate(&self) -> UsageSnapshot;
}

/// Supplies the mount points to aggregate over.
pub trait RootProvider: Send + Sync {
    fn mount_points(&self) -> std::io::Result<Vec<PathBuf>>;
}

/// The host's fixed, ready, non-network volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDrives;

impl RootProvider for FixedDrives {
    fn mount_points(&self) -> std::io::Result<Vec<PathBuf>> {
        crate::platform::fixed_drive_roots()
    }
}

/// An explicit list of mount points.
#[derive(Debug, Clone, Default)]
pub struct StaticRoots(pub Vec<PathBuf>);

impl RootProvider for StaticRoots {
    fn mount_points(&self) -> std::io::Result<Vec<PathBuf>> {
        Ok(self.0.clone())
    }
}

/// An owner directory inside a resolved container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerBin {
    /// Mount point of the volume it lives on.
    pub mount: PathBuf,
    /// The owner's directory, e.g. `C:\$Recycle.Bin\S-1-5-21-...-1001`.
    pub path: PathBuf,
}

pub struct SizeAggregator {
    provider: Arc<dyn RootProvider>,
    layout: TrashLayout,
    pool: Option<rayon::ThreadPool>,
}

impl SizeAggregator {
    /// Build an aggregator over `provider`'s roots with a walk pool of
    /// `num_cpus` threads.
    pub fn new(provider: Arc<dyn RootProvider>, layout: TrashLayout) -> Self {
        Self::with_walk_threads(provider, layout, num_cpus::get())
    }

    /// The default aggregator: fixed drives, Windows container layout.
    pub fn for_fixed_drives() -> Self {
        Self::new(Arc::new(FixedDrives), TrashLayout::default())
    }

    /// Build with an explicit walk pool size. `threads <= 1` walks serially.
    pub fn with_walk_threads(
        provider: Arc<dyn RootProvider>,
        layout: TrashLayout,
        threads: usize,
    ) -> Self {
        let pool = if threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("bintrack-walk-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Aggregator: walk pool unavailable, walking serially: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self {
            provider,
            layout,
            pool,
        }
    }

    pub fn layout(&self) -> &TrashLayout {
        &self.layout
    }

    /// Enumerate storage roots now. Enumeration failure yields no roots.
    pub fn storage_roots(&self) -> Vec<StorageRoot> {
        match self.provider.mount_points() {
            Ok(mounts) => mounts
                .into_iter()
                .map(|m| StorageRoot::new(m, &self.layout.primary, &self.layout.legacy))
                .collect(),
            Err(e) => {
                warn!("Aggregator: could not enumerate storage roots: {}", e);
                Vec::new()
            }
        }
    }

    /// Readable, non-reserved owner directories inside `root`'s container.
    pub fn owner_bins(&self, root: &StorageRoot) -> Vec<OwnerBin> {
        let Some(container) = root.resolve_container() else {
            debug!("No recycle bin found on {:?}", root.mount);
            return Vec::new();
        };

        let entries = match std::fs::read_dir(container) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list recycle bin {:?}: {}", container, e);
                return Vec::new();
            }
        };

        let mut bins = Vec::new();
        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if self.layout.is_reserved(&name) {
                debug!("Skipping system recycle bin directory: {}", name);
                continue;
            }
            bins.push(OwnerBin {
                mount: root.mount.clone(),
                path: entry.path(),
            });
        }
        bins
    }

    /// Every owner bin on every root, enumerated now.
    pub fn all_owner_bins(&self) -> Vec<OwnerBin> {
        self.storage_roots()
            .iter()
            .flat_map(|root| self.owner_bins(root))
            .collect()
    }

    /// Bytes held in one root's container.
    pub fn root_usage(&self, root: &StorageRoot) -> u64 {
        let bins = self.owner_bins(root);
        self.sum_bins(&bins).values().sum()
    }

    fn sum_bins(&self, bins: &[OwnerBin]) -> BTreeMap<PathBuf, u64> {
        let walk = |bin: &OwnerBin| {
            let totals = directory_size(&bin.path);
            if totals.skipped > 0 {
                debug!(
                    "User recycle bin {:?}: {} unreadable node(s) counted as 0",
                    bin.path, totals.skipped
                );
            }
            debug!("User recycle bin {:?}: {}", bin.path, format_size(totals.bytes));
            (bin.mount.clone(), totals.bytes)
        };

        let sizes: Vec<(PathBuf, u64)> = match &self.pool {
            Some(pool) => pool.install(|| bins.par_iter().map(walk).collect()),
            None => bins.iter().map(walk).collect(),
        };

        let mut per_root = BTreeMap::new();
        for (mount, bytes) in sizes {
            let slot = per_root.entry(mount).or_insert(0u64);
            *slot = slot.saturating_add(bytes);
        }
        per_root
    }
}

impl UsageSource for SizeAggregator {
    fn aggregate(&self) -> UsageSnapshot {
        let roots = self.storage_roots();
        if roots.is_empty() {
            warn!("Aggregator: no storage roots available; reporting 0 bytes");
            return UsageSnapshot::empty();
        }

        let bins: Vec<OwnerBin> = roots.iter().flat_map(|r| self.owner_bins(r)).collect();
        let mut per_root = self.sum_bins(&bins);
        for root in &roots {
            per_root.entry(root.mount.clone()).or_insert(0);
        }

        for (mount, bytes) in &per_root {
            debug!("Recycle bin size for {}: {}", mount.display(), format_size(*bytes));
        }
        let snapshot = UsageSnapshot::from_roots(per_root);
        info!("Total recycle bin size: {}", format_size(snapshot.total_bytes));
        snapshot
    }
}

/// Whether `path` sits inside one of `bins`.
///
/// `starts_with` compares components lexically, so any `..` component is
/// refused outright rather than resolved.
pub(crate) fn within_bins(path: &Path, bins: &[OwnerBin]) -> bool {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return false;
    }
    bins.iter().any(|bin| path.starts_with(&bin.path))
}

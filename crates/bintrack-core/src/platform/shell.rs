/// Shell automation adapter over the recycle bin containers.
///
/// Items are the top-level entries of every readable owner bin (the
/// `$R…` payloads and their `$I…` metadata files). On Windows the bulk verb
/// is `SHEmptyRecycleBinW`; elsewhere there is no bulk verb and items are
/// deleted one by one.
use crate::aggregate::{within_bins, SizeAggregator};
use crate::reclaim::{TrashAutomation, TrashItem};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-folder view settings written by Explorer, not a recycled item.
const FOLDER_SETTINGS_FILE: &str = "desktop.ini";

pub struct ContainerAutomation {
    aggregator: Arc<SizeAggregator>,
    bulk_verb: bool,
}

impl ContainerAutomation {
    /// Adapter over `aggregator`'s containers. The shell bulk verb is used
    /// where the platform has one.
    pub fn new(aggregator: Arc<SizeAggregator>) -> Self {
        Self {
            aggregator,
            bulk_verb: cfg!(windows),
        }
    }

    /// Enable or disable the shell bulk verb.
    ///
    /// The bulk verb empties the bin of every volume for the current user,
    /// not just the containers this adapter was built over.
    pub fn with_bulk_verb(mut self, enabled: bool) -> Self {
        self.bulk_verb = enabled;
        self
    }
}

impl TrashAutomation for ContainerAutomation {
    fn items(&self) -> Result<Vec<TrashItem>, String> {
        let mut items = Vec::new();
        for bin in self.aggregator.all_owner_bins() {
            let entries = match std::fs::read_dir(&bin.path) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Cannot list {:?}: {}", bin.path, e);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.eq_ignore_ascii_case(FOLDER_SETTINGS_FILE) {
                    continue;
                }
                items.push(TrashItem {
                    id: entry.path(),
                    name,
                });
            }
        }
        Ok(items)
    }

    fn try_bulk_empty_verb(&self) -> bool {
        if !self.bulk_verb {
            return false;
        }
        shell_empty_recycle_bin()
    }

    fn delete_item(&self, item: &TrashItem) -> bool {
        // Never delete outside a recycle bin, whatever the id says.
        let bins = self.aggregator.all_owner_bins();
        if !within_bins(&item.id, &bins) || bins.iter().any(|b| b.path == item.id) {
            warn!("Refusing to delete {:?}: not a recycle bin item", item.id);
            return false;
        }
        match remove_path(&item.id) {
            Ok(()) => true,
            Err(e) => {
                debug!("Failed to delete {:?}: {}", item.id, e);
                false
            }
        }
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(windows)]
fn shell_empty_recycle_bin() -> bool {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::Shell::{
        SHEmptyRecycleBinW, SHERB_NOCONFIRMATION, SHERB_NOPROGRESSUI, SHERB_NOSOUND,
    };

    let flags = SHERB_NOCONFIRMATION | SHERB_NOPROGRESSUI | SHERB_NOSOUND;
    match unsafe { SHEmptyRecycleBinW(HWND::default(), PCWSTR::null(), flags) } {
        Ok(()) => true,
        Err(e) => {
            warn!("SHEmptyRecycleBinW failed: {}", e);
            false
        }
    }
}

#[cfg(not(windows))]
fn shell_empty_recycle_bin() -> bool {
    false
}

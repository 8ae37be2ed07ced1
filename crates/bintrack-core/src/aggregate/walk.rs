/// Recursive size walk that never fails.
///
/// Uses `jwalk` for traversal. Any node that cannot be read (access denied,
/// vanished between listing and stat, broken reparse point) contributes zero
/// bytes and the walk carries on with its siblings.
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Totals from walking one directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkTotals {
    /// Sum of regular file lengths that could be read.
    pub bytes: u64,
    /// Files counted.
    pub files: u64,
    /// Nodes skipped because they could not be read.
    pub skipped: u64,
}

/// Sum the sizes of all regular files under `dir`.
///
/// `dir` itself being unreadable yields an all-zero result with one skip.
pub fn directory_size(dir: &Path) -> WalkTotals {
    let mut totals = WalkTotals::default();

    // Serial traversal: callers already fan out across owner directories.
    let walker = jwalk::WalkDir::new(dir)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                totals.skipped += 1;
                debug!("Access denied or unreadable node under {:?}: {}", dir, err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                totals.bytes = totals.bytes.saturating_add(meta.len());
                totals.files += 1;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                // Removed mid-walk.
                totals.skipped += 1;
            }
            Err(err) => {
                totals.skipped += 1;
                debug!("Cannot stat {:?}: {}", path, err);
            }
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        fs::write(path, vec![0u8; n]).unwrap();
    }

    #[test]
    fn sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("$R1A2B3C.dir").join("inner");
        fs::create_dir_all(&nested).unwrap();
        write_bytes(&tmp.path().join("$IABCDEF.txt"), 10);
        write_bytes(&nested.join("deep.bin"), 90);

        let totals = directory_size(tmp.path());
        assert_eq!(totals.bytes, 100);
        assert_eq!(totals.files, 2);
        assert_eq!(totals.skipped, 0);
    }

    #[test]
    fn missing_directory_contributes_zero() {
        let tmp = TempDir::new().unwrap();
        let totals = directory_size(&tmp.path().join("gone"));
        assert_eq!(totals.bytes, 0);
        assert_eq!(totals.files, 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subtree_is_skipped_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        write_bytes(&locked.join("hidden.bin"), 500);
        write_bytes(&tmp.path().join("visible.bin"), 40);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let totals = directory_size(tmp.path());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root ignores permission bits, so only require that the walk finished
        // and counted the readable file.
        assert!(totals.bytes == 40 || totals.bytes == 540);
    }
}

/// Recycle bin container layout — where to look on each volume and which
/// owner directories to leave alone.

/// Container name used by Windows Vista and later.
pub const PRIMARY_CONTAINER: &str = "$Recycle.Bin";

/// Container name used by Windows XP and earlier.
pub const LEGACY_CONTAINER: &str = "RECYCLER";

/// The LocalSystem SID. Its bin cannot be read without elevation.
pub const LOCAL_SYSTEM_SID: &str = "S-1-5-18";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashLayout {
    /// Per-volume container name tried first.
    pub primary: String,
    /// Fallback container name when the primary is absent.
    pub legacy: String,
    /// Owner directory names that are skipped without being opened.
    pub reserved_owners: Vec<String>,
}

impl TrashLayout {
    /// Whether an owner directory name belongs to a privileged owner.
    ///
    /// SIDs are compared case-insensitively.
    pub fn is_reserved(&self, owner: &str) -> bool {
        self.reserved_owners
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(owner))
    }
}

impl Default for TrashLayout {
    fn default() -> Self {
        Self {
            primary: PRIMARY_CONTAINER.to_owned(),
            legacy: LEGACY_CONTAINER.to_owned(),
            reserved_owners: vec![LOCAL_SYSTEM_SID.to_owned()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_system_is_reserved() {
        let layout = TrashLayout::default();
        assert!(layout.is_reserved("S-1-5-18"));
        assert!(layout.is_reserved("s-1-5-18"));
        assert!(!layout.is_reserved("S-1-5-21-1004336348-1177238915-682003330-1001"));
    }
}

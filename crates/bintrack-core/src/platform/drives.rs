/// Fixed-volume enumeration.
///
/// On Windows this walks the logical drive strings and keeps only fixed
/// drives that are currently ready. Elsewhere it reads the mount table and
/// keeps block-device mounts that are not network or removable media.
use std::path::PathBuf;

/// Drive type classification, from `GetDriveTypeW`'s return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    Fixed,
    Removable,
    Network,
    CdRom,
    RamDisk,
    Unknown,
}

impl DriveKind {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            2 => Self::Removable,
            3 => Self::Fixed,
            4 => Self::Network,
            5 => Self::CdRom,
            6 => Self::RamDisk,
            _ => Self::Unknown,
        }
    }
}

/// Mount points of every fixed, ready volume present right now.
#[cfg(windows)]
pub fn fixed_drive_roots() -> std::io::Result<Vec<PathBuf>> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows::Win32::Storage::FileSystem::{GetDriveTypeW, GetLogicalDriveStringsW};

    // GetLogicalDriveStringsW returns the required length when the buffer is short.
    let mut buffer = vec![0u16; 256];
    let mut len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;
    if len > buffer.len() {
        buffer = vec![0u16; len + 1];
        len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;
    }
    if len == 0 || len > buffer.len() {
        return Err(std::io::Error::last_os_error());
    }

    let full = OsString::from_wide(&buffer[..len]);
    let full_str = full.to_string_lossy();

    let mut roots = Vec::new();
    for root in full_str.split('\0').filter(|s| !s.is_empty()) {
        let root_wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
        let raw_type = unsafe { GetDriveTypeW(windows::core::PCWSTR(root_wide.as_ptr())) };

        if DriveKind::from_raw(raw_type) != DriveKind::Fixed {
            continue;
        }

        let path = PathBuf::from(root);
        // A fixed drive whose volume is offline or locked (BitLocker) is not ready.
        if !path.exists() {
            tracing::debug!("Skipping drive {} — not ready", root);
            continue;
        }
        roots.push(path);
    }

    Ok(roots)
}

/// Mount points of every local block-device volume present right now.
#[cfg(not(windows))]
pub fn fixed_drive_roots() -> std::io::Result<Vec<PathBuf>> {
    match std::fs::read_to_string("/proc/mounts") {
        Ok(table) => {
            let roots = local_mounts(&table);
            if roots.is_empty() {
                Ok(vec![PathBuf::from("/")])
            } else {
                Ok(roots)
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(vec![PathBuf::from("/")]),
        Err(e) => Err(e),
    }
}

#[cfg(not(windows))]
const NETWORK_FS: &[&str] = &[
    "nfs", "nfs4", "cifs", "smb3", "smbfs", "ncpfs", "afs", "9p", "fuse.sshfs", "ceph", "glusterfs",
];

/// Parse a `/proc/mounts` table into local, non-removable mount points.
#[cfg(not(windows))]
fn local_mounts(table: &str) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(mount), Some(fs_type)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if !device.starts_with("/dev/") || NETWORK_FS.contains(&fs_type) {
            continue;
        }
        let mount = unescape_mount(mount);
        if mount.starts_with("/media/") || mount.starts_with("/run/media/") {
            continue;
        }
        let path = PathBuf::from(mount);
        if !roots.contains(&path) {
            roots.push(path);
        }
    }
    roots
}

/// `/proc/mounts` escapes whitespace and backslashes as three-digit octal.
#[cfg(not(windows))]
fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_raw_drive_types() {
        assert_eq!(DriveKind::from_raw(3), DriveKind::Fixed);
        assert_eq!(DriveKind::from_raw(4), DriveKind::Network);
        assert_eq!(DriveKind::from_raw(2), DriveKind::Removable);
        assert_eq!(DriveKind::from_raw(0), DriveKind::Unknown);
    }

    #[test]
    fn enumeration_does_not_panic() {
        let _ = fixed_drive_roots();
    }

    #[cfg(not(windows))]
    #[test]
    fn mount_table_keeps_local_block_devices() {
        let table = "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
proc /proc proc rw 0 0
/dev/nvme0n1p1 /boot/efi vfat rw 0 0
server:/export /mnt/nfs nfs4 rw 0 0
/dev/sdb1 /media/usb vfat rw 0 0
/dev/sda1 /srv/big\\040disk xfs rw 0 0
";
        let roots = local_mounts(table);
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/"),
                PathBuf::from("/boot/efi"),
                PathBuf::from("/srv/big disk"),
            ]
        );
    }
}

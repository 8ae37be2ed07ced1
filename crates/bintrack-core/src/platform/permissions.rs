/// Elevation check.
///
/// The native empty-trash command only reaches every user's bin when run
/// elevated; strategy A logs a warning when it is not.

/// Whether the current process runs with administrator (or root) rights.
///
/// A failed query counts as not elevated.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    match token::query_elevation() {
        Ok(elevated) => elevated,
        Err(e) => {
            tracing::debug!("Elevation query failed, assuming unelevated: {}", e);
            false
        }
    }
}

#[cfg(windows)]
mod token {
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    /// The process token, closed on drop.
    struct ProcessToken(HANDLE);

    impl ProcessToken {
        fn open() -> windows::core::Result<Self> {
            let mut handle = HANDLE::default();
            unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut handle)? };
            Ok(Self(handle))
        }
    }

    impl Drop for ProcessToken {
        fn drop(&mut self) {
            let _ = unsafe { CloseHandle(self.0) };
        }
    }

    pub(super) fn query_elevation() -> windows::core::Result<bool> {
        let token = ProcessToken::open()?;
        let mut info = TOKEN_ELEVATION::default();
        let mut written = 0u32;
        unsafe {
            GetTokenInformation(
                token.0,
                TokenElevation,
                Some(std::ptr::addr_of_mut!(info).cast()),
                std::mem::size_of::<TOKEN_ELEVATION>() as u32,
                &mut written,
            )?
        };
        Ok(info.TokenIsElevated != 0)
    }
}

#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(any(windows, unix)))]
pub fn is_elevated() -> bool {
    false
}

/// Platform-specific functionality — fixed-volume enumeration, elevation
/// checks, external process execution, and the shell automation adapter.
///
/// Everything that touches the Windows API is gated on `cfg(windows)`; the
/// other targets get equivalents so the core builds and tests anywhere.
pub mod command;
pub mod drives;
pub mod permissions;
pub mod shell;

pub use command::SystemCommandRunner;
pub use drives::{fixed_drive_roots, DriveKind};
pub use permissions::is_elevated;
pub use shell::ContainerAutomation;

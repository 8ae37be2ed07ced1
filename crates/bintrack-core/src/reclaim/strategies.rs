/// The two reclamation strategies and the narrow host interfaces they use.
///
/// Strategy A shells out to the host's own "empty trash" command. Strategy B
/// drives a shell automation model through [`TrashAutomation`]. Neither knows
/// how the host actually implements those; the adapters live in
/// [`crate::platform`].
use super::ReclaimStrategy;
use crate::error::CommandError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long strategy A waits for the native command before giving up.
pub const NATIVE_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// First line of the error stream that indicates a real failure.
///
/// The exit code is ignored. `Clear-RecycleBin` exits non-zero
/// on an already-empty bin. Blank lines and `WARNING:` lines are benign.
pub fn error_indicator(output: &CommandOutput) -> Option<&str> {
    output
        .stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.to_ascii_uppercase().starts_with("WARNING:"))
}

/// Strategy A: the host's native "empty trash" command.
pub struct NativeCommandStrategy {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl NativeCommandStrategy {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
            timeout: NATIVE_COMMAND_TIMEOUT,
        }
    }

    /// `Clear-RecycleBin -Force` through PowerShell on Windows,
    /// `gio trash --empty` elsewhere.
    pub fn platform_default(runner: Arc<dyn CommandRunner>) -> Self {
        let (program, args) = if cfg!(windows) {
            (
                "powershell",
                vec![
                    "-NoProfile",
                    "-NonInteractive",
                    "-Command",
                    "Clear-RecycleBin -Force",
                ],
            )
        } else {
            ("gio", vec!["trash", "--empty"])
        };
        Self::new(
            runner,
            program,
            args.into_iter().map(str::to_owned).collect(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ReclaimStrategy for NativeCommandStrategy {
    fn name(&self) -> &str {
        "native-command"
    }

    fn run(&self) -> Result<(), String> {
        if !crate::platform::is_elevated() {
            warn!(
                "{} is running without elevation; some recycle bin entries may survive",
                self.program
            );
        }

        let output = self
            .runner
            .run(&self.program, &self.args, self.timeout)
            .map_err(|e| e.to_string())?;
        debug!(
            "{} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            self.program,
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        match error_indicator(&output) {
            Some(line) => Err(format!("{} reported an error: {}", self.program, line)),
            None => Ok(()),
        }
    }
}

/// One reclaimable entry as the automation model sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashItem {
    /// Stable identifier the adapter can delete by.
    pub id: PathBuf,
    /// Display name.
    pub name: String,
}

/// Narrow view of the host's shell automation model.
pub trait TrashAutomation: Send + Sync {
    /// Current reclaimable items. `Err` means the model is unavailable.
    fn items(&self) -> Result<Vec<TrashItem>, String>;

    /// Invoke a bulk "empty" verb. `false` when none is exposed or it failed.
    fn try_bulk_empty_verb(&self) -> bool;

    /// Permanently delete one item. `true` on success.
    fn delete_item(&self, item: &TrashItem) -> bool;
}

/// Strategy B: enumerate through the automation model and delete.
///
/// Succeeds when the bin was already empty, when the bulk verb worked, or
/// when at least one item was deleted individually.
pub struct ShellAutomationStrategy {
    automation: Arc<dyn TrashAutomation>,
}

impl ShellAutomationStrategy {
    pub fn new(automation: Arc<dyn TrashAutomation>) -> Self {
        Self { automation }
    }
}

impl ReclaimStrategy for ShellAutomationStrategy {
    fn name(&self) -> &str {
        "shell-automation"
    }

    fn run(&self) -> Result<(), String> {
        let items = self.automation.items()?;
        if items.is_empty() {
            info!("Recycle bin already empty");
            return Ok(());
        }

        if self.automation.try_bulk_empty_verb() {
            info!("Bulk empty verb removed {} item(s)", items.len());
            return Ok(());
        }

        let mut deleted = 0usize;
        for item in &items {
            if self.automation.delete_item(item) {
                deleted += 1;
            } else {
                warn!("Failed to delete item: {}", item.name);
            }
        }

        if deleted > 0 {
            info!("Deleted {} of {} recycle bin item(s)", deleted, items.len());
            Ok(())
        } else {
            Err(format!(
                "none of {} recycle bin item(s) could be deleted",
                items.len()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct CannedRunner(Result<CommandOutput, String>);

    impl CommandRunner for CannedRunner {
        fn run(
            &self,
            program: &str,
            _args: &[String],
            timeout: Duration,
        ) -> Result<CommandOutput, CommandError> {
            self.0.clone().map_err(|_| CommandError::Timeout {
                program: program.to_owned(),
                timeout,
            })
        }
    }

    fn native(result: Result<CommandOutput, String>) -> NativeCommandStrategy {
        NativeCommandStrategy::new(Arc::new(CannedRunner(result)), "clear-bin", Vec::new())
    }

    #[test]
    fn nonzero_exit_without_errors_is_success() {
        let out = CommandOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "\r\n".into(),
        };
        assert_eq!(native(Ok(out)).run(), Ok(()));
    }

    #[test]
    fn warnings_on_stderr_are_benign() {
        let out = CommandOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: "WARNING: 2 items were in use\n".into(),
        };
        assert!(native(Ok(out)).run().is_ok());
    }

    #[test]
    fn error_stream_text_is_failure_even_with_zero_exit() {
        let out = CommandOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: "\nClear-RecycleBin : Access is denied\n".into(),
        };
        let err = native(Ok(out)).run().unwrap_err();
        assert!(err.contains("Access is denied"), "{err}");
    }

    #[test]
    fn launch_failure_is_failure() {
        let err = native(Err("boom".into())).run().unwrap_err();
        assert!(err.contains("clear-bin"), "{err}");
    }

    #[derive(Default)]
    struct FakeShell {
        items: Vec<&'static str>,
        unavailable: bool,
        bulk: bool,
        deletable: Vec<&'static str>,
        deleted: Mutex<Vec<String>>,
    }

    impl TrashAutomation for FakeShell {
        fn items(&self) -> Result<Vec<TrashItem>, String> {
            if self.unavailable {
                return Err("Shell.Application unavailable".into());
            }
            Ok(self
                .items
                .iter()
                .map(|n| TrashItem {
                    id: PathBuf::from(n),
                    name: (*n).to_owned(),
                })
                .collect())
        }

        fn try_bulk_empty_verb(&self) -> bool {
            self.bulk
        }

        fn delete_item(&self, item: &TrashItem) -> bool {
            let ok = self.deletable.contains(&item.name.as_str());
            if ok {
                self.deleted.lock().push(item.name.clone());
            }
            ok
        }
    }

    fn shell(fake: FakeShell) -> (ShellAutomationStrategy, Arc<FakeShell>) {
        let fake = Arc::new(fake);
        (ShellAutomationStrategy::new(fake.clone()), fake)
    }

    #[test]
    fn empty_bin_succeeds_trivially() {
        let (strategy, _) = shell(FakeShell::default());
        assert_eq!(strategy.run(), Ok(()));
    }

    #[test]
    fn bulk_verb_skips_per_item_deletion() {
        let (strategy, fake) = shell(FakeShell {
            items: vec!["a.txt", "b.txt"],
            bulk: true,
            ..FakeShell::default()
        });
        assert_eq!(strategy.run(), Ok(()));
        assert!(fake.deleted.lock().is_empty());
    }

    #[test]
    fn partial_per_item_deletion_is_success() {
        let (strategy, fake) = shell(FakeShell {
            items: vec!["a.txt", "locked.db", "c.txt"],
            deletable: vec!["a.txt", "c.txt"],
            ..FakeShell::default()
        });
        assert_eq!(strategy.run(), Ok(()));
        assert_eq!(*fake.deleted.lock(), vec!["a.txt", "c.txt"]);
    }

    #[test]
    fn nothing_deletable_is_failure() {
        let (strategy, _) = shell(FakeShell {
            items: vec!["locked.db"],
            ..FakeShell::default()
        });
        assert!(strategy.run().unwrap_err().contains("none of 1"));
    }

    #[test]
    fn unavailable_model_is_failure() {
        let (strategy, _) = shell(FakeShell {
            unavailable: true,
            ..FakeShell::default()
        });
        assert_eq!(
            strategy.run(),
            Err("Shell.Application unavailable".to_owned())
        );
    }
}

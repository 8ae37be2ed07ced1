/// Error types shared across the core.
///
/// Aggregation never returns an error: unreadable subtrees and missing
/// volumes degrade to zero contributions and are only logged. The types here
/// cover the failures that callers can actually observe.
use crate::reclaim::ReclaimAttempt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A monitor configuration value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("size threshold must be greater than zero bytes")]
    NonPositiveThreshold,
    #[error("poll interval must be greater than zero")]
    NonPositiveInterval,
    #[error("mute period is too long")]
    MuteOutOfRange,
}

/// The settings store could not be read or written.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialise settings: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("no per-user configuration directory is available on this host")]
    NoConfigDir,

    #[error("settings hold an invalid monitor configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// Running an external command failed before its output could be judged.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed while waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A reclamation invocation did not succeed.
#[derive(Debug, Error)]
pub enum ReclaimError {
    #[error("no reclamation strategies are configured")]
    NoStrategies,

    /// Every strategy was tried and none reported success.
    #[error("failed to empty the recycle bin: {last_reason}")]
    Exhausted {
        /// Failure reason reported by the last strategy in the order.
        last_reason: String,
        /// Every attempt made, in execution order.
        attempts: Vec<ReclaimAttempt>,
    },

    #[error("reclamation worker exited without reporting a result")]
    WorkerLost,
}

impl ReclaimError {
    /// Attempts recorded before the invocation failed.
    pub fn attempts(&self) -> &[ReclaimAttempt] {
        match self {
            Self::NoStrategies | Self::WorkerLost => &[],
            Self::Exhausted { attempts, .. } => attempts,
        }
    }
}

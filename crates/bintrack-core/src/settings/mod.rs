/// Persisted settings — the record the tray and CLI edit, and the store it
/// lives in.
///
/// The record is whole-file JSON. Saves are atomic (temp file + rename) so a
/// concurrent load never sees a half-written file. Fields missing from the
/// file take their defaults, so older files keep loading.
pub mod watcher;

pub use watcher::{ConfigWatcher, PollOutcome, WatcherHandle, DEFAULT_WATCH_CADENCE};

use crate::error::{ConfigError, SettingsError};
use crate::model::config::{DEFAULT_POLL_INTERVAL, DEFAULT_THRESHOLD_BYTES};
use crate::model::MonitorConfig;
use crate::notify::NotificationGate;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directory created under the per-user configuration directory.
pub const SETTINGS_DIR_NAME: &str = "BinTracker";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub threshold_bytes: u64,
    pub poll_interval_ms: u64,
    pub notifications_enabled: bool,
    /// Alerts are suppressed until this moment.
    pub mute_until: Option<DateTime<Local>>,
    pub minimize_to_tray: bool,
    pub start_with_windows: bool,
    pub show_balloon_tips: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            notifications_enabled: true,
            mute_until: None,
            minimize_to_tray: true,
            start_with_windows: false,
            show_balloon_tips: true,
        }
    }
}

impl Settings {
    /// The monitor configuration these settings describe.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        MonitorConfig::new(
            self.threshold_bytes,
            Duration::from_millis(self.poll_interval_ms),
            self.notifications_enabled,
        )
    }

    pub fn is_muted(&self, now: DateTime<Local>) -> bool {
        self.mute_until.is_some_and(|until| now < until)
    }

    /// Whether a crossing alert may be sent at `now`.
    pub fn dispatch_allowed(&self, now: DateTime<Local>) -> bool {
        self.notifications_enabled && !self.is_muted(now)
    }

    /// Mute until `now + span`. A span past the calendar's range is rejected
    /// and the previous mute is kept.
    pub fn mute_for(
        &mut self,
        span: chrono::Duration,
        now: DateTime<Local>,
    ) -> Result<(), ConfigError> {
        let until = now
            .checked_add_signed(span)
            .ok_or(ConfigError::MuteOutOfRange)?;
        self.mute_until = Some(until);
        Ok(())
    }

    pub fn mute_for_hours(&mut self, hours: i64) -> Result<(), ConfigError> {
        let span = chrono::Duration::try_hours(hours).ok_or(ConfigError::MuteOutOfRange)?;
        self.mute_for(span, Local::now())
    }

    pub fn mute_for_days(&mut self, days: i64) -> Result<(), ConfigError> {
        let span = chrono::Duration::try_days(days).ok_or(ConfigError::MuteOutOfRange)?;
        self.mute_for(span, Local::now())
    }

    pub fn unmute(&mut self) {
        self.mute_until = None;
    }

    /// Short status line, e.g. `"Muted for 3h 12m"`.
    pub fn mute_status_text(&self, now: DateTime<Local>) -> String {
        let Some(until) = self.mute_until.filter(|until| now < *until) else {
            return "Notifications enabled".to_owned();
        };
        let remaining = until - now;
        let hours = remaining.num_hours();
        if hours < 24 {
            format!("Muted for {}h {}m", hours, remaining.num_minutes() % 60)
        } else {
            format!("Muted for {}d {}h", remaining.num_days(), hours % 24)
        }
    }
}

/// Whole-record settings persistence.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;

    fn reset_to_defaults(&self) -> Result<Settings, SettingsError> {
        info!("Resetting settings to defaults");
        let defaults = Settings::default();
        self.save(&defaults)?;
        Ok(defaults)
    }
}

/// Settings stored as pretty-printed JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/BinTracker/settings.json` for the current user.
    pub fn default_location() -> Result<Self, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(base.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Settings file not found, creating default settings");
                let defaults = Settings::default();
                self.save(&defaults)?;
                return Ok(defaults);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let settings = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })?;
        debug!("Settings loaded from {:?}", self.path);
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
                info!("Created settings directory: {:?}", dir);
            }
        }

        let json = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.io_error(e));
        }
        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

/// In-memory store for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.settings.read().clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        *self.settings.write() = settings.clone();
        Ok(())
    }
}

/// Startup configuration: the store's values, or defaults when the store is
/// unreadable or holds invalid values.
pub fn initial_config(store: &dyn SettingsStore) -> MonitorConfig {
    match store.load() {
        Ok(settings) => match settings.monitor_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Stored settings rejected ({}); using defaults", e);
                MonitorConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to load settings ({}); using defaults", e);
            MonitorConfig::default()
        }
    }
}

/// Notification gate that re-reads the store at every crossing.
///
/// If the store cannot be read, the last successful answer stands.
pub struct SettingsGate {
    store: Arc<dyn SettingsStore>,
    last_answer: AtomicBool,
}

impl SettingsGate {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            last_answer: AtomicBool::new(true),
        }
    }
}

impl NotificationGate for SettingsGate {
    fn dispatch_allowed(&self) -> bool {
        match self.store.load() {
            Ok(settings) => {
                let now = Local::now();
                let allowed = settings.dispatch_allowed(now);
                if !allowed {
                    debug!(
                        "Notification gate closed - enabled: {}, muted: {}",
                        settings.notifications_enabled,
                        settings.is_muted(now)
                    );
                }
                self.last_answer.store(allowed, Ordering::SeqCst);
                allowed
            }
            Err(e) => {
                warn!("Failed to check notification settings: {}", e);
                self.last_answer.load(Ordering::SeqCst)
            }
        }
    }
}

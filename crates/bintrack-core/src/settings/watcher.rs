/// Config watcher — applies settings edits to a running monitor.
///
/// The settings file has no change notification, so the watcher polls it on
/// a short fixed cadence, independent of the monitor's own interval (which is
/// itself one of the watched values). Threshold and interval changes
/// reschedule the monitor. A notification flag change is swapped in without a
/// reschedule, so a monitor with no [`SettingsGate`](super::SettingsGate)
/// still sees it at the next crossing.
use super::SettingsStore;
use crate::error::ConfigError;
use crate::model::MonitorConfig;
use crate::monitor::ThresholdMonitor;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the settings store is re-read.
pub const DEFAULT_WATCH_CADENCE: Duration = Duration::from_secs(2);

/// What one poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Threshold and interval match the last applied values.
    Unchanged,
    /// New threshold or interval values were pushed to the monitor.
    Applied(Arc<MonitorConfig>),
    /// Only the notification flag changed; the schedule was left alone.
    NotificationsChanged(bool),
    /// The stored values are invalid; the last applied config stays.
    Rejected(ConfigError),
    /// The store could not be read; the last applied config stays.
    LoadFailed,
}

pub struct ConfigWatcher {
    store: Arc<dyn SettingsStore>,
    monitor: Arc<ThresholdMonitor>,
    last_applied: Mutex<Arc<MonitorConfig>>,
}

impl ConfigWatcher {
    /// Watch `store` on behalf of `monitor`, starting from the monitor's
    /// current configuration.
    pub fn new(store: Arc<dyn SettingsStore>, monitor: Arc<ThresholdMonitor>) -> Self {
        let last_applied = Mutex::new(monitor.current_config());
        Self {
            store,
            monitor,
            last_applied,
        }
    }

    /// The last configuration pushed to the monitor (or the starting one).
    pub fn current(&self) -> Arc<MonitorConfig> {
        Arc::clone(&self.last_applied.lock())
    }

    /// Load settings once and push changes to the monitor.
    pub fn poll(&self) -> PollOutcome {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Config watcher: {}; keeping last-known-good config", e);
                return PollOutcome::LoadFailed;
            }
        };

        let candidate = match settings.monitor_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Config watcher: rejected stored settings: {}", e);
                return PollOutcome::Rejected(e);
            }
        };

        let mut last = self.last_applied.lock();
        if !candidate.schedule_differs(&last) {
            let enabled = candidate.notifications_enabled();
            if enabled == last.notifications_enabled() {
                return PollOutcome::Unchanged;
            }
            self.monitor.set_notifications_enabled(enabled);
            *last = Arc::new(last.with_notifications(enabled));
            return PollOutcome::NotificationsChanged(enabled);
        }

        info!("Config watcher: settings changed, updating monitor");
        let applied = Arc::new(candidate);
        self.monitor.replace_config((*applied).clone());
        *last = Arc::clone(&applied);
        PollOutcome::Applied(applied)
    }

    /// Poll on a background thread every `cadence` until the handle is
    /// stopped or dropped.
    pub fn spawn(self: &Arc<Self>, cadence: Duration) -> std::io::Result<WatcherHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let watcher = Arc::clone(self);
        let thread = thread::Builder::new()
            .name("bintrack-config".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(cadence) {
                        Err(RecvTimeoutError::Timeout) => {
                            watcher.poll();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Config watcher stopped");
            })?;
        Ok(WatcherHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// Handle to a running config watcher thread.
pub struct WatcherHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stop polling and wait for the thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::UsageSource;
    use crate::error::SettingsError;
    use crate::model::UsageSnapshot;
    use crate::settings::{MemorySettingsStore, Settings};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    struct Empty;

    impl UsageSource for Empty {
        fn aggregate(&self) -> UsageSnapshot {
            UsageSnapshot::empty()
        }
    }

    /// A store whose reads can be made to fail.
    struct Flaky {
        inner: MemorySettingsStore,
        broken: AtomicBool,
    }

    impl SettingsStore for Flaky {
        fn load(&self) -> Result<Settings, SettingsError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(SettingsError::NoConfigDir);
            }
            self.inner.load()
        }

        fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
            self.inner.save(settings)
        }
    }

    fn setup() -> (Arc<Flaky>, Arc<ThresholdMonitor>, ConfigWatcher) {
        let store = Arc::new(Flaky {
            inner: MemorySettingsStore::default(),
            broken: AtomicBool::new(false),
        });
        let config = crate::settings::initial_config(store.as_ref());
        let (monitor, _rx) = ThresholdMonitor::new(Arc::new(Empty), config);
        let monitor = Arc::new(monitor);
        let watcher = ConfigWatcher::new(store.clone(), Arc::clone(&monitor));
        (store, monitor, watcher)
    }

    fn edit(store: &Flaky, f: impl FnOnce(&mut Settings)) {
        let mut s = store.load().unwrap();
        f(&mut s);
        store.save(&s).unwrap();
    }

    #[test]
    fn unchanged_settings_do_nothing() {
        let (_store, _monitor, watcher) = setup();
        assert_eq!(watcher.poll(), PollOutcome::Unchanged);
    }

    #[test]
    fn threshold_change_reaches_monitor() {
        let (store, monitor, watcher) = setup();
        edit(&store, |s| s.threshold_bytes = 4096);

        match watcher.poll() {
            PollOutcome::Applied(config) => assert_eq!(config.threshold_bytes(), 4096),
            other => panic!("expected Applied, got {other:?}"),
        }
        assert_eq!(monitor.current_config().threshold_bytes(), 4096);
        assert_eq!(watcher.poll(), PollOutcome::Unchanged);
    }

    #[test]
    fn notification_toggle_reaches_monitor_without_reschedule() {
        let (store, monitor, watcher) = setup();
        edit(&store, |s| s.notifications_enabled = false);

        assert_eq!(watcher.poll(), PollOutcome::NotificationsChanged(false));
        assert!(!monitor.current_config().notifications_enabled());
        assert_eq!(
            monitor.current_config().poll_interval(),
            Duration::from_millis(30_000)
        );
        assert_eq!(watcher.poll(), PollOutcome::Unchanged);

        edit(&store, |s| s.notifications_enabled = true);
        assert_eq!(watcher.poll(), PollOutcome::NotificationsChanged(true));
        assert!(monitor.current_config().notifications_enabled());
    }

    #[test]
    fn invalid_values_keep_last_applied() {
        let (store, monitor, watcher) = setup();
        edit(&store, |s| s.poll_interval_ms = 0);
        assert_eq!(
            watcher.poll(),
            PollOutcome::Rejected(ConfigError::NonPositiveInterval)
        );
        assert_eq!(
            monitor.current_config().poll_interval(),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn unreadable_store_keeps_last_applied() {
        let (store, monitor, watcher) = setup();
        edit(&store, |s| s.threshold_bytes = 77);
        assert!(matches!(watcher.poll(), PollOutcome::Applied(_)));

        store.broken.store(true, Ordering::SeqCst);
        assert_eq!(watcher.poll(), PollOutcome::LoadFailed);
        assert_eq!(watcher.current().threshold_bytes(), 77);
        assert_eq!(monitor.current_config().threshold_bytes(), 77);
    }

    #[test]
    fn background_watcher_picks_up_edits() {
        let (store, monitor, watcher) = setup();
        let watcher = Arc::new(watcher);
        let mut handle = watcher.spawn(Duration::from_millis(5)).unwrap();

        edit(&store, |s| s.poll_interval_ms = 1_234);
        let deadline = Instant::now() + Duration::from_secs(10);
        while monitor.current_config().poll_interval() != Duration::from_millis(1_234) {
            assert!(Instant::now() < deadline, "watcher never applied the edit");
            thread::sleep(Duration::from_millis(5));
        }

        handle.stop();
        handle.stop();
    }
}

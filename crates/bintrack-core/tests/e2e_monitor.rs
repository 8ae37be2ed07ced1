/// End-to-end monitoring tests.
///
/// A real `SizeAggregator` over a temporary container drives a running
/// `ThresholdMonitor`; crossings flow through the real dispatcher thread
/// into a recording notifier. Settings come from a real store so the gate
/// and the config watcher are exercised too.
use bintrack_core::aggregate::{SizeAggregator, StaticRoots, TrashLayout, PRIMARY_CONTAINER};
use bintrack_core::model::MonitorConfig;
use bintrack_core::monitor::ThresholdMonitor;
use bintrack_core::notify::{spawn_dispatcher, Notifier, Severity, CROSSING_TITLE};
use bintrack_core::settings::{
    ConfigWatcher, JsonSettingsStore, MemorySettingsStore, PollOutcome, Settings, SettingsGate,
    SettingsStore,
};
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

const TICK: Duration = Duration::from_millis(20);

#[derive(Default)]
struct Recorder {
    alerts: Mutex<Vec<(String, String, Severity)>>,
}

impl Recorder {
    fn count(&self) -> usize {
        self.alerts.lock().len()
    }
}

impl Notifier for Recorder {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        self.alerts
            .lock()
            .push((title.to_owned(), message.to_owned(), severity));
    }
}

/// A volume with one owner bin, returned as (tempdir, owner bin path).
fn volume() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let bin = tmp.path().join(PRIMARY_CONTAINER).join("S-1-5-21-1001");
    fs::create_dir_all(&bin).unwrap();
    (tmp, bin)
}

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

fn aggregator(mount: &Path) -> Arc<SizeAggregator> {
    Arc::new(SizeAggregator::with_walk_threads(
        Arc::new(StaticRoots(vec![mount.to_path_buf()])),
        TrashLayout::default(),
        1,
    ))
}

/// Poll `cond` until it holds or ten seconds pass.
fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Wait for the monitor to complete `n` more ticks.
fn wait_ticks(monitor: &ThresholdMonitor, n: u64) {
    let target = monitor.status().ticks + n;
    wait_until("ticks", || monitor.status().ticks >= target);
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn each_excursion_above_threshold_alerts_once() {
    let (tmp, bin) = volume();
    write_bytes(&bin.join("$Rfirst"), 500);

    let config = MonitorConfig::new(1000, TICK, true).unwrap();
    let (monitor, crossings) = ThresholdMonitor::new(aggregator(tmp.path()), config);
    let recorder = Arc::new(Recorder::default());
    let dispatcher = spawn_dispatcher(crossings, recorder.clone()).unwrap();

    monitor.start().unwrap();
    wait_ticks(&monitor, 2);
    assert_eq!(recorder.count(), 0);

    // Cross upward.
    write_bytes(&bin.join("$Rsecond"), 600);
    wait_until("first alert", || recorder.count() == 1);
    wait_ticks(&monitor, 3);
    assert_eq!(recorder.count(), 1, "staying above must not re-alert");

    // Fall back below, then cross again.
    fs::remove_file(bin.join("$Rsecond")).unwrap();
    wait_until("re-arm", || !monitor.status().over_threshold);
    write_bytes(&bin.join("$Rthird"), 700);
    wait_until("second alert", || recorder.count() == 2);

    monitor.stop();
    drop(monitor);
    dispatcher.join().unwrap();

    let alerts = recorder.alerts.lock();
    assert_eq!(alerts.len(), 2);
    for (title, message, severity) in alerts.iter() {
        assert_eq!(title, CROSSING_TITLE);
        assert!(message.contains("Consider emptying the recycle bin"));
        assert_eq!(*severity, Severity::Warning);
    }
}

#[test]
fn muted_settings_suppress_alerts_but_not_tracking() {
    let (tmp, bin) = volume();
    write_bytes(&bin.join("$Rbig"), 2048);
    let settings_dir = TempDir::new().unwrap();
    let store: Arc<dyn SettingsStore> =
        Arc::new(JsonSettingsStore::new(settings_dir.path().join("settings.json")));

    let mut settings = Settings {
        threshold_bytes: 1024,
        poll_interval_ms: 20,
        ..Settings::default()
    };
    settings.mute_for_hours(2).unwrap();
    store.save(&settings).unwrap();

    let config = settings.monitor_config().unwrap();
    let (monitor, crossings) = ThresholdMonitor::new(aggregator(tmp.path()), config);
    let monitor = monitor.with_gate(Arc::new(SettingsGate::new(Arc::clone(&store))));

    monitor.start().unwrap();
    wait_until("over threshold", || monitor.status().over_threshold);
    wait_ticks(&monitor, 2);
    monitor.stop();

    assert!(crossings.try_recv().is_err(), "muted crossing must not be sent");
}

#[test]
fn disabling_notifications_in_the_store_silences_an_ungated_monitor() {
    let (tmp, bin) = volume();
    write_bytes(&bin.join("$Rfifty"), 50);
    let store = Arc::new(MemorySettingsStore::new(Settings {
        threshold_bytes: 10,
        poll_interval_ms: 20,
        ..Settings::default()
    }));

    let config = store.load().unwrap().monitor_config().unwrap();
    let (monitor, crossings) = ThresholdMonitor::new(aggregator(tmp.path()), config);
    let monitor = Arc::new(monitor);
    let watcher = ConfigWatcher::new(store.clone(), Arc::clone(&monitor));

    let mut settings = store.load().unwrap();
    settings.notifications_enabled = false;
    store.save(&settings).unwrap();
    assert_eq!(watcher.poll(), PollOutcome::NotificationsChanged(false));

    monitor.start().unwrap();
    wait_until("over threshold", || monitor.status().over_threshold);
    wait_ticks(&monitor, 1);
    monitor.stop();

    assert!(crossings.try_recv().is_err(), "disabled crossing must not be sent");
}

#[test]
fn edited_settings_reach_a_running_monitor() {
    let (tmp, bin) = volume();
    write_bytes(&bin.join("$Rmid"), 300);
    let store = Arc::new(MemorySettingsStore::new(Settings {
        threshold_bytes: 1_000_000,
        poll_interval_ms: 20,
        ..Settings::default()
    }));

    let config = store.load().unwrap().monitor_config().unwrap();
    let (monitor, crossings) = ThresholdMonitor::new(aggregator(tmp.path()), config);
    let monitor = Arc::new(monitor);
    let watcher = ConfigWatcher::new(store.clone(), Arc::clone(&monitor));

    monitor.start().unwrap();
    wait_ticks(&monitor, 2);
    assert!(crossings.try_recv().is_err());

    let mut settings = store.load().unwrap();
    settings.threshold_bytes = 200;
    store.save(&settings).unwrap();
    assert!(matches!(watcher.poll(), PollOutcome::Applied(_)));

    let event = crossings
        .recv_timeout(Duration::from_secs(10))
        .expect("crossing after lowering the threshold");
    assert_eq!(event.current_bytes, 300);
    assert_eq!(event.threshold_bytes, 200);

    monitor.stop();
}

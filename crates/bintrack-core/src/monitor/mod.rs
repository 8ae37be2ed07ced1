/// Threshold monitor — polls recycle bin usage on a timer and raises an
/// edge-triggered event each time usage crosses the configured threshold.
///
/// The timer is a dedicated thread driven by a control channel:
///
/// - The first tick fires immediately on [`ThresholdMonitor::start`].
/// - Ticks never overlap; a slow tick delays the next one rather than
///   doubling up.
/// - Configuration changes swap the whole [`MonitorConfig`] and send a
///   reschedule message. The worker only sees it between ticks, so an
///   in-flight tick finishes with the config it started with.
/// - [`ThresholdMonitor::stop`] sends a stop message and joins the worker,
///   letting an in-flight tick finish first.
///
/// # Usage
///
/// ```ignore
/// let (monitor, crossings) = ThresholdMonitor::new(aggregator, MonitorConfig::default());
/// monitor.start()?;
/// for event in crossings.iter() { /* alert */ }
/// ```
pub mod hysteresis;

pub use hysteresis::{CrossingDetector, ThresholdState};

use crate::aggregate::UsageSource;
use crate::error::ConfigError;
use crate::model::size::format_size;
use crate::model::{CrossingEvent, MonitorConfig, UsageSnapshot};
use crate::notify::NotificationGate;
use chrono::Local;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Crossing events that may queue before the dispatcher drains them.
///
/// Crossings are rare (at most one per excursion), so a full queue means the
/// consumer is gone or stuck; further events are dropped with a warning.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Upper bound on how far ahead a tick is scheduled.
const MAX_SCHEDULE_AHEAD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

/// Point-in-time view of the monitor for status displays.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Ticks completed since the monitor was created.
    pub ticks: u64,
    /// The hysteresis flag as of the last tick.
    pub over_threshold: bool,
    /// Most recent reading, from a tick or [`ThresholdMonitor::check_now`].
    pub last_snapshot: Option<UsageSnapshot>,
    pub config: Arc<MonitorConfig>,
}

enum Control {
    Reschedule,
    Stop,
}

struct Worker {
    control: Sender<Control>,
    thread: thread::JoinHandle<()>,
}

struct Shared {
    config: RwLock<Arc<MonitorConfig>>,
    ticks: AtomicU64,
    over_threshold: AtomicBool,
    last_snapshot: Mutex<Option<UsageSnapshot>>,
}

impl Shared {
    fn current_config(&self) -> Arc<MonitorConfig> {
        Arc::clone(&self.config.read())
    }
}

pub struct ThresholdMonitor {
    source: Arc<dyn UsageSource>,
    shared: Arc<Shared>,
    events: Sender<CrossingEvent>,
    gate: Option<Arc<dyn NotificationGate>>,
    worker: Mutex<Option<Worker>>,
}

impl ThresholdMonitor {
    /// Create a stopped monitor and the receiving end of its crossing channel.
    pub fn new(
        source: Arc<dyn UsageSource>,
        config: MonitorConfig,
    ) -> (Self, Receiver<CrossingEvent>) {
        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let monitor = Self {
            source,
            shared: Arc::new(Shared {
                config: RwLock::new(Arc::new(config)),
                ticks: AtomicU64::new(0),
                over_threshold: AtomicBool::new(false),
                last_snapshot: Mutex::new(None),
            }),
            events: tx,
            gate: None,
            worker: Mutex::new(None),
        };
        (monitor, rx)
    }

    /// Consult `gate` at each crossing instead of the config's
    /// `notifications_enabled` flag.
    pub fn with_gate(mut self, gate: Arc<dyn NotificationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Start ticking. A no-op if already running.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            info!("Recycle bin monitoring is already running");
            return Ok(());
        }

        let (control_tx, control_rx) = unbounded();
        let ticker = Ticker {
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            gate: self.gate.clone(),
        };
        self.shared.over_threshold.store(false, Ordering::SeqCst);

        let thread = thread::Builder::new()
            .name("bintrack-monitor".to_owned())
            .spawn(move || ticker.run(control_rx))?;

        let config = self.shared.current_config();
        info!(
            "Starting recycle bin monitoring with threshold {} every {:?}",
            format_size(config.threshold_bytes()),
            config.poll_interval()
        );
        *worker = Some(Worker {
            control: control_tx,
            thread,
        });
        Ok(())
    }

    /// Stop ticking and wait for any in-flight tick. A no-op if stopped.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            debug!("Recycle bin monitoring is not running");
            return;
        };

        let _ = worker.control.send(Control::Stop);
        if worker.thread.thread().id() != thread::current().id() && worker.thread.join().is_err() {
            error!("Monitor thread panicked");
        }
        info!("Recycle bin monitoring stopped");
    }

    pub fn state(&self) -> MonitorState {
        if self.worker.lock().is_some() {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    pub fn current_config(&self) -> Arc<MonitorConfig> {
        self.shared.current_config()
    }

    /// Change the threshold and interval, keeping the notification flag.
    ///
    /// Rejected values leave the running configuration untouched. Accepted
    /// values apply from the next tick.
    pub fn update_config(
        &self,
        threshold_bytes: u64,
        poll_interval: Duration,
    ) -> Result<(), ConfigError> {
        let next = self
            .shared
            .current_config()
            .with_schedule(threshold_bytes, poll_interval)?;
        self.replace_config(next);
        Ok(())
    }

    /// Swap in a whole new configuration and reschedule the timer.
    pub fn replace_config(&self, config: MonitorConfig) {
        info!(
            "Monitor configuration updated: threshold {}, interval {:?}",
            format_size(config.threshold_bytes()),
            config.poll_interval()
        );
        *self.shared.config.write() = Arc::new(config);

        if let Some(worker) = self.worker.lock().as_ref() {
            let _ = worker.control.send(Control::Reschedule);
        }
    }

    /// Change the notification flag without touching the schedule.
    ///
    /// Read at the next crossing; the pending tick keeps its deadline.
    pub fn set_notifications_enabled(&self, enabled: bool) {
        let mut config = self.shared.config.write();
        if config.notifications_enabled() == enabled {
            return;
        }
        info!("Monitor notifications {}", if enabled { "enabled" } else { "disabled" });
        *config = Arc::new(config.with_notifications(enabled));
    }

    /// Aggregate once, outside the timer. Does not touch the hysteresis flag.
    pub fn check_now(&self) -> UsageSnapshot {
        let snapshot = self.source.aggregate();
        *self.shared.last_snapshot.lock() = Some(snapshot.clone());
        snapshot
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            state: self.state(),
            ticks: self.shared.ticks.load(Ordering::SeqCst),
            over_threshold: self.shared.over_threshold.load(Ordering::SeqCst),
            last_snapshot: self.shared.last_snapshot.lock().clone(),
            config: self.shared.current_config(),
        }
    }
}

impl Drop for ThresholdMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Background thread ──────────────────────────────────────────────────────

struct Ticker {
    source: Arc<dyn UsageSource>,
    shared: Arc<Shared>,
    events: Sender<CrossingEvent>,
    gate: Option<Arc<dyn NotificationGate>>,
}

impl Ticker {
    fn run(self, control: Receiver<Control>) {
        let mut detector = CrossingDetector::new();
        let mut last_tick: Option<Instant> = None;
        let mut next_tick = Instant::now();

        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match control.recv_timeout(wait) {
                Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(Control::Reschedule) => {
                    if let Some(last) = last_tick {
                        next_tick = deadline(last, self.shared.current_config().poll_interval());
                    }
                    debug!("Monitor: rescheduled next tick");
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let started = Instant::now();
            let config = self.shared.current_config();
            self.tick(&mut detector, &config);
            last_tick = Some(started);
            next_tick = deadline(started, config.poll_interval());
        }

        debug!("Monitor: worker exiting");
    }

    fn tick(&self, detector: &mut CrossingDetector, config: &MonitorConfig) {
        let aggregated = panic::catch_unwind(AssertUnwindSafe(|| self.source.aggregate()));
        let snapshot = match aggregated {
            Ok(snapshot) => snapshot,
            Err(_) => {
                error!("Error during recycle bin size check; no crossing this tick");
                self.shared.ticks.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        info!(
            "Recycle bin size: {} (threshold: {})",
            format_size(snapshot.total_bytes),
            format_size(config.threshold_bytes())
        );

        let crossed = detector.observe(snapshot.total_bytes, config.threshold_bytes());
        self.shared
            .over_threshold
            .store(detector.is_over(), Ordering::SeqCst);

        if crossed {
            warn!(
                "Recycle bin size threshold reached: {} >= {}",
                format_size(snapshot.total_bytes),
                format_size(config.threshold_bytes())
            );
            let event = CrossingEvent {
                current_bytes: snapshot.total_bytes,
                threshold_bytes: config.threshold_bytes(),
                timestamp: Local::now(),
            };
            self.dispatch(event);
        }

        *self.shared.last_snapshot.lock() = Some(snapshot);
        self.shared.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn dispatch(&self, event: CrossingEvent) {
        // The flag is read at decision time, not from the tick's config.
        let allowed = match &self.gate {
            Some(gate) => gate.dispatch_allowed(),
            None => self.shared.current_config().notifications_enabled(),
        };
        if !allowed {
            info!("Notification skipped: notifications disabled or muted");
            return;
        }

        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Crossing event dropped: dispatcher backlog full"),
            Err(TrySendError::Disconnected(_)) => debug!("Crossing event dropped: no dispatcher"),
        }
    }
}

fn deadline(from: Instant, interval: Duration) -> Instant {
    from + interval.min(MAX_SCHEDULE_AHEAD)
}

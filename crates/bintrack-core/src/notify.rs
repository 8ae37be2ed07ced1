/// Alert dispatch — the notifier interface and the crossing dispatcher.
///
/// The monitor owns a single crossing channel. One dispatcher thread drains
/// it, formats the alert, and hands it to a [`Notifier`]. Toasts, balloon
/// tips, and e-mail are notifier implementations supplied by the host.
use crate::model::size::format_size;
use crate::model::CrossingEvent;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Delivers an alert to the operator.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Decides at crossing time whether an alert may go out.
///
/// Consulted fresh on every crossing so toggling notifications or muting
/// takes effect without touching the monitor's schedule.
pub trait NotificationGate: Send + Sync {
    fn dispatch_allowed(&self) -> bool;
}

/// Writes alerts to the log. The default for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}: {}", title, message),
            Severity::Warning => warn!("{}: {}", title, message),
            Severity::Error => error!("{}: {}", title, message),
        }
    }
}

pub const CROSSING_TITLE: &str = "Recycle Bin Size Alert";

/// Alert body for a crossing.
pub fn crossing_message(event: &CrossingEvent) -> String {
    format!(
        "Recycle bin has reached {} (threshold: {}). \
         Consider emptying the recycle bin to free up disk space.",
        format_size(event.current_bytes),
        format_size(event.threshold_bytes)
    )
}

/// Forward every crossing event to `notifier` until the monitor is dropped.
pub fn spawn_dispatcher(
    events: Receiver<CrossingEvent>,
    notifier: Arc<dyn Notifier>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("bintrack-dispatch".into())
        .spawn(move || {
            for event in events.iter() {
                notifier.notify(CROSSING_TITLE, &crossing_message(&event), Severity::Warning);
            }
            debug!("Dispatcher: crossing channel closed");
        })
}

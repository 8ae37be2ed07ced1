/// BinTracker Core — recycle bin usage monitoring and reclamation.
///
/// This crate contains all business logic with zero UI dependencies.
/// A tray icon, a service host, or a CLI can drive it through the same
/// public operations.
///
/// # Modules
///
/// - [`model`] — Usage snapshots, monitor configuration, crossing events, size formatting.
/// - [`aggregate`] — Permission-tolerant recycle bin size aggregation across volumes.
/// - [`monitor`] — Polling threshold monitor with edge-triggered crossing events.
/// - [`settings`] — Persisted settings record and the hot-reload config watcher.
/// - [`reclaim`] — Ordered, fallback-driven "empty recycle bin" executor.
/// - [`notify`] — Alert dispatch interface and the crossing-event dispatcher.
/// - [`platform`] — Fixed-drive enumeration, elevation checks, process and shell adapters.
pub mod aggregate;
pub mod error;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod platform;
pub mod reclaim;
pub mod settings;

/// Data model shared by the aggregator, monitor, and reclaim executor.
///
/// Every value here is immutable once produced: snapshots are created fresh
/// per aggregation, and configuration is replaced wholesale rather than
/// mutated field by field.
pub mod config;
pub mod event;
pub mod size;
pub mod usage;

pub use config::MonitorConfig;
pub use event::CrossingEvent;
pub use usage::{StorageRoot, UsageSnapshot};

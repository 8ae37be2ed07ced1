/// Threshold crossing event — emitted once per upward crossing, never persisted.
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingEvent {
    /// Aggregated recycle bin usage at the tick that crossed.
    pub current_bytes: u64,
    /// Threshold in force for that tick.
    pub threshold_bytes: u64,
    pub timestamp: DateTime<Local>,
}

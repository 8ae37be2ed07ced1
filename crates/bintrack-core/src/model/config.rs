/// Monitor configuration — the threshold and cadence the monitor runs with.
///
/// A `MonitorConfig` can only be built through [`MonitorConfig::new`], so a
/// value in hand always satisfies `threshold > 0` and `interval > 0`. Updates
/// build a fresh value and swap it in whole.
use crate::error::ConfigError;
use std::time::Duration;

/// Default alert threshold: 10 GiB.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Default poll interval: 30 seconds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    threshold_bytes: u64,
    poll_interval: Duration,
    notifications_enabled: bool,
}

impl MonitorConfig {
    /// Validate and build a configuration.
    pub fn new(
        threshold_bytes: u64,
        poll_interval: Duration,
        notifications_enabled: bool,
    ) -> Result<Self, ConfigError> {
        if threshold_bytes == 0 {
            return Err(ConfigError::NonPositiveThreshold);
        }
        if poll_interval.is_zero() {
            return Err(ConfigError::NonPositiveInterval);
        }
        Ok(Self {
            threshold_bytes,
            poll_interval,
            notifications_enabled,
        })
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// A copy with a new threshold and interval, keeping the notification flag.
    pub fn with_schedule(
        &self,
        threshold_bytes: u64,
        poll_interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::new(threshold_bytes, poll_interval, self.notifications_enabled)
    }

    /// A copy with the notification flag changed.
    pub fn with_notifications(&self, enabled: bool) -> Self {
        Self {
            notifications_enabled: enabled,
            ..self.clone()
        }
    }

    /// True when the threshold or interval differ from `other`.
    pub fn schedule_differs(&self, other: &Self) -> bool {
        self.threshold_bytes != other.threshold_bytes || self.poll_interval != other.poll_interval
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            notifications_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_threshold() {
        assert_eq!(
            MonitorConfig::new(0, Duration::from_secs(1), true),
            Err(ConfigError::NonPositiveThreshold)
        );
    }

    #[test]
    fn rejects_zero_interval() {
        assert_eq!(
            MonitorConfig::new(1, Duration::ZERO, true),
            Err(ConfigError::NonPositiveInterval)
        );
    }

    #[test]
    fn with_schedule_keeps_notification_flag() {
        let base = MonitorConfig::new(10, Duration::from_secs(5), false).unwrap();
        let next = base.with_schedule(20, Duration::from_secs(6)).unwrap();
        assert!(!next.notifications_enabled());
        assert_eq!(next.threshold_bytes(), 20);
        assert!(next.schedule_differs(&base));
        assert!(!next.schedule_differs(&next.clone()));
    }

    #[test]
    fn with_notifications_keeps_schedule() {
        let base = MonitorConfig::new(10, Duration::from_secs(5), true).unwrap();
        let muted = base.with_notifications(false);
        assert!(!muted.notifications_enabled());
        assert!(!muted.schedule_differs(&base));
    }

    #[test]
    fn with_schedule_rejection_leaves_original_untouched() {
        let base = MonitorConfig::default();
        assert!(base.with_schedule(0, Duration::from_secs(1)).is_err());
        assert_eq!(base.threshold_bytes(), DEFAULT_THRESHOLD_BYTES);
    }
}

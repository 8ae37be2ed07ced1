/// Edge-triggered threshold detection.
///
/// A two-state machine: an event fires only on the transition from
/// `BelowThreshold` to `AboveThreshold`. Staying above produces nothing;
/// dropping below re-arms it.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThresholdState {
    #[default]
    BelowThreshold,
    AboveThreshold,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossingDetector {
    state: ThresholdState,
}

impl CrossingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading. Returns `true` exactly when this reading crosses
    /// upward (`total >= threshold` after being below).
    pub fn observe(&mut self, total_bytes: u64, threshold_bytes: u64) -> bool {
        let over = total_bytes >= threshold_bytes;
        let crossed = over && self.state == ThresholdState::BelowThreshold;
        self.state = if over {
            ThresholdState::AboveThreshold
        } else {
            ThresholdState::BelowThreshold
        };
        crossed
    }

    pub fn state(&self) -> ThresholdState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state == ThresholdState::AboveThreshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GIB: u64 = 1_073_741_824;
    const MB: u64 = 1_000_000;

    #[test]
    fn fires_once_per_contiguous_excursion() {
        let mut detector = CrossingDetector::new();
        let readings = [900 * MB, 1_100 * MB, 1_200 * MB, 500 * MB, 1_300 * MB];
        let fired: Vec<bool> = readings.iter().map(|r| detector.observe(*r, GIB)).collect();
        assert_eq!(fired, vec![false, true, false, false, true]);
        assert!(detector.is_over());
    }

    #[test]
    fn equal_to_threshold_counts_as_over() {
        let mut detector = CrossingDetector::new();
        assert!(detector.observe(100, 100));
        assert!(!detector.observe(100, 100));
        assert!(!detector.observe(99, 100));
        assert_eq!(detector.state(), ThresholdState::BelowThreshold);
    }

    proptest! {
        /// An event fires iff the reading is over and the previous flag was clear.
        #[test]
        fn fires_iff_upward_transition(
            readings in proptest::collection::vec(0u64..2_000, 0..64),
            threshold in 1u64..2_000,
        ) {
            let mut detector = CrossingDetector::new();
            let mut was_over = false;
            for reading in readings {
                let fired = detector.observe(reading, threshold);
                let over = reading >= threshold;
                prop_assert_eq!(fired, over && !was_over);
                prop_assert_eq!(detector.is_over(), over);
                was_over = over;
            }
        }

        /// N consecutive over-threshold readings yield exactly one event.
        #[test]
        fn sustained_excursion_fires_once(
            n in 1usize..50,
            excess in 0u64..1_000,
            threshold in 1u64..1_000_000,
        ) {
            let mut detector = CrossingDetector::new();
            let events = (0..n)
                .filter(|_| detector.observe(threshold + excess, threshold))
                .count();
            prop_assert_eq!(events, 1);
        }
    }
}

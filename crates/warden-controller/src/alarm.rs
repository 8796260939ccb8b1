//! Intrusion alarm.

use tracing::{trace, warn};
use warden_core::{ControllerConfig, DoorState, SensorSample, Tick};

/// Raised when a sensor delta latches the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmEvent {
    pub previous: u16,
    pub current: u16,
    pub delta: u16,
    pub tick: Tick,
}

/// Compares consecutive sensor samples against a threshold.
#[derive(Debug, Clone)]
pub struct AlarmMonitor {
    threshold: u16,
    previous: Option<SensorSample>,
}

impl AlarmMonitor {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.sensor_threshold)
    }

    /// Feed one sample.
    ///
    /// The first sample only sets the baseline. A delta at or above the
    /// threshold latches the door state; the event is raised on the tick the
    /// latch happens, not again while it persists.
    pub fn observe(&mut self, sample: SensorSample, door: &mut DoorState) -> Option<AlarmEvent> {
        let previous = self.previous.replace(sample)?;
        let delta = sample.delta(&previous);
        trace!(value = sample.value, delta, "Sensor sample");

        if delta < self.threshold || door.is_latched() {
            return None;
        }

        *door = DoorState::AlarmLatched;
        let event = AlarmEvent {
            previous: previous.value,
            current: sample.value,
            delta,
            tick: sample.tick,
        };
        warn!(
            previous = event.previous,
            current = event.current,
            delta,
            threshold = self.threshold,
            "Intrusion alarm latched"
        );
        Some(event)
    }

    /// Clear a latched alarm. The door comes back Locked.
    ///
    /// Returns `false` if nothing was latched. Callers must have checked
    /// privileged mode.
    pub fn clear(&mut self, door: &mut DoorState) -> bool {
        if !door.is_latched() {
            return false;
        }
        *door = DoorState::Locked;
        warn!("Intrusion alarm cleared");
        true
    }

    pub fn previous(&self) -> Option<SensorSample> {
        self.previous
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(value: u16, tick: u64) -> SensorSample {
        SensorSample::new(value, Tick::new(tick)).unwrap()
    }

    #[test]
    fn test_first_sample_is_baseline() {
        let mut monitor = AlarmMonitor::new(100);
        let mut door = DoorState::Locked;
        assert!(monitor.observe(sample(900, 0), &mut door).is_none());
        assert_eq!(door, DoorState::Locked);
    }

    #[test]
    fn test_threshold_inclusive() {
        let mut monitor = AlarmMonitor::new(100);
        let mut door = DoorState::UnlockedTimed;
        monitor.observe(sample(500, 0), &mut door);
        assert!(monitor.observe(sample(599, 1), &mut door).is_none());

        let event = monitor.observe(sample(499, 2), &mut door).unwrap();
        assert_eq!(event.delta, 100);
        assert_eq!(door, DoorState::AlarmLatched);
    }

    #[test]
    fn test_latch_raised_once() {
        let mut monitor = AlarmMonitor::new(10);
        let mut door = DoorState::Locked;
        monitor.observe(sample(0, 0), &mut door);
        assert!(monitor.observe(sample(50, 1), &mut door).is_some());
        assert!(monitor.observe(sample(0, 2), &mut door).is_none());
        assert_eq!(door, DoorState::AlarmLatched);
    }

    #[test]
    fn test_clear() {
        let mut monitor = AlarmMonitor::new(10);
        let mut door = DoorState::Locked;
        assert!(!monitor.clear(&mut door));

        monitor.observe(sample(0, 0), &mut door);
        monitor.observe(sample(20, 1), &mut door);
        assert!(monitor.clear(&mut door));
        assert_eq!(door, DoorState::Locked);

        // stable readings after the clear keep it clear
        assert!(monitor.observe(sample(21, 2), &mut door).is_none());
    }

    proptest! {
        #[test]
        fn prop_latches_iff_delta_reaches_threshold(
            a in 0u16..=1023,
            b in 0u16..=1023,
            threshold in 1u16..=1023,
        ) {
            let mut monitor = AlarmMonitor::new(threshold);
            let mut door = DoorState::Locked;
            monitor.observe(sample(a, 0), &mut door);
            let event = monitor.observe(sample(b, 1), &mut door);
            prop_assert_eq!(event.is_some(), a.abs_diff(b) >= threshold);
            prop_assert_eq!(door.is_latched(), a.abs_diff(b) >= threshold);
        }
    }
}

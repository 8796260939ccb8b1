//! Mock analog sensor.

use crate::{HardwareError, Result, traits::AnalogInput};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[derive(Debug, Default)]
struct SensorState {
    value: AtomicU16,
    failing: AtomicBool,
}

/// Mock analog input returning whatever the handle last set.
///
/// # Examples
///
/// ```
/// use warden_hardware::mock::MockSensor;
/// use warden_hardware::traits::AnalogInput;
///
/// let (mut sensor, handle) = MockSensor::new(512);
/// assert_eq!(sensor.read().unwrap(), 512);
///
/// handle.set_failing(true);
/// assert!(sensor.read().is_err());
/// ```
#[derive(Debug)]
pub struct MockSensor {
    state: Arc<SensorState>,
}

impl MockSensor {
    /// Create a sensor that initially reads `value`.
    pub fn new(value: u16) -> (Self, MockSensorHandle) {
        let state = Arc::new(SensorState::default());
        state.value.store(value, Ordering::SeqCst);
        (
            Self {
                state: Arc::clone(&state),
            },
            MockSensorHandle { state },
        )
    }
}

impl AnalogInput for MockSensor {
    fn read(&mut self) -> Result<u16> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::read_failed("conversion timed out"));
        }
        Ok(self.state.value.load(Ordering::SeqCst))
    }
}

/// Handle for driving a mock sensor.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<SensorState>,
}

impl MockSensorHandle {
    pub fn set_value(&self, value: u16) {
        self.state.value.store(value, Ordering::SeqCst);
    }

    /// Make reads fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }
}

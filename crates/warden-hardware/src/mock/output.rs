//! Mock digital output (lock relay, siren).

use crate::{HardwareError, Result, traits::DigitalOutput};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct OutputState {
    active: AtomicBool,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

/// Mock output line whose level is observable through a handle.
///
/// # Examples
///
/// ```
/// use warden_hardware::mock::MockOutput;
/// use warden_hardware::traits::DigitalOutput;
///
/// let (mut relay, handle) = MockOutput::new("lock relay");
/// relay.set_active(true).unwrap();
/// assert!(handle.is_active());
/// assert_eq!(handle.write_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockOutput {
    name: String,
    state: Arc<OutputState>,
}

impl MockOutput {
    /// Create a new inactive output.
    pub fn new(name: impl Into<String>) -> (Self, MockOutputHandle) {
        let state = Arc::new(OutputState::default());
        let output = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        (output, MockOutputHandle { state })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl DigitalOutput for MockOutput {
    fn set_active(&mut self, active: bool) -> Result<()> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::write_failed(format!(
                "{} did not acknowledge",
                self.name
            )));
        }
        self.state.active.store(active, Ordering::SeqCst);
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }
}

/// Handle for observing a mock output.
#[derive(Debug, Clone)]
pub struct MockOutputHandle {
    state: Arc<OutputState>,
}

impl MockOutputHandle {
    /// Current level of the line.
    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.state.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }
}

//! Mock wall clock.

use crate::traits::WallClock;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall clock frozen at whatever time the handle last set.
///
/// # Examples
///
/// ```
/// use warden_hardware::mock::MockClock;
/// use warden_hardware::traits::WallClock;
///
/// let (clock, handle) = MockClock::at_hour(22);
/// assert_eq!(clock.hour(), 22);
/// handle.set_hour(23);
/// assert_eq!(clock.hour(), 23);
/// ```
#[derive(Debug)]
pub struct MockClock {
    seconds: Arc<AtomicI64>,
}

impl MockClock {
    /// Create a clock reading `at`.
    pub fn new(at: NaiveDateTime) -> (Self, MockClockHandle) {
        let seconds = Arc::new(AtomicI64::new(at.and_utc().timestamp()));
        (
            Self {
                seconds: Arc::clone(&seconds),
            },
            MockClockHandle { seconds },
        )
    }

    /// Create a clock reading the given hour on the epoch date.
    pub fn at_hour(hour: u8) -> (Self, MockClockHandle) {
        Self::new(at_hour_on(NaiveDate::default(), hour))
    }
}

impl WallClock for MockClock {
    fn now(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}

/// Handle for moving a mock clock.
#[derive(Debug, Clone)]
pub struct MockClockHandle {
    seconds: Arc<AtomicI64>,
}

impl MockClockHandle {
    pub fn set(&self, at: NaiveDateTime) {
        self.seconds.store(at.and_utc().timestamp(), Ordering::SeqCst);
    }

    /// Jump to the start of `hour` on the current date.
    pub fn set_hour(&self, hour: u8) {
        let date = DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .map(|dt| dt.date_naive())
            .unwrap_or_default();
        self.set(at_hour_on(date, hour));
    }
}

fn at_hour_on(date: NaiveDate, hour: u8) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(u32::from(hour.min(23)), 0, 0).unwrap_or_default();
    date.and_time(time)
}

//! Hardware device trait definitions.
//!
//! These traits are the narrow interfaces the controller core calls to reach
//! the outside world. Every method is synchronous and returns promptly: the
//! scheduler loop polls each device once per tick and must never wait on one.
//!
//! Implementations exist for the channel-backed mocks in [`crate::mock`], the
//! file-backed EEPROM image in [`crate::file`] and, on a real board, the
//! GPIO/ADC/I2C driver layer.

use crate::error::Result;
use chrono::{NaiveDateTime, Timelike};

/// A single digital output line (lock relay, siren).
///
/// "Active" means energized. For the lock relay an energized strike is an
/// open door; the de-energized state is always the secure one.
pub trait DigitalOutput {
    /// Drive the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver could not change the line, e.g. because
    /// the I/O expander did not acknowledge on the I2C bus.
    fn set_active(&mut self, active: bool) -> Result<()>;

    /// Last level successfully written.
    fn is_active(&self) -> bool;
}

/// An analog input channel.
pub trait AnalogInput {
    /// Take one conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion failed. Callers treat a failed read
    /// as "no new sample".
    fn read(&mut self) -> Result<u16>;
}

/// Source of local wall-clock time for scheduled policies.
pub trait WallClock {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current hour of day (0-23).
    fn hour(&self) -> u8 {
        // Timelike::hour is always below 24
        self.now().hour() as u8
    }
}

/// A Wiegand reader port.
///
/// The driver accumulates D0/D1 pulses and hands over a complete burst once
/// the line has been quiet long enough. A burst is either a card frame or a
/// keypad key; telling them apart is the reader adapter's job.
pub trait ReaderPort {
    /// Take the next complete burst, one element per bit, if one is waiting.
    fn poll_burst(&mut self) -> Option<Vec<u8>>;
}

/// The serial console carrying privileged commands.
pub trait ConsoleChannel {
    /// Take the next complete input line, if one is waiting.
    fn poll_line(&mut self) -> Option<String>;

    /// Send one line of output.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Byte-addressable non-volatile memory (I2C EEPROM or a file image).
pub trait NonVolatileMemory {
    /// Size of the device in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds or the transfer failed.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Write `data` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds or the transfer failed.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

/// [`WallClock`] backed by the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

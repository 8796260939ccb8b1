//! Hardware abstraction layer for the Warden door controller.
//!
//! The controller core never touches a pin, a bus or a timer register. It
//! talks to the board through the narrow traits in [`traits`]:
//!
//! - [`DigitalOutput`] for the lock relay and the siren
//! - [`AnalogInput`] for the tamper/vibration sensor
//! - [`ReaderPort`] for the two Wiegand reader ports
//! - [`ConsoleChannel`] for the serial console
//! - [`NonVolatileMemory`] for the user table EEPROM
//! - [`WallClock`] for the nightly relock policy
//!
//! All calls are synchronous and non-blocking; the scheduler polls each device
//! once per tick.
//!
//! # Mock devices
//!
//! The [`mock`] module provides channel-backed implementations of every trait.
//! Each constructor returns the device together with a handle used to inject
//! input and observe outputs:
//!
//! ```
//! use warden_hardware::mock::MockOutput;
//! use warden_hardware::traits::DigitalOutput;
//!
//! let (mut siren, handle) = MockOutput::new("siren");
//! siren.set_active(true).unwrap();
//! assert!(handle.is_active());
//! ```
//!
//! [`FileEeprom`] keeps an EEPROM image in a host file for the emulator.

pub mod error;
pub mod file;
pub mod mock;
pub mod traits;

pub use error::{HardwareError, Result};
pub use file::FileEeprom;
pub use traits::{
    AnalogInput, ConsoleChannel, DigitalOutput, NonVolatileMemory, ReaderPort, SystemClock,
    WallClock,
};

//! Board variants and the wiring maps they expose to the driver layer.
//!
//! The controller core never touches a pin. It reads the [`WiringMap`] for the
//! configured board so that the driver layer and the diagnostics agree on
//! which line carries the lock relay, the siren, the sensor and the readers.

use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware revision the firmware is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardVariant {
    /// Arduino Mega based controller.
    Mega,
    /// ATmega328 standard board, v3 layout (relays on MCU pins).
    Standard328V3,
    /// ATmega328 standard board, v4 layout (relays behind an MCP23017).
    Standard328V4,
}

/// Where a signal is physically connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoLine {
    /// Digital pin on the microcontroller.
    Mcu(u8),
    /// Pin on the I2C I/O expander.
    Expander(u8),
    /// Analog input channel.
    Analog(u8),
}

impl fmt::Display for IoLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IoLine::Mcu(pin) => write!(f, "D{pin}"),
            IoLine::Expander(pin) => write!(f, "MCP{pin}"),
            IoLine::Analog(ch) => write!(f, "A{ch}"),
        }
    }
}

/// Signal assignment for one board revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringMap {
    pub lock_relay: IoLine,
    pub siren: IoLine,
    pub sensor: IoLine,
    /// Wiegand (D0, D1) of the primary reader.
    pub reader1: (IoLine, IoLine),
    /// Wiegand (D0, D1) of the secondary reader.
    pub reader2: (IoLine, IoLine),
}

impl BoardVariant {
    /// Wiring map for this board.
    ///
    /// The v4 board routes its relays through the MCP23017 and cannot run
    /// without it; the older boards have no expander footprint.
    ///
    /// # Errors
    /// Returns `Error::Config` for an unsupported expander combination.
    pub fn wiring(self, io_expander: bool) -> Result<WiringMap> {
        match (self, io_expander) {
            (BoardVariant::Mega, false) => Ok(WiringMap {
                lock_relay: IoLine::Mcu(22),
                siren: IoLine::Mcu(24),
                sensor: IoLine::Analog(0),
                reader1: (IoLine::Mcu(2), IoLine::Mcu(3)),
                reader2: (IoLine::Mcu(18), IoLine::Mcu(19)),
            }),
            (BoardVariant::Standard328V3, false) => Ok(WiringMap {
                lock_relay: IoLine::Mcu(6),
                siren: IoLine::Mcu(7),
                sensor: IoLine::Analog(0),
                reader1: (IoLine::Mcu(2), IoLine::Mcu(3)),
                reader2: (IoLine::Mcu(4), IoLine::Mcu(5)),
            }),
            (BoardVariant::Standard328V4, true) => Ok(WiringMap {
                lock_relay: IoLine::Expander(1),
                siren: IoLine::Expander(2),
                sensor: IoLine::Analog(0),
                reader1: (IoLine::Mcu(2), IoLine::Mcu(3)),
                reader2: (IoLine::Mcu(4), IoLine::Mcu(5)),
            }),
            (BoardVariant::Standard328V4, false) => Err(Error::config(
                "io_expander",
                "v4 boards drive their relays through the MCP23017 expander",
            )),
            (board, true) => Err(Error::config(
                "io_expander",
                format!("{board} has no I/O expander"),
            )),
        }
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoardVariant::Mega => write!(f, "Mega"),
            BoardVariant::Standard328V3 => write!(f, "328 standard v3"),
            BoardVariant::Standard328V4 => write!(f, "328 standard v4"),
        }
    }
}

//! Validated controller configuration.
//!
//! [`ControllerConfig`] replaces the compile-time board header. It is built
//! once at process start (from defaults, chained setters or a JSON document),
//! validated, and then passed by value or reference into every component
//! constructor. Nothing in the workspace reads configuration from globals.
//!
//! # Examples
//!
//! ```
//! use warden_core::config::{CardFormat, ControllerConfig};
//!
//! let config = ControllerConfig::default()
//!     .with_door_hold_ticks(2500)
//!     .with_card_format(CardFormat::Raw)
//!     .validated()
//!     .unwrap();
//!
//! assert_eq!(config.door_hold_ticks, 2500);
//! ```

use crate::{
    Result,
    board::{BoardVariant, WiringMap},
    constants::*,
    diagnostics::DiagnosticVerbosity,
    error::Error,
    types::{KeypadKey, PrivilegedPassword, ReaderIndex},
};
use serde::{Deserialize, Serialize};

/// Card decoding policy of the reader adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardFormat {
    /// Leading `frame_bits - 1` bits taken as-is, parity unchecked.
    Raw,
    /// Both halves parity-checked, parity bits removed.
    ParityStripped,
}

/// How PINs are written to non-volatile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStorage {
    Plaintext,
    Hashed,
}

/// Scheduled forced relock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightlyRelock {
    pub enabled: bool,
    /// Hour of day (0-23) at which the door is forced locked.
    pub hour: u8,
}

impl Default for NightlyRelock {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: DEFAULT_RELOCK_HOUR,
        }
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Hardware revision.
    pub board: BoardVariant,
    /// MCP23017 I/O expander fitted.
    pub io_expander: bool,
    /// Persist users in the I2C EEPROM.
    pub eeprom_enabled: bool,
    pub primary_reader_has_keypad: bool,
    pub secondary_reader_has_keypad: bool,
    pub privileged_password: PrivilegedPassword,
    pub door_hold_ticks: u64,
    pub sensor_threshold: u16,
    pub keypad_timeout_ticks: u64,
    pub card_format: CardFormat,
    /// Expected Wiegand frame length in bits.
    pub frame_bits: usize,
    pub nightly_relock: NightlyRelock,
    pub verbosity: DiagnosticVerbosity,
    pub console_baud: u32,
    pub max_pin_length: usize,
    /// Key that submits the accumulated PIN.
    pub pin_terminator: KeypadKey,
    pub pin_storage: PinStorage,
    pub console_max_failures: u8,
    pub console_lockout_ticks: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            board: BoardVariant::Standard328V4,
            io_expander: true,
            eeprom_enabled: false,
            primary_reader_has_keypad: true,
            secondary_reader_has_keypad: false,
            privileged_password: PrivilegedPassword::new(DEFAULT_PRIVILEGED_PASSWORD),
            door_hold_ticks: DEFAULT_DOOR_HOLD_TICKS,
            sensor_threshold: DEFAULT_SENSOR_THRESHOLD,
            keypad_timeout_ticks: DEFAULT_KEYPAD_TIMEOUT_TICKS,
            card_format: CardFormat::ParityStripped,
            frame_bits: WIEGAND_26_BITS,
            nightly_relock: NightlyRelock::default(),
            verbosity: DiagnosticVerbosity::Hex,
            console_baud: DEFAULT_CONSOLE_BAUD,
            max_pin_length: MAX_PIN_LENGTH,
            pin_terminator: KeypadKey::Hash,
            pin_storage: PinStorage::Plaintext,
            console_max_failures: DEFAULT_CONSOLE_MAX_FAILURES,
            console_lockout_ticks: DEFAULT_CONSOLE_LOCKOUT_TICKS,
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON document and validate it. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns `Error::Config` if the document is not valid JSON for this
    /// structure or fails [`validate`](Self::validate).
    pub fn from_json(document: &str) -> Result<Self> {
        let config: ControllerConfig = serde_json::from_str(document)
            .map_err(|e| Error::config("document", e.to_string()))?;
        config.validated()
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.wiring()?;

        if self.door_hold_ticks == 0 {
            return Err(Error::config("door_hold_ticks", "must be greater than zero"));
        }
        if self.keypad_timeout_ticks == 0 {
            return Err(Error::config(
                "keypad_timeout_ticks",
                "must be greater than zero",
            ));
        }
        if !(1..=SENSOR_MAX).contains(&self.sensor_threshold) {
            return Err(Error::config(
                "sensor_threshold",
                format!("must be 1-{SENSOR_MAX}, got {}", self.sensor_threshold),
            ));
        }
        if self.nightly_relock.hour > 23 {
            return Err(Error::config(
                "nightly_relock.hour",
                format!("must be 0-23, got {}", self.nightly_relock.hour),
            ));
        }
        if !(MIN_FRAME_BITS..=MAX_FRAME_BITS).contains(&self.frame_bits) {
            return Err(Error::config(
                "frame_bits",
                format!(
                    "must be {MIN_FRAME_BITS}-{MAX_FRAME_BITS}, got {}",
                    self.frame_bits
                ),
            ));
        }
        if self.card_format == CardFormat::ParityStripped && self.frame_bits % 2 != 0 {
            return Err(Error::config(
                "frame_bits",
                "parity-stripped frames need two equal halves",
            ));
        }
        if !(1..=MAX_PIN_LENGTH).contains(&self.max_pin_length) {
            return Err(Error::config(
                "max_pin_length",
                format!("must be 1-{MAX_PIN_LENGTH}, got {}", self.max_pin_length),
            ));
        }
        if self.pin_terminator.as_digit().is_some() {
            return Err(Error::config(
                "pin_terminator",
                "must be `*` or `#`, digits belong to the PIN",
            ));
        }
        if self.console_max_failures == 0 {
            return Err(Error::config(
                "console_max_failures",
                "must allow at least one attempt",
            ));
        }
        if self.console_lockout_ticks == 0 {
            return Err(Error::config(
                "console_lockout_ticks",
                "must be greater than zero",
            ));
        }
        if self.console_baud == 0 {
            return Err(Error::config("console_baud", "must be greater than zero"));
        }
        Ok(())
    }

    /// Validate and return `self`.
    ///
    /// # Errors
    /// See [`validate`](Self::validate).
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Wiring map for the configured board.
    ///
    /// # Errors
    /// Returns `Error::Config` for an unsupported board/expander combination.
    pub fn wiring(&self) -> Result<WiringMap> {
        self.board.wiring(self.io_expander)
    }

    /// Whether PIN entry is possible on the given reader.
    #[must_use]
    pub fn reader_has_keypad(&self, reader: ReaderIndex) -> bool {
        match reader {
            ReaderIndex::Primary => self.primary_reader_has_keypad,
            ReaderIndex::Secondary => self.secondary_reader_has_keypad,
        }
    }

    pub fn with_board(mut self, board: BoardVariant, io_expander: bool) -> Self {
        self.board = board;
        self.io_expander = io_expander;
        self
    }

    pub fn with_eeprom(mut self, enabled: bool) -> Self {
        self.eeprom_enabled = enabled;
        self
    }

    pub fn with_secondary_keypad(mut self, enabled: bool) -> Self {
        self.secondary_reader_has_keypad = enabled;
        self
    }

    pub fn with_primary_keypad(mut self, enabled: bool) -> Self {
        self.primary_reader_has_keypad = enabled;
        self
    }

    /// Set the PIN length limit and the key that submits a PIN.
    pub fn with_pin_entry(mut self, max_pin_length: usize, terminator: KeypadKey) -> Self {
        self.max_pin_length = max_pin_length;
        self.pin_terminator = terminator;
        self
    }

    pub fn with_privileged_password(mut self, password: u32) -> Self {
        self.privileged_password = PrivilegedPassword::new(password);
        self
    }

    pub fn with_door_hold_ticks(mut self, ticks: u64) -> Self {
        self.door_hold_ticks = ticks;
        self
    }

    pub fn with_sensor_threshold(mut self, threshold: u16) -> Self {
        self.sensor_threshold = threshold;
        self
    }

    pub fn with_keypad_timeout_ticks(mut self, ticks: u64) -> Self {
        self.keypad_timeout_ticks = ticks;
        self
    }

    pub fn with_card_format(mut self, format: CardFormat) -> Self {
        self.card_format = format;
        self
    }

    pub fn with_frame_bits(mut self, bits: usize) -> Self {
        self.frame_bits = bits;
        self
    }

    pub fn with_nightly_relock(mut self, enabled: bool, hour: u8) -> Self {
        self.nightly_relock = NightlyRelock { enabled, hour };
        self
    }

    pub fn with_verbosity(mut self, verbosity: DiagnosticVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_pin_storage(mut self, storage: PinStorage) -> Self {
        self.pin_storage = storage;
        self
    }

    pub fn with_console_lockout(mut self, max_failures: u8, lockout_ticks: u64) -> Self {
        self.console_max_failures = max_failures;
        self.console_lockout_ticks = lockout_ticks;
        self
    }
}

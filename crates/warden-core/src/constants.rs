//! Core constants for the warden access controller.
//!
//! The default values mirror the factory settings of the reference board
//! firmware. They are the starting point of
//! [`ControllerConfig::default`](crate::config::ControllerConfig), never read
//! as ambient state by the components themselves.
//!
//! # Units
//!
//! All durations are expressed in scheduler ticks. On the reference board one
//! tick is one millisecond, so `DEFAULT_DOOR_HOLD_TICKS = 5000` keeps the lock
//! open for five seconds.
//!
//! ```
//! use warden_core::constants::*;
//!
//! assert_eq!(DEFAULT_DOOR_HOLD_TICKS, 5 * TICKS_PER_SECOND);
//! assert!(DEFAULT_SENSOR_THRESHOLD <= SENSOR_MAX);
//! ```

// ============================================================================
// Timing
// ============================================================================

/// Scheduler ticks per wall-clock second on the reference board.
pub const TICKS_PER_SECOND: u64 = 1000;

/// How long the lock stays open after a grant.
pub const DEFAULT_DOOR_HOLD_TICKS: u64 = 5000;

/// Keypad inactivity window, also the window for entering a PIN after a scan.
pub const DEFAULT_KEYPAD_TIMEOUT_TICKS: u64 = 5000;

/// Hour of day at which the nightly relock fires when enabled.
pub const DEFAULT_RELOCK_HOUR: u8 = 23;

// ============================================================================
// Sensor
// ============================================================================

/// Largest value the 10-bit analog front end can report.
pub const SENSOR_MAX: u16 = 1023;

/// Sample-to-sample change that latches the intrusion alarm.
pub const DEFAULT_SENSOR_THRESHOLD: u16 = 100;

// ============================================================================
// Credentials
// ============================================================================

/// Standard 26-bit Wiegand frame (two parity bits around 24 data bits).
pub const WIEGAND_26_BITS: usize = 26;

/// Smallest frame accepted by configuration validation.
pub const MIN_FRAME_BITS: usize = 4;

/// Largest frame accepted by configuration validation.
///
/// Decoded identifiers are packed into a `u64`.
pub const MAX_FRAME_BITS: usize = 64;

/// Burst length used by keypads that send one nibble per key.
pub const KEY_BURST_BITS: usize = 4;

/// Burst length used by keypads that send a nibble followed by its complement.
pub const KEY_BURST_BITS_CHECKED: usize = 8;

/// Longest PIN a user record can hold.
pub const MAX_PIN_LENGTH: usize = 8;

/// Maximum number of user records the controller manages.
pub const MAX_USERS: usize = 200;

/// Size of the 24LC32 user EEPROM in bytes.
pub const EEPROM_SIZE: usize = 4096;

// ============================================================================
// Console
// ============================================================================

/// Factory privileged console password.
pub const DEFAULT_PRIVILEGED_PASSWORD: u32 = 0x31337;

/// Serial console baud rate.
pub const DEFAULT_CONSOLE_BAUD: u32 = 9600;

/// Consecutive password mismatches before the console locks out.
pub const DEFAULT_CONSOLE_MAX_FAILURES: u8 = 3;

/// How long the console refuses password attempts after a lockout.
pub const DEFAULT_CONSOLE_LOCKOUT_TICKS: u64 = 30 * TICKS_PER_SECOND;

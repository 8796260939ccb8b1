use crate::{
    Result,
    constants::{MAX_PIN_LENGTH, SENSOR_MAX},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Monotonic scheduler tick.
///
/// One tick is one millisecond on the reference board. Arithmetic saturates
/// so a clock that has not advanced never produces a negative interval.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// The first tick after power-up.
    pub const ZERO: Tick = Tick(0);

    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Tick(tick)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`, zero if `earlier` lies in the future.
    #[must_use]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// The tick `ticks` after this one.
    #[must_use]
    pub fn after(self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }
}

impl From<u64> for Tick {
    fn from(tick: u64) -> Self {
        Tick(tick)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical credential identifier produced by the reader adapter.
///
/// # Security
/// Equality is constant-time so that scanning the user table does not leak
/// how close a presented credential came to a stored one.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(u64);

impl CredentialId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        CredentialId(id)
    }

    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl PartialEq for CredentialId {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_be_bytes().ct_eq(&other.0.to_be_bytes()).into()
    }
}

impl std::hash::Hash for CredentialId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Parses the hexadecimal form printed by `Display`, with or without `0x`.
impl std::str::FromStr for CredentialId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = strip_hex_prefix(s.trim());
        u64::from_str_radix(digits, 16)
            .map(CredentialId)
            .map_err(|e| Error::InvalidCredential(format!("'{s}': {e}")))
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Ordered permission level of a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PermissionLevel {
    None = 0,
    Standard = 1,
    Privileged = 2,
}

impl PermissionLevel {
    /// Create a permission level from its stored code.
    ///
    /// # Errors
    /// Returns `Error::InvalidPermissionLevel` for codes other than 0, 1 or 2.
    pub fn from_u8(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PermissionLevel::None),
            1 => Ok(PermissionLevel::Standard),
            2 => Ok(PermissionLevel::Privileged),
            _ => Err(Error::InvalidPermissionLevel { code }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` if this level may open the door.
    #[inline]
    #[must_use]
    pub fn can_enter(self) -> bool {
        self >= PermissionLevel::Standard
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PermissionLevel::None => write!(f, "None"),
            PermissionLevel::Standard => write!(f, "Standard"),
            PermissionLevel::Privileged => write!(f, "Privileged"),
        }
    }
}

/// A PIN of 1 to [`MAX_PIN_LENGTH`] decimal digits.
///
/// # Security
/// Comparison pads both sides to the maximum length and compares every byte,
/// so the time taken does not depend on how many leading digits matched.
/// `Debug` never prints the digits.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Create a PIN from a string of ASCII digits.
    ///
    /// # Errors
    /// Returns `Error::InvalidPin` if the string is empty, longer than
    /// [`MAX_PIN_LENGTH`] or contains anything but `0`-`9`.
    pub fn new(digits: &str) -> Result<Self> {
        let len = digits.len();
        if !(1..=MAX_PIN_LENGTH).contains(&len) {
            return Err(Error::InvalidPin(format!(
                "PIN must be 1-{MAX_PIN_LENGTH} digits, got {len}"
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPin("PIN must contain only digits".to_string()));
        }
        Ok(Pin(digits.to_string()))
    }

    /// Create a PIN from numeric digit values (0-9).
    ///
    /// # Errors
    /// Same conditions as [`Pin::new`].
    pub fn from_digits(digits: &[u8]) -> Result<Self> {
        if let Some(bad) = digits.iter().find(|d| **d > 9) {
            return Err(Error::InvalidPin(format!("digit out of range: {bad}")));
        }
        let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        Pin::new(&text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The digits as ASCII, zero-padded to [`MAX_PIN_LENGTH`].
    #[must_use]
    pub fn padded(&self) -> [u8; MAX_PIN_LENGTH] {
        let mut out = [0u8; MAX_PIN_LENGTH];
        out[..self.0.len()].copy_from_slice(self.0.as_bytes());
        out
    }

    /// Constant-structure comparison against another PIN.
    #[must_use]
    pub fn ct_matches(&self, other: &Pin) -> bool {
        let same_len = (self.0.len() as u8).ct_eq(&(other.0.len() as u8));
        let same_digits = self.padded().ct_eq(&other.padded());
        (same_len & same_digits).into()
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.ct_matches(other)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pin({} digits)", self.0.len())
    }
}

impl TryFrom<String> for Pin {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Pin::new(&value)
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

impl std::str::FromStr for Pin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pin::new(s.trim())
    }
}

/// A key pressed on a reader's keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypadKey {
    /// Numeric digit (0-9).
    Digit(u8),
    /// Star key (*).
    Star,
    /// Hash/pound key (#).
    Hash,
}

impl KeypadKey {
    /// Create a digit key.
    ///
    /// # Errors
    /// Returns `Error::InvalidKey` if the digit is greater than 9.
    pub fn digit(d: u8) -> Result<Self> {
        if d > 9 {
            return Err(Error::InvalidKey(format!("digit must be 0-9, got {d}")));
        }
        Ok(KeypadKey::Digit(d))
    }

    /// Decode the 4-bit code sent by Wiegand keypads (0-9, 10 = `*`, 11 = `#`).
    ///
    /// # Errors
    /// Returns `Error::InvalidKey` for codes 12-15 and anything wider.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0..=9 => Ok(KeypadKey::Digit(code)),
            10 => Ok(KeypadKey::Star),
            11 => Ok(KeypadKey::Hash),
            _ => Err(Error::InvalidKey(format!("unknown key code {code}"))),
        }
    }

    #[must_use]
    pub fn to_code(self) -> u8 {
        match self {
            KeypadKey::Digit(d) => d,
            KeypadKey::Star => 10,
            KeypadKey::Hash => 11,
        }
    }

    #[must_use]
    pub fn as_digit(self) -> Option<u8> {
        match self {
            KeypadKey::Digit(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for KeypadKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeypadKey::Digit(d) => write!(f, "{d}"),
            KeypadKey::Star => write!(f, "*"),
            KeypadKey::Hash => write!(f, "#"),
        }
    }
}

impl std::str::FromStr for KeypadKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "*" => Ok(KeypadKey::Star),
            "#" => Ok(KeypadKey::Hash),
            other => other
                .parse::<u8>()
                .map_err(|_| Error::InvalidKey(format!("'{other}'")))
                .and_then(KeypadKey::digit),
        }
    }
}

/// Which physical reader produced an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderIndex {
    Primary,
    Secondary,
}

impl ReaderIndex {
    /// All readers, in polling order.
    pub const ALL: [ReaderIndex; 2] = [ReaderIndex::Primary, ReaderIndex::Secondary];

    /// Create from the 1-based number printed on the board.
    ///
    /// # Errors
    /// Returns `Error::InvalidReader` for anything but 1 or 2.
    pub fn from_number(number: u8) -> Result<Self> {
        match number {
            1 => Ok(ReaderIndex::Primary),
            2 => Ok(ReaderIndex::Secondary),
            _ => Err(Error::InvalidReader { number }),
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            ReaderIndex::Primary => 1,
            ReaderIndex::Secondary => 2,
        }
    }
}

impl fmt::Display for ReaderIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "reader {}", self.number())
    }
}

/// One physical scan as delivered by a reader port.
///
/// `raw` holds one element per received bit (0 or 1), most significant bit
/// first, exactly as clocked in on the D0/D1 lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEvent {
    pub raw: Vec<u8>,
    pub reader: ReaderIndex,
    pub timestamp: Tick,
}

impl CredentialEvent {
    #[must_use]
    pub fn new(raw: Vec<u8>, reader: ReaderIndex, timestamp: Tick) -> Self {
        Self {
            raw,
            reader,
            timestamp,
        }
    }
}

/// Latest reading of the intrusion sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSample {
    pub value: u16,
    pub tick: Tick,
}

impl SensorSample {
    /// Create a sample, rejecting values the analog front end cannot produce.
    ///
    /// # Errors
    /// Returns `Error::SensorOutOfRange` if `value` exceeds [`SENSOR_MAX`].
    pub fn new(value: u16, tick: Tick) -> Result<Self> {
        if value > SENSOR_MAX {
            return Err(Error::SensorOutOfRange {
                value,
                max: SENSOR_MAX,
            });
        }
        Ok(Self { value, tick })
    }

    /// Absolute difference to an earlier sample.
    #[must_use]
    pub fn delta(&self, previous: &SensorSample) -> u16 {
        self.value.abs_diff(previous.value)
    }
}

/// Process-wide door state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    /// Lock engaged, waiting for a grant.
    #[default]
    Locked,
    /// Lock released until the hold timer expires.
    UnlockedTimed,
    /// Intrusion detected; only a privileged clear leaves this state.
    AlarmLatched,
}

impl DoorState {
    #[must_use]
    pub fn is_latched(self) -> bool {
        matches!(self, DoorState::AlarmLatched)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DoorState::Locked => write!(f, "Locked"),
            DoorState::UnlockedTimed => write!(f, "UnlockedTimed"),
            DoorState::AlarmLatched => write!(f, "AlarmLatched"),
        }
    }
}

/// The privileged console password.
///
/// # Security
/// Verification is constant-time and `Debug` redacts the value.
#[derive(Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegedPassword(u32);

impl PrivilegedPassword {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        PrivilegedPassword(value)
    }

    /// Compare a candidate against the configured password.
    #[must_use]
    pub fn verify(&self, candidate: u32) -> bool {
        self.0.to_be_bytes().ct_eq(&candidate.to_be_bytes()).into()
    }
}

impl PartialEq for PrivilegedPassword {
    fn eq(&self, other: &Self) -> bool {
        self.verify(other.0)
    }
}

impl fmt::Debug for PrivilegedPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PrivilegedPassword(****)")
    }
}

/// Parses the hexadecimal form typed at the console (`31337` or `0x31337`).
impl std::str::FromStr for PrivilegedPassword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = strip_hex_prefix(s.trim());
        u32::from_str_radix(digits, 16)
            .map(PrivilegedPassword)
            .map_err(|_| Error::InvalidPassword("expected a hexadecimal value".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_tick_arithmetic_saturates() {
        let t = Tick::new(100);
        assert_eq!(t.since(Tick::new(40)), 60);
        assert_eq!(t.since(Tick::new(400)), 0);
        assert_eq!(Tick::new(u64::MAX).after(10), Tick::new(u64::MAX));
    }

    #[rstest]
    #[case("A1B2C3", 0xA1B2C3)]
    #[case("0xa1b2c3", 0xA1B2C3)]
    #[case("  ff ", 0xFF)]
    fn test_credential_id_parse(#[case] input: &str, #[case] expected: u64) {
        let id: CredentialId = input.parse().unwrap();
        assert_eq!(id.as_u64(), expected);
    }

    #[test]
    fn test_credential_id_display_roundtrips() {
        let id = CredentialId::new(0x00C0FFEE);
        assert_eq!(id.to_string(), "C0FFEE");
        assert_eq!(id.to_string().parse::<CredentialId>().unwrap(), id);
    }

    #[test]
    fn test_credential_id_invalid() {
        assert!("xyz".parse::<CredentialId>().is_err());
    }

    #[test]
    fn test_permission_level_ordering() {
        assert!(PermissionLevel::Privileged > PermissionLevel::Standard);
        assert!(PermissionLevel::Standard > PermissionLevel::None);
        assert!(!PermissionLevel::None.can_enter());
        assert!(PermissionLevel::Standard.can_enter());
        assert!(PermissionLevel::from_u8(3).is_err());
        assert_eq!(PermissionLevel::from_u8(2).unwrap(), PermissionLevel::Privileged);
    }

    #[rstest]
    #[case("1234")]
    #[case("0")]
    #[case("87654321")]
    fn test_pin_valid(#[case] input: &str) {
        assert_eq!(Pin::new(input).unwrap().as_str(), input);
    }

    #[rstest]
    #[case("")]
    #[case("123456789")]
    #[case("12a4")]
    fn test_pin_invalid(#[case] input: &str) {
        assert!(Pin::new(input).is_err());
    }

    #[test]
    fn test_pin_from_digits() {
        let pin = Pin::from_digits(&[4, 2, 0]).unwrap();
        assert_eq!(pin.as_str(), "420");
        assert!(Pin::from_digits(&[1, 10]).is_err());
    }

    #[test]
    fn test_pin_debug_is_redacted() {
        let pin = Pin::new("9911").unwrap();
        assert_eq!(format!("{pin:?}"), "Pin(4 digits)");
    }

    #[test]
    fn test_pin_prefix_does_not_match() {
        let stored = Pin::new("1234").unwrap();
        assert!(!stored.ct_matches(&Pin::new("123").unwrap()));
        assert!(!stored.ct_matches(&Pin::new("12340").unwrap()));
        assert!(stored.ct_matches(&Pin::new("1234").unwrap()));
    }

    proptest! {
        #[test]
        fn prop_pin_matches_only_itself(a in "[0-9]{1,8}", b in "[0-9]{1,8}") {
            let pa = Pin::new(&a).unwrap();
            let pb = Pin::new(&b).unwrap();
            prop_assert_eq!(pa.ct_matches(&pb), a == b);
        }
    }

    #[rstest]
    #[case(0, KeypadKey::Digit(0))]
    #[case(9, KeypadKey::Digit(9))]
    #[case(10, KeypadKey::Star)]
    #[case(11, KeypadKey::Hash)]
    fn test_keypad_key_codes(#[case] code: u8, #[case] expected: KeypadKey) {
        let key = KeypadKey::from_code(code).unwrap();
        assert_eq!(key, expected);
        assert_eq!(key.to_code(), code);
    }

    #[test]
    fn test_keypad_key_parse() {
        assert_eq!("#".parse::<KeypadKey>().unwrap(), KeypadKey::Hash);
        assert_eq!("7".parse::<KeypadKey>().unwrap(), KeypadKey::Digit(7));
        assert!("12".parse::<KeypadKey>().is_err());
        assert!(KeypadKey::from_code(12).is_err());
    }

    #[test]
    fn test_reader_index() {
        assert_eq!(ReaderIndex::from_number(1).unwrap(), ReaderIndex::Primary);
        assert_eq!(ReaderIndex::Secondary.number(), 2);
        assert!(ReaderIndex::from_number(0).is_err());
        assert_eq!(ReaderIndex::Secondary.to_string(), "reader 2");
    }

    #[test]
    fn test_sensor_sample_bounds() {
        assert!(SensorSample::new(1023, Tick::ZERO).is_ok());
        assert!(SensorSample::new(1024, Tick::ZERO).is_err());
        let a = SensorSample::new(300, Tick::ZERO).unwrap();
        let b = SensorSample::new(180, Tick::new(1)).unwrap();
        assert_eq!(b.delta(&a), 120);
        assert_eq!(a.delta(&b), 120);
    }

    #[test]
    fn test_privileged_password() {
        let pw: PrivilegedPassword = "0x31337".parse().unwrap();
        assert!(pw.verify(0x31337));
        assert!(!pw.verify(0x31338));
        assert_eq!(format!("{pw:?}"), "PrivilegedPassword(****)");
        assert!("hunter2".parse::<PrivilegedPassword>().is_err());
    }

    #[test]
    fn test_door_state_default_and_serde() {
        assert_eq!(DoorState::default(), DoorState::Locked);
        let json = serde_json::to_string(&DoorState::AlarmLatched).unwrap();
        assert_eq!(json, "\"alarm_latched\"");
    }
}

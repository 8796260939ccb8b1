//! Keypad buffer and inactivity timeout.

use tracing::{debug, trace, warn};
use warden_core::{ControllerConfig, KeypadKey, Pin, Tick};

/// Digits entered so far and when the last key arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeypadBuffer {
    digits: Vec<u8>,
    last_input: Tick,
}

impl KeypadBuffer {
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn last_input(&self) -> Tick {
        self.last_input
    }

    fn clear(&mut self) {
        self.digits.clear();
    }
}

/// Result of a single key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadEvent {
    /// Digit appended.
    Accepted,
    /// Key had no effect on the buffer (full buffer, or terminator on an
    /// empty buffer).
    Ignored,
    /// The clear key emptied the buffer.
    Cleared,
    /// Terminator pressed; the accumulated PIN is handed over and the buffer
    /// is empty again.
    Submitted(Pin),
}

/// Surfaced when the buffer was discarded for inactivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTimedOut {
    /// Number of digits that were thrown away.
    pub discarded: usize,
    /// Tick of the last key press before the timeout.
    pub last_input: Tick,
}

/// Accumulates PIN digits with an inactivity timeout.
///
/// The buffer never holds more than `max_len` digits and is emptied once
/// `now - last_input` exceeds `timeout_ticks`.
#[derive(Debug, Clone)]
pub struct KeypadInputAdapter {
    buffer: KeypadBuffer,
    max_len: usize,
    timeout_ticks: u64,
    terminator: KeypadKey,
}

impl KeypadInputAdapter {
    pub fn new(max_len: usize, timeout_ticks: u64, terminator: KeypadKey) -> Self {
        Self {
            buffer: KeypadBuffer::default(),
            max_len,
            timeout_ticks,
            terminator,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            config.max_pin_length,
            config.keypad_timeout_ticks,
            config.pin_terminator,
        )
    }

    /// Handle one key press at `now`.
    ///
    /// Every press refreshes the inactivity clock, including ignored ones.
    pub fn press(&mut self, key: KeypadKey, now: Tick) -> KeypadEvent {
        self.buffer.last_input = now;

        match key {
            key if key == self.terminator => self.submit(),
            KeypadKey::Digit(d) => {
                if self.buffer.len() >= self.max_len {
                    trace!(max_len = self.max_len, "Keypad buffer full, digit ignored");
                    return KeypadEvent::Ignored;
                }
                self.buffer.digits.push(d);
                KeypadEvent::Accepted
            }
            _ => {
                trace!(discarded = self.buffer.len(), "Keypad buffer cleared");
                self.buffer.clear();
                KeypadEvent::Cleared
            }
        }
    }

    fn submit(&mut self) -> KeypadEvent {
        if self.buffer.is_empty() {
            return KeypadEvent::Ignored;
        }
        let digits = std::mem::take(&mut self.buffer.digits);
        match Pin::from_digits(&digits) {
            Ok(pin) => {
                debug!(digits = pin.len(), "PIN submitted");
                KeypadEvent::Submitted(pin)
            }
            Err(e) => {
                warn!(error = %e, "Discarding unusable keypad entry");
                KeypadEvent::Cleared
            }
        }
    }

    /// Housekeeping for one tick: discard a stale buffer.
    ///
    /// An empty buffer never times out.
    pub fn poll_timeout(&mut self, now: Tick) -> Option<InputTimedOut> {
        if self.buffer.is_empty() || now.since(self.buffer.last_input) <= self.timeout_ticks {
            return None;
        }
        let timed_out = InputTimedOut {
            discarded: self.buffer.len(),
            last_input: self.buffer.last_input,
        };
        debug!(
            discarded = timed_out.discarded,
            last_input = %timed_out.last_input,
            "Keypad input timed out"
        );
        self.buffer.clear();
        Some(timed_out)
    }

    /// Drop any buffered digits.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn buffer(&self) -> &KeypadBuffer {
        &self.buffer
    }

    pub fn terminator(&self) -> KeypadKey {
        self.terminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn keypad() -> KeypadInputAdapter {
        KeypadInputAdapter::new(4, 100, KeypadKey::Hash)
    }

    fn type_digits(keypad: &mut KeypadInputAdapter, digits: &[u8], at: u64) {
        for d in digits {
            assert_eq!(
                keypad.press(KeypadKey::Digit(*d), Tick::new(at)),
                KeypadEvent::Accepted
            );
        }
    }

    #[test]
    fn test_submit_clears_buffer() {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[1, 2, 3, 4], 0);
        assert_eq!(
            keypad.press(KeypadKey::Hash, Tick::new(1)),
            KeypadEvent::Submitted(Pin::new("1234").unwrap())
        );
        assert!(keypad.buffer().is_empty());
    }

    #[test]
    fn test_buffer_never_exceeds_max_len() {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[1, 2, 3, 4], 0);
        assert_eq!(
            keypad.press(KeypadKey::Digit(5), Tick::new(1)),
            KeypadEvent::Ignored
        );
        assert_eq!(keypad.buffer().len(), 4);
    }

    #[test]
    fn test_star_clears() {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[9, 9], 0);
        assert_eq!(keypad.press(KeypadKey::Star, Tick::new(1)), KeypadEvent::Cleared);
        assert!(keypad.buffer().is_empty());
    }

    #[test]
    fn test_star_terminator_makes_hash_clear() {
        let mut keypad = KeypadInputAdapter::new(4, 100, KeypadKey::Star);
        type_digits(&mut keypad, &[7], 0);
        assert_eq!(keypad.press(KeypadKey::Hash, Tick::new(1)), KeypadEvent::Cleared);
        type_digits(&mut keypad, &[7], 2);
        assert!(matches!(
            keypad.press(KeypadKey::Star, Tick::new(3)),
            KeypadEvent::Submitted(_)
        ));
    }

    #[test]
    fn test_terminator_on_empty_buffer_ignored() {
        let mut keypad = keypad();
        assert_eq!(keypad.press(KeypadKey::Hash, Tick::new(5)), KeypadEvent::Ignored);
    }

    #[rstest]
    #[case(100, None)]
    #[case(101, Some(2))]
    fn test_timeout_boundary(#[case] now: u64, #[case] discarded: Option<usize>) {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[1, 2], 0);
        let timed_out = keypad.poll_timeout(Tick::new(now));
        assert_eq!(timed_out.map(|t| t.discarded), discarded);
        assert_eq!(keypad.buffer().is_empty(), discarded.is_some());
    }

    #[test]
    fn test_empty_buffer_never_times_out() {
        let mut keypad = keypad();
        assert!(keypad.poll_timeout(Tick::new(10_000)).is_none());
    }

    #[test]
    fn test_terminator_wins_over_timeout_in_same_tick() {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[3, 1], 0);
        assert_eq!(
            keypad.press(KeypadKey::Hash, Tick::new(101)),
            KeypadEvent::Submitted(Pin::new("31").unwrap())
        );
        assert!(keypad.poll_timeout(Tick::new(101)).is_none());
    }

    #[test]
    fn test_digit_refreshes_clock_in_same_tick() {
        let mut keypad = keypad();
        type_digits(&mut keypad, &[3], 0);
        assert_eq!(
            keypad.press(KeypadKey::Digit(4), Tick::new(101)),
            KeypadEvent::Accepted
        );
        assert!(keypad.poll_timeout(Tick::new(101)).is_none());
        assert_eq!(keypad.buffer().len(), 2);
    }
}

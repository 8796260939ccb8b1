//! Mock Wiegand reader port.

use crate::{HardwareError, Result, traits::ReaderPort};
use std::sync::mpsc;
use warden_core::KeypadKey;

/// Mock reader port fed through a channel.
///
/// Bursts are queued by the handle and handed out one per
/// [`poll_burst`](ReaderPort::poll_burst), the way the driver layer releases
/// a burst once the data lines go quiet.
///
/// # Examples
///
/// ```
/// use warden_core::KeypadKey;
/// use warden_hardware::mock::MockReader;
/// use warden_hardware::traits::ReaderPort;
///
/// let (mut reader, handle) = MockReader::new("reader 1");
/// handle.press_key(KeypadKey::Digit(5)).unwrap();
/// assert_eq!(reader.poll_burst(), Some(vec![0, 1, 0, 1]));
/// assert_eq!(reader.poll_burst(), None);
/// ```
#[derive(Debug)]
pub struct MockReader {
    name: String,
    burst_rx: mpsc::Receiver<Vec<u8>>,
}

impl MockReader {
    pub fn new(name: impl Into<String>) -> (Self, MockReaderHandle) {
        let (burst_tx, burst_rx) = mpsc::channel();
        let name = name.into();
        (
            Self {
                name: name.clone(),
                burst_rx,
            },
            MockReaderHandle { name, burst_tx },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ReaderPort for MockReader {
    fn poll_burst(&mut self) -> Option<Vec<u8>> {
        self.burst_rx.try_recv().ok()
    }
}

/// Handle for feeding a mock reader.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    name: String,
    burst_tx: mpsc::Sender<Vec<u8>>,
}

impl MockReaderHandle {
    /// Queue a raw burst, one element per bit.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub fn present_bits(&self, bits: Vec<u8>) -> Result<()> {
        self.burst_tx
            .send(bits)
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }

    /// Queue a key press as the 4-bit burst a Wiegand keypad sends.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub fn press_key(&self, key: KeypadKey) -> Result<()> {
        let code = key.to_code();
        let bits = (0..4).rev().map(|shift| (code >> shift) & 1).collect();
        self.present_bits(bits)
    }

    /// Queue several key presses in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub fn type_keys(&self, keys: &[KeypadKey]) -> Result<()> {
        keys.iter().try_for_each(|key| self.press_key(*key))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bursts_delivered_in_order() {
        let (mut reader, handle) = MockReader::new("reader 2");
        handle.present_bits(vec![1, 1, 0]).unwrap();
        handle.press_key(KeypadKey::Hash).unwrap();
        assert_eq!(reader.poll_burst(), Some(vec![1, 1, 0]));
        assert_eq!(reader.poll_burst(), Some(vec![1, 0, 1, 1]));
        assert_eq!(reader.poll_burst(), None);
        assert_eq!(reader.name(), "reader 2");
    }

    #[test]
    fn test_handle_errors_after_reader_dropped() {
        let (reader, handle) = MockReader::new("reader 1");
        drop(reader);
        assert!(handle.press_key(KeypadKey::Star).is_err());
    }
}

//! In-memory EEPROM.

use crate::{HardwareError, Result, traits::NonVolatileMemory};

/// Erased EEPROM cells read back as `0xFF`.
const ERASED: u8 = 0xFF;

/// EEPROM image held in memory, with switchable read/write failures.
///
/// # Examples
///
/// ```
/// use warden_hardware::mock::MemoryEeprom;
/// use warden_hardware::traits::NonVolatileMemory;
///
/// let mut eeprom = MemoryEeprom::new(64);
/// eeprom.write(4, &[1, 2, 3]).unwrap();
///
/// let mut buf = [0u8; 4];
/// eeprom.read(3, &mut buf).unwrap();
/// assert_eq!(buf, [0xFF, 1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    data: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryEeprom {
    /// Create an erased device of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::from_bytes(vec![ERASED; capacity])
    }

    /// Create a device holding the given image.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Make every read fail, as a missing or unresponsive chip would.
    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl NonVolatileMemory for MemoryEeprom {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        if self.fail_reads {
            return Err(HardwareError::read_failed("EEPROM did not acknowledge"));
        }
        HardwareError::check_bounds(offset, buf.len(), self.data.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(HardwareError::write_failed("EEPROM did not acknowledge"));
        }
        HardwareError::check_bounds(offset, data.len(), self.data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

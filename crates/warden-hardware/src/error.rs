//! Error types for hardware operations.
//!
//! These cover the failures the narrow driver interfaces can report: a
//! peripheral that went away, a bus transfer that failed, or an access outside
//! the device's address range.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Reading from the device failed.
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    /// Writing to the device failed.
    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Access outside the device's address range.
    #[error("Access of {len} bytes at offset {offset} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new read failure.
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }

    /// Create a new write failure.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Check an access of `len` bytes at `offset` against `capacity`.
    ///
    /// # Errors
    /// Returns `HardwareError::OutOfBounds` if the access does not fit.
    pub fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(Self::OutOfBounds {
                offset,
                len,
                capacity,
            }),
        }
    }
}

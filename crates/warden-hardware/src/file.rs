//! EEPROM image stored in a host file.
//!
//! Used by the emulator so that enrolled users survive a restart the same way
//! they survive a power cycle on the board.

use crate::{Result, error::HardwareError, traits::NonVolatileMemory};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-backed [`NonVolatileMemory`].
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    file: File,
    capacity: usize,
}

impl FileEeprom {
    /// Open the image at `path`, creating an erased one of `capacity` bytes if
    /// it does not exist. A short image is padded with erased cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, created or extended.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let current = usize::try_from(file.metadata()?.len())
            .map_err(|_| HardwareError::invalid_data("image too large"))?;
        if current < capacity {
            debug!(path = %path.display(), current, capacity, "Padding EEPROM image");
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![0xFF; capacity - current])?;
            file.sync_data()?;
        }

        Ok(Self {
            path,
            file,
            capacity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NonVolatileMemory for FileEeprom {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<()> {
        HardwareError::check_bounds(offset, buf.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        HardwareError::check_bounds(offset, data.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        Ok(())
    }
}

//! User table persisted in non-volatile memory.

use crate::{
    error::{StorageError, StorageResult},
    layout::{self, HEADER_LEN},
    record::UserRecord,
    store::{CredentialStore, UserTable, build_record},
};
use tracing::{debug, info, warn};
use warden_core::{CredentialId, PermissionLevel, Pin, PinStorage, PrivilegedPassword};
use warden_hardware::NonVolatileMemory;

/// Where the table in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
    /// Loaded from a valid image.
    Image,
    /// The device was erased; it was seeded with the static table.
    Blank,
    /// The image could not be read or failed validation; the static table is
    /// in use and the image is left untouched until the next provisioning
    /// change.
    Fallback,
}

/// [`CredentialStore`] backed by a [`NonVolatileMemory`] device.
///
/// Every add or revoke rewrites the full image. A provisioning change that
/// cannot be written is rejected and leaves the in-memory table unchanged.
#[derive(Debug)]
pub struct EepromStore<M: NonVolatileMemory> {
    memory: M,
    table: UserTable,
    password: PrivilegedPassword,
    mode: PinStorage,
    source: StoreSource,
}

impl<M: NonVolatileMemory> EepromStore<M> {
    /// Load the table from `memory`.
    ///
    /// Never fails: a read failure or an invalid image falls back to
    /// `fallback`, the compiled-in table.
    pub fn open(
        mut memory: M,
        fallback: Vec<UserRecord>,
        password: PrivilegedPassword,
        pin_storage: PinStorage,
    ) -> Self {
        let capacity = layout::capacity(memory.capacity());

        let (source, mode, mut records) = match load(&mut memory, capacity) {
            Ok(Some((stored_mode, records))) => {
                info!(records = records.len(), ?stored_mode, "User table loaded");
                (StoreSource::Image, stored_mode, records)
            }
            Ok(None) => {
                info!("EEPROM blank, seeding with static user table");
                (StoreSource::Blank, pin_storage, fallback)
            }
            Err(e) => {
                warn!(error = %e, "EEPROM unreadable, using static user table");
                (StoreSource::Fallback, pin_storage, fallback)
            }
        };

        if records.len() > capacity {
            warn!(
                records = records.len(),
                capacity,
                "Static user table exceeds EEPROM capacity, dropping the excess"
            );
            records.truncate(capacity);
        }

        let mut store = Self {
            memory,
            table: UserTable::with_capacity(records, capacity),
            password,
            mode,
            source,
        };
        store.reconcile_mode(pin_storage);
        store
    }

    /// Bring the image format in line with the configured PIN storage.
    ///
    /// A plaintext image is upgraded to hashed. A hashed image cannot be
    /// turned back into plaintext and stays hashed.
    fn reconcile_mode(&mut self, configured: PinStorage) {
        match (self.mode, configured) {
            (PinStorage::Plaintext, PinStorage::Hashed) => {
                self.table.records_mut().iter_mut().for_each(UserRecord::hash_pin);
                self.mode = PinStorage::Hashed;
                if self.source == StoreSource::Image {
                    info!("Upgrading stored PINs to hashed form");
                    self.write_current();
                }
            }
            (PinStorage::Hashed, PinStorage::Plaintext) => {
                warn!("Stored PINs are hashed; keeping hashed storage");
            }
            (PinStorage::Hashed, PinStorage::Hashed) => {
                // Static table entries arrive with plaintext PINs
                self.table.records_mut().iter_mut().for_each(UserRecord::hash_pin);
            }
            (PinStorage::Plaintext, PinStorage::Plaintext) => {}
        }
        if self.source == StoreSource::Blank {
            self.write_current();
        }
    }

    fn write_current(&mut self) {
        let records = self.table.records().to_vec();
        if let Err(e) = self.persist(&records) {
            warn!(error = %e, "Could not write user table image");
        }
    }

    fn persist(&mut self, records: &[UserRecord]) -> StorageResult<()> {
        let capacity = self.table.capacity();
        if records.len() > capacity {
            return Err(StorageError::Full { capacity });
        }
        let image = layout::encode(records, self.mode)?;
        self.memory.write(0, &image)?;
        debug!(bytes = image.len(), records = records.len(), "User table image written");
        Ok(())
    }

    /// Apply a change to a copy of the table, persist it, then commit.
    fn commit(&mut self, change: impl FnOnce(&mut UserTable) -> StorageResult<()>) -> StorageResult<()> {
        let mut next = self.table.clone();
        change(&mut next)?;
        self.persist(next.records())?;
        self.table = next;
        Ok(())
    }

    pub fn source(&self) -> StoreSource {
        self.source
    }

    /// PIN storage actually used for the image.
    pub fn pin_storage(&self) -> PinStorage {
        self.mode
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn into_memory(self) -> M {
        self.memory
    }
}

fn load<M: NonVolatileMemory>(
    memory: &mut M,
    capacity: usize,
) -> StorageResult<Option<(PinStorage, Vec<UserRecord>)>> {
    let mut raw_header = [0u8; HEADER_LEN];
    memory.read(0, &mut raw_header)?;

    let Some(header) = layout::decode_header(&raw_header, capacity)? else {
        return Ok(None);
    };
    let mut body = vec![0u8; header.body_len()];
    memory.read(HEADER_LEN, &mut body)?;
    let records = layout::decode_records(&header, &body)?;
    Ok(Some((header.mode, records)))
}

impl<M: NonVolatileMemory> CredentialStore for EepromStore<M> {
    fn lookup(&self, credential: CredentialId) -> Option<UserRecord> {
        self.table.find(credential).cloned()
    }

    fn verify_privileged_password(&self, candidate: &PrivilegedPassword) -> bool {
        self.password == *candidate
    }

    fn add(
        &mut self,
        credential: CredentialId,
        level: PermissionLevel,
        pin: Option<Pin>,
    ) -> StorageResult<()> {
        let record = build_record(self.mode, credential, level, pin);
        self.commit(|table| table.upsert(record))?;
        info!(%credential, %level, "User added");
        Ok(())
    }

    fn revoke(&mut self, credential: CredentialId) -> StorageResult<()> {
        self.commit(|table| table.deactivate(credential))?;
        info!(%credential, "User revoked");
        Ok(())
    }

    fn records(&self) -> &[UserRecord] {
        self.table.records()
    }
}

//! The credential store interface and the in-memory user table.

use crate::{
    error::{StorageError, StorageResult},
    record::{PinSecret, UserRecord},
};
use tracing::{debug, info};
use warden_core::{
    CredentialId, PermissionLevel, Pin, PinStorage, PrivilegedPassword, constants::MAX_USERS,
};

/// Lookup and provisioning interface the decision engine runs against.
pub trait CredentialStore {
    /// Find the record for a credential, active or not.
    fn lookup(&self, credential: CredentialId) -> Option<UserRecord>;

    /// Check a PIN against a user's stored secret.
    ///
    /// The comparison does the same work however many leading digits match.
    fn verify_pin(&self, user: &UserRecord, pin: &Pin) -> bool {
        user.verify_pin(pin)
    }

    /// Compare a candidate against the configured privileged password.
    fn verify_privileged_password(&self, candidate: &PrivilegedPassword) -> bool;

    /// Add a user, or replace the record of an existing credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is full or the change could not be
    /// persisted. The table is unchanged on error.
    fn add(
        &mut self,
        credential: CredentialId,
        level: PermissionLevel,
        pin: Option<Pin>,
    ) -> StorageResult<()>;

    /// Deactivate a user. The record stays so that later scans report an
    /// inactive credential rather than an unknown one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown credential, or an error
    /// if the change could not be persisted.
    fn revoke(&mut self, credential: CredentialId) -> StorageResult<()>;

    /// All records, in provisioning order.
    fn records(&self) -> &[UserRecord];
}

/// Ordered, bounded list of user records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTable {
    records: Vec<UserRecord>,
    capacity: usize,
}

impl UserTable {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self::with_capacity(records, MAX_USERS)
    }

    pub fn with_capacity(records: Vec<UserRecord>, capacity: usize) -> Self {
        Self { records, capacity }
    }

    /// Scan the whole table. Every record is compared so the scan takes the
    /// same time wherever (and whether) the credential is found.
    pub fn find(&self, credential: CredentialId) -> Option<&UserRecord> {
        self.records.iter().fold(None::<&UserRecord>, |found, record| {
            let hit = record.credential == credential;
            found.or(hit.then_some(record))
        })
    }

    /// Insert or replace the record for `record.credential`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Full` when inserting into a full table.
    pub fn upsert(&mut self, record: UserRecord) -> StorageResult<()> {
        let full = self.records.len() >= self.capacity;
        match self
            .records
            .iter_mut()
            .find(|r| r.credential == record.credential)
        {
            Some(existing) => *existing = record,
            None if full => {
                return Err(StorageError::Full {
                    capacity: self.capacity,
                });
            }
            None => self.records.push(record),
        }
        Ok(())
    }

    /// Mark a credential inactive.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown credential.
    pub fn deactivate(&mut self, credential: CredentialId) -> StorageResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.credential == credential)
            .ok_or(StorageError::NotFound { credential })?;
        record.active = false;
        Ok(())
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [UserRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// User table held in RAM only.
///
/// Provisioning changes last until restart.
#[derive(Debug, Clone)]
pub struct StaticStore {
    table: UserTable,
    password: PrivilegedPassword,
    pin_storage: PinStorage,
}

impl StaticStore {
    pub fn new(records: Vec<UserRecord>, password: PrivilegedPassword) -> Self {
        Self {
            table: UserTable::new(records),
            password,
            pin_storage: PinStorage::Plaintext,
        }
    }

    /// Hold PINs added later in the given form.
    #[must_use]
    pub fn with_pin_storage(mut self, pin_storage: PinStorage) -> Self {
        self.pin_storage = pin_storage;
        self
    }
}

impl CredentialStore for StaticStore {
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
        let record = build_record(self.pin_storage, credential, level, pin);
        self.table.upsert(record)?;
        info!(%credential, %level, "User added");
        Ok(())
    }

    fn revoke(&mut self, credential: CredentialId) -> StorageResult<()> {
        self.table.deactivate(credential)?;
        info!(%credential, "User revoked");
        Ok(())
    }

    fn records(&self) -> &[UserRecord] {
        self.table.records()
    }
}

pub(crate) fn build_record(
    pin_storage: PinStorage,
    credential: CredentialId,
    level: PermissionLevel,
    pin: Option<Pin>,
) -> UserRecord {
    let record = UserRecord::new(credential, level);
    match pin {
        Some(pin) => {
            debug!(%credential, ?pin_storage, "Storing PIN");
            record.with_secret(PinSecret::for_storage(pin_storage, credential, pin))
        }
        None => record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StaticStore {
        StaticStore::new(
            vec![
                UserRecord::new(CredentialId::new(0xA1), PermissionLevel::Standard),
                UserRecord::new(CredentialId::new(0xB2), PermissionLevel::Privileged)
                    .with_pin(Pin::new("1357").unwrap()),
            ],
            PrivilegedPassword::new(0x31337),
        )
    }

    #[test]
    fn test_lookup() {
        let store = store();
        assert_eq!(
            store.lookup(CredentialId::new(0xA1)).map(|u| u.level),
            Some(PermissionLevel::Standard)
        );
        assert!(store.lookup(CredentialId::new(0xFFFF)).is_none());
    }

    #[test]
    fn test_verify_privileged_password() {
        let store = store();
        assert!(store.verify_privileged_password(&PrivilegedPassword::new(0x31337)));
        assert!(!store.verify_privileged_password(&PrivilegedPassword::new(0x31336)));
    }

    #[test]
    fn test_add_replaces_existing() {
        let mut store = store();
        store
            .add(CredentialId::new(0xA1), PermissionLevel::None, None)
            .unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(
            store.lookup(CredentialId::new(0xA1)).map(|u| u.level),
            Some(PermissionLevel::None)
        );
    }

    #[test]
    fn test_add_hashes_when_configured() {
        let mut store = store().with_pin_storage(PinStorage::Hashed);
        let pin = Pin::new("2020").unwrap();
        store
            .add(CredentialId::new(0xC3), PermissionLevel::Standard, Some(pin.clone()))
            .unwrap();
        let user = store.lookup(CredentialId::new(0xC3)).unwrap();
        assert!(user.pin.as_ref().is_some_and(|p| p.is_hashed()));
        assert!(store.verify_pin(&user, &pin));
    }

    #[test]
    fn test_revoke_keeps_record_inactive() {
        let mut store = store();
        store.revoke(CredentialId::new(0xB2)).unwrap();
        assert_eq!(
            store.lookup(CredentialId::new(0xB2)).map(|u| u.active),
            Some(false)
        );
        assert!(matches!(
            store.revoke(CredentialId::new(0x99)),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_table_capacity() {
        let mut table = UserTable::with_capacity(Vec::new(), 1);
        table
            .upsert(UserRecord::new(CredentialId::new(1), PermissionLevel::Standard))
            .unwrap();
        assert!(matches!(
            table.upsert(UserRecord::new(CredentialId::new(2), PermissionLevel::Standard)),
            Err(StorageError::Full { capacity: 1 })
        ));
        // replacing still works when full
        table
            .upsert(UserRecord::new(CredentialId::new(1), PermissionLevel::None))
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_find_returns_first_match() {
        let table = UserTable::new(vec![
            UserRecord::new(CredentialId::new(5), PermissionLevel::Standard),
            UserRecord::new(CredentialId::new(5), PermissionLevel::None),
        ]);
        assert_eq!(
            table.find(CredentialId::new(5)).map(|u| u.level),
            Some(PermissionLevel::Standard)
        );
    }
}

//! User records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use warden_core::{CredentialId, PermissionLevel, Pin, PinStorage};

/// Length of a stored PIN digest.
pub const PIN_HASH_LEN: usize = 12;

/// How a user's PIN is held.
///
/// Hashed PINs are the first [`PIN_HASH_LEN`] bytes of
/// SHA-256(credential id, big-endian ‖ PIN digits as ASCII), so equal PINs on
/// different cards do not produce equal digests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinSecret {
    Plain(Pin),
    Hashed([u8; PIN_HASH_LEN]),
}

impl PinSecret {
    /// Hash `pin` for the given credential.
    #[must_use]
    pub fn hashed(credential: CredentialId, pin: &Pin) -> Self {
        PinSecret::Hashed(digest(credential, pin))
    }

    /// Store `pin` the way `storage` asks for.
    #[must_use]
    pub fn for_storage(storage: PinStorage, credential: CredentialId, pin: Pin) -> Self {
        match storage {
            PinStorage::Plaintext => PinSecret::Plain(pin),
            PinStorage::Hashed => PinSecret::hashed(credential, &pin),
        }
    }

    /// Constant-structure check of a candidate PIN.
    #[must_use]
    pub fn matches(&self, credential: CredentialId, candidate: &Pin) -> bool {
        match self {
            PinSecret::Plain(pin) => pin.ct_matches(candidate),
            PinSecret::Hashed(stored) => digest(credential, candidate).ct_eq(stored).into(),
        }
    }

    #[must_use]
    pub fn is_hashed(&self) -> bool {
        matches!(self, PinSecret::Hashed(_))
    }
}

impl fmt::Debug for PinSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PinSecret::Plain(pin) => write!(f, "Plain({pin:?})"),
            PinSecret::Hashed(_) => write!(f, "Hashed(****)"),
        }
    }
}

fn digest(credential: CredentialId, pin: &Pin) -> [u8; PIN_HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_u64().to_be_bytes());
    hasher.update(pin.as_str().as_bytes());
    let full = hasher.finalize();

    let mut out = [0u8; PIN_HASH_LEN];
    out.copy_from_slice(&full[..PIN_HASH_LEN]);
    out
}

/// One authorized user.
///
/// # Examples
///
/// ```
/// use warden_core::{CredentialId, PermissionLevel, Pin};
/// use warden_storage::UserRecord;
///
/// let user = UserRecord::new(CredentialId::new(0xC0FFEE), PermissionLevel::Privileged)
///     .with_pin(Pin::new("2468").unwrap());
///
/// assert!(user.requires_pin());
/// assert!(user.verify_pin(&Pin::new("2468").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub credential: CredentialId,
    #[serde(default)]
    pub pin: Option<PinSecret>,
    pub level: PermissionLevel,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

impl UserRecord {
    /// Create an active record without a PIN.
    #[must_use]
    pub fn new(credential: CredentialId, level: PermissionLevel) -> Self {
        Self {
            credential,
            pin: None,
            level,
            active: true,
        }
    }

    /// Require `pin` (held in plaintext) after the scan.
    #[must_use]
    pub fn with_pin(mut self, pin: Pin) -> Self {
        self.pin = Some(PinSecret::Plain(pin));
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: PinSecret) -> Self {
        self.pin = Some(secret);
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn requires_pin(&self) -> bool {
        self.pin.is_some()
    }

    /// Check a candidate PIN. A record without a PIN matches nothing.
    pub fn verify_pin(&self, candidate: &Pin) -> bool {
        self.pin
            .as_ref()
            .is_some_and(|secret| secret.matches(self.credential, candidate))
    }

    /// Re-encode a plaintext PIN as a digest.
    pub(crate) fn hash_pin(&mut self) {
        if let Some(PinSecret::Plain(pin)) = &self.pin {
            self.pin = Some(PinSecret::hashed(self.credential, pin));
        }
    }
}

//! Authorized-user storage for the warden access controller.
//!
//! The decision engine only sees the [`CredentialStore`] trait. Two
//! implementations exist:
//!
//! - [`StaticStore`]: the compiled-in (or config-file) user table held in RAM
//! - [`EepromStore`]: the same table persisted in non-volatile memory using the
//!   image format described in [`layout`], falling back to a static table when
//!   the image cannot be read at startup
//!
//! # Example
//!
//! ```
//! use warden_core::{CredentialId, PermissionLevel, Pin, PrivilegedPassword};
//! use warden_storage::{CredentialStore, StaticStore, UserRecord};
//!
//! let store = StaticStore::new(
//!     vec![UserRecord::new(CredentialId::new(0x1234), PermissionLevel::Standard)
//!         .with_pin(Pin::new("4321").unwrap())],
//!     PrivilegedPassword::new(0x31337),
//! );
//!
//! let user = store.lookup(CredentialId::new(0x1234)).unwrap();
//! assert!(store.verify_pin(&user, &Pin::new("4321").unwrap()));
//! assert!(!store.verify_pin(&user, &Pin::new("4322").unwrap()));
//! ```

pub mod eeprom;
pub mod error;
pub mod layout;
pub mod record;
pub mod store;

pub use eeprom::{EepromStore, StoreSource};
pub use error::{StorageError, StorageResult};
pub use record::{PinSecret, UserRecord};
pub use store::{CredentialStore, StaticStore, UserTable};

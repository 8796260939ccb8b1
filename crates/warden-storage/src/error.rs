use thiserror::Error;
use warden_core::CredentialId;
use warden_hardware::HardwareError;

/// Storage-specific error types for the user table.
///
/// A Deny is never a storage error; these cover provisioning changes that
/// could not be applied and images that could not be read back.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The non-volatile memory rejected a transfer
    #[error("Memory error: {0}")]
    Memory(#[from] HardwareError),

    /// The stored image failed a structural or checksum check
    #[error("Corrupt image: {0}")]
    Corrupt(String),

    /// No room for another record
    #[error("User table full ({capacity} records)")]
    Full { capacity: usize },

    /// Credential not present in the table
    #[error("Credential not found: {credential}")]
    NotFound { credential: CredentialId },

    /// Record cannot be represented in the configured image format
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

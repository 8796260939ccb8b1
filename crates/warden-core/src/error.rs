use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Credential errors
    #[error("Malformed credential: {message}")]
    MalformedCredential { message: String },

    #[error("Invalid credential identifier: {0}")]
    InvalidCredential(String),

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Invalid keypad key: {0}")]
    InvalidKey(String),

    #[error("Invalid permission level code: {code}")]
    InvalidPermissionLevel { code: u8 },

    #[error("Invalid reader number: {number}")]
    InvalidReader { number: u8 },

    #[error("Invalid privileged password: {0}")]
    InvalidPassword(String),

    // Sensor errors
    #[error("Sensor value {value} exceeds maximum {max}")]
    SensorOutOfRange { value: u16, max: u16 },

    // Configuration errors
    #[error("Configuration error in `{field}`: {message}")]
    Config { field: &'static str, message: String },
}

impl Error {
    /// Create a malformed credential error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCredential {
            message: message.into(),
        }
    }

    /// Create a configuration error for the given field.
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

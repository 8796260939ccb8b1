use crate::phase::EnginePhase;
use thiserror::Error;
use warden_hardware::HardwareError;
use warden_storage::StorageError;

/// Errors surfaced by the controller.
///
/// None of these stop the scheduler loop; they end up as console replies or
/// log records.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Core(#[from] warden_core::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: EnginePhase, to: EnginePhase },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument for '{command}': {message}")]
    InvalidArgument {
        command: &'static str,
        message: String,
    },
}

impl ControllerError {
    pub fn invalid_argument(command: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            command,
            message: message.into(),
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;

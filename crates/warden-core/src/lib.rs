//! Shared vocabulary for the warden access controller.
//!
//! Every other crate in the workspace speaks in the types defined here:
//! ticks, credential identifiers, PINs, keypad keys, door states and the
//! validated [`ControllerConfig`](config::ControllerConfig) built once at
//! start-up and handed to each component constructor.

pub mod board;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use board::{BoardVariant, IoLine, WiringMap};
pub use config::{CardFormat, ControllerConfig, NightlyRelock, PinStorage};
pub use diagnostics::DiagnosticVerbosity;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

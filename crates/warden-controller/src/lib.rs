//! Access control core.
//!
//! Ties the adapters together behind a single tick-driven [`Controller`]:
//!
//! - [`engine`]: credential, PIN and privileged password decisions
//! - [`door`]: lock relay, siren and the hold timer
//! - [`alarm`]: intrusion detection on the analog sensor
//! - [`console`]: privileged console commands
//! - [`scheduler`]: the cooperative loop that polls everything once per tick
//!
//! The [`DoorState`](warden_core::DoorState) lives in the [`Controller`] and
//! is only ever lent to the door actuator and the alarm monitor from inside
//! [`Controller::tick`].

pub mod alarm;
pub mod console;
pub mod decision;
pub mod door;
pub mod engine;
pub mod error;
pub mod phase;
pub mod scheduler;

pub use alarm::{AlarmEvent, AlarmMonitor};
pub use console::{ConsoleCommand, ConsoleReply, StatusReport, UserSummary};
pub use decision::{AccessDecision, DecisionReason, Outcome};
pub use door::{DoorActuator, GrantOutcome};
pub use engine::{AccessDecisionEngine, Evaluation, PendingPin, PrivilegedOutcome};
pub use error::{ControllerError, ControllerResult};
pub use phase::{EnginePhase, PhaseTracker, PhaseTransition};
pub use scheduler::{Controller, KeypadTimeout, Peripherals, TickReport};

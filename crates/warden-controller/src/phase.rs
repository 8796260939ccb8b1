//! Decision engine phases.
//!
//! The engine moves through three phases:
//! - `Idle`: no evaluation in progress
//! - `AwaitingPin`: a known credential was presented on a reader with a
//!   keypad and its user has a PIN; the PIN window is open
//! - `Deciding`: the store is being consulted
//!
//! # Valid Transitions
//!
//! - Idle → Deciding → Idle
//! - Idle → AwaitingPin → Deciding → Idle
//! - AwaitingPin → AwaitingPin (a newer credential replaces the pending one)
//! - AwaitingPin → Idle (PIN window expired)
//!
//! # Examples
//!
//! ```
//! use warden_controller::phase::{EnginePhase, PhaseTracker};
//! use warden_core::Tick;
//!
//! let mut tracker = PhaseTracker::new();
//! tracker.transition_to(EnginePhase::AwaitingPin, Tick::new(10)).unwrap();
//! assert_eq!(tracker.current(), EnginePhase::AwaitingPin);
//!
//! // Idle cannot jump straight back to Idle
//! tracker.reset(Tick::new(11));
//! assert!(tracker.transition_to(EnginePhase::Idle, Tick::new(12)).is_err());
//! ```

use crate::error::{ControllerError, ControllerResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use warden_core::Tick;

/// Maximum number of phase transitions to keep in history.
///
/// A credential-plus-PIN evaluation records three transitions, so the history
/// covers the last thirty-odd evaluations.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Phase of the access decision engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    #[default]
    Idle,
    AwaitingPin,
    Deciding,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            EnginePhase::Idle => "Idle",
            EnginePhase::AwaitingPin => "AwaitingPin",
            EnginePhase::Deciding => "Deciding",
        };
        write!(f, "{phase}")
    }
}

impl EnginePhase {
    /// Check if transition to `target` is valid from this phase.
    ///
    /// ```
    /// use warden_controller::phase::EnginePhase;
    ///
    /// assert!(EnginePhase::Idle.can_transition_to(EnginePhase::AwaitingPin));
    /// assert!(!EnginePhase::Deciding.can_transition_to(EnginePhase::AwaitingPin));
    /// ```
    pub fn can_transition_to(self, target: EnginePhase) -> bool {
        matches!(
            (self, target),
            (EnginePhase::Idle, EnginePhase::AwaitingPin | EnginePhase::Deciding)
                | (
                    EnginePhase::AwaitingPin,
                    EnginePhase::AwaitingPin | EnginePhase::Deciding | EnginePhase::Idle
                )
                | (EnginePhase::Deciding, EnginePhase::Idle)
        )
    }
}

/// A single phase transition with the tick it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: EnginePhase,
    pub to: EnginePhase,
    pub tick: Tick,
}

/// Tracks the engine phase and a bounded transition history.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: EnginePhase,
    entered_at: Tick,
    history: VecDeque<PhaseTransition>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: EnginePhase::Idle,
            entered_at: Tick::ZERO,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current(&self) -> EnginePhase {
        self.current
    }

    /// Tick at which the current phase was entered.
    pub fn entered_at(&self) -> Tick {
        self.entered_at
    }

    pub fn time_in_phase(&self, now: Tick) -> u64 {
        now.since(self.entered_at)
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<PhaseTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).copied().collect()
    }

    /// Move to `to`, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidPhaseTransition` if the transition is
    /// not allowed from the current phase; nothing changes in that case.
    pub fn transition_to(&mut self, to: EnginePhase, now: Tick) -> ControllerResult<PhaseTransition> {
        if !self.current.can_transition_to(to) {
            return Err(ControllerError::InvalidPhaseTransition {
                from: self.current,
                to,
            });
        }
        Ok(self.record(to, now))
    }

    /// Force the tracker back to Idle.
    pub fn reset(&mut self, now: Tick) -> PhaseTransition {
        self.record(EnginePhase::Idle, now)
    }

    fn record(&mut self, to: EnginePhase, now: Tick) -> PhaseTransition {
        let transition = PhaseTransition {
            from: self.current,
            to,
            tick: now,
        };
        self.current = to;
        self.entered_at = now;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        transition
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

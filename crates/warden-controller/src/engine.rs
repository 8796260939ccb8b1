//! Access decision engine.
//!
//! Correlates credentials and PINs against the [`CredentialStore`] and runs the
//! privileged console password check. All timing is driven by the ticks the
//! scheduler passes in.

use crate::{
    decision::{AccessDecision, DecisionReason},
    phase::{EnginePhase, PhaseTracker},
};
use tracing::{debug, error, info, warn};
use warden_core::{
    ControllerConfig, CredentialId, Pin, PrivilegedPassword, ReaderIndex, Tick,
};
use warden_storage::{CredentialStore, UserRecord};

/// What became of a presented credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Decided(AccessDecision),
    /// The user must enter a PIN on `reader` before the window closes.
    AwaitingPin {
        credential: CredentialId,
        reader: ReaderIndex,
    },
}

/// A credential waiting for its PIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPin {
    pub user: UserRecord,
    pub reader: ReaderIndex,
    pub started: Tick,
    /// Last scan or key press on the pending reader.
    pub last_activity: Tick,
}

/// Result of a privileged password attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegedOutcome {
    Enabled,
    /// Wrong password; `remaining` attempts before the lockout.
    Mismatch { remaining: u8 },
    /// Attempts are refused until `until`.
    LockedOut { until: Tick },
}

/// Privileged console session state.
#[derive(Debug, Clone)]
struct PrivilegedSession {
    enabled: bool,
    failures: u8,
    locked_until: Option<Tick>,
    max_failures: u8,
    lockout_ticks: u64,
}

/// Access decision engine.
///
/// # Examples
///
/// ```
/// use warden_controller::engine::{AccessDecisionEngine, Evaluation};
/// use warden_core::{ControllerConfig, CredentialId, PermissionLevel, PrivilegedPassword, ReaderIndex, Tick};
/// use warden_storage::{StaticStore, UserRecord};
///
/// let store = StaticStore::new(
///     vec![UserRecord::new(CredentialId::new(0x1234), PermissionLevel::Standard)],
///     PrivilegedPassword::new(0x31337),
/// );
/// let mut engine = AccessDecisionEngine::new(store, &ControllerConfig::default());
///
/// let eval = engine.on_credential(CredentialId::new(0x1234), ReaderIndex::Primary, Tick::new(1));
/// assert!(matches!(eval, Evaluation::Decided(d) if d.is_grant()));
/// ```
#[derive(Debug)]
pub struct AccessDecisionEngine<S: CredentialStore> {
    store: S,
    phase: PhaseTracker,
    pending: Option<PendingPin>,
    keypad_timeout_ticks: u64,
    keypad_readers: [bool; 2],
    session: PrivilegedSession,
}

impl<S: CredentialStore> AccessDecisionEngine<S> {
    pub fn new(store: S, config: &ControllerConfig) -> Self {
        Self {
            store,
            phase: PhaseTracker::new(),
            pending: None,
            keypad_timeout_ticks: config.keypad_timeout_ticks,
            keypad_readers: ReaderIndex::ALL.map(|reader| config.reader_has_keypad(reader)),
            session: PrivilegedSession {
                enabled: false,
                failures: 0,
                locked_until: None,
                max_failures: config.console_max_failures,
                lockout_ticks: config.console_lockout_ticks,
            },
        }
    }

    /// Evaluate a decoded credential.
    ///
    /// Any pending PIN entry is discarded first: a fresh scan always wins over
    /// a stale partial entry.
    pub fn on_credential(&mut self, credential: CredentialId, reader: ReaderIndex, now: Tick) -> Evaluation {
        if let Some(stale) = self.pending.take() {
            debug!(
                stale = %stale.user.credential,
                %credential,
                "Discarding pending PIN entry for newer credential"
            );
        }

        let Some(user) = self.store.lookup(credential) else {
            return Evaluation::Decided(self.decide(
                DecisionReason::UnknownCredential,
                None,
                Some(reader),
                now,
            ));
        };

        let reason = if !user.active {
            Some(DecisionReason::InactiveCredential)
        } else if !user.level.can_enter() {
            Some(DecisionReason::InsufficientPermission)
        } else if !user.requires_pin() || !self.has_keypad(reader) {
            Some(DecisionReason::CredentialOnly)
        } else {
            None
        };

        match reason {
            Some(reason) => Evaluation::Decided(self.decide(reason, Some(user), Some(reader), now)),
            None => {
                self.enter(EnginePhase::AwaitingPin, now);
                debug!(%credential, %reader, "Awaiting PIN");
                self.pending = Some(PendingPin {
                    user,
                    reader,
                    started: now,
                    last_activity: now,
                });
                Evaluation::AwaitingPin { credential, reader }
            }
        }
    }

    /// A frame that failed to decode. Denied without touching any state, so a
    /// pending PIN entry survives a bad read.
    pub fn on_malformed(&self, reader: ReaderIndex, now: Tick) -> AccessDecision {
        AccessDecision::new(DecisionReason::MalformedCredential, None, Some(reader), now)
    }

    /// A key was pressed on `reader`; keeps the PIN window open.
    pub fn on_keypad_activity(&mut self, reader: ReaderIndex, now: Tick) {
        if let Some(pending) = self.pending.as_mut().filter(|p| p.reader == reader) {
            pending.last_activity = now;
        }
    }

    /// A PIN was submitted on `reader`.
    ///
    /// Returns `None` when no credential is waiting for a PIN on that reader.
    pub fn on_pin(&mut self, pin: &Pin, reader: ReaderIndex, now: Tick) -> Option<AccessDecision> {
        let Some(pending) = self.pending.take_if(|p| p.reader == reader) else {
            debug!(%reader, "PIN submitted with no credential pending");
            return None;
        };

        let reason = if self.store.verify_pin(&pending.user, pin) {
            DecisionReason::CredentialPlusPin
        } else {
            DecisionReason::PinMismatch
        };
        Some(self.decide(reason, Some(pending.user), Some(reader), now))
    }

    /// The keypad on `reader` discarded its buffer for inactivity.
    pub fn on_keypad_timeout(&mut self, reader: ReaderIndex, now: Tick) -> Option<AccessDecision> {
        let pending = self.pending.take_if(|p| p.reader == reader)?;
        Some(self.time_out(pending, now))
    }

    /// Housekeeping: close the PIN window once it has been idle longer than
    /// the keypad timeout.
    pub fn expire(&mut self, now: Tick) -> Option<AccessDecision> {
        let timeout = self.keypad_timeout_ticks;
        let pending = self
            .pending
            .take_if(|p| now.since(p.last_activity) > timeout)?;
        Some(self.time_out(pending, now))
    }

    fn time_out(&mut self, pending: PendingPin, now: Tick) -> AccessDecision {
        self.enter(EnginePhase::Idle, now);
        let decision = AccessDecision::new(
            DecisionReason::PinTimeout,
            Some(pending.user),
            Some(pending.reader),
            now,
        );
        info!(%decision, "Access denied");
        decision
    }

    /// Run an evaluation through Deciding back to Idle.
    fn decide(
        &mut self,
        reason: DecisionReason,
        user: Option<UserRecord>,
        reader: Option<ReaderIndex>,
        now: Tick,
    ) -> AccessDecision {
        self.enter(EnginePhase::Deciding, now);
        let decision = AccessDecision::new(reason, user, reader, now);
        self.enter(EnginePhase::Idle, now);

        if decision.is_grant() {
            info!(%decision, "Access granted");
        } else {
            info!(%decision, "Access denied");
        }
        decision
    }

    fn enter(&mut self, phase: EnginePhase, now: Tick) {
        if let Err(e) = self.phase.transition_to(phase, now) {
            error!(error = %e, "Engine phase out of step, resetting");
            self.phase.reset(now);
            // Idle can reach every other phase
            if phase != EnginePhase::Idle
                && let Err(e) = self.phase.transition_to(phase, now)
            {
                error!(error = %e, "Engine phase recovery failed");
            }
        }
    }

    fn has_keypad(&self, reader: ReaderIndex) -> bool {
        match reader {
            ReaderIndex::Primary => self.keypad_readers[0],
            ReaderIndex::Secondary => self.keypad_readers[1],
        }
    }

    /// Check a privileged console password.
    ///
    /// Independent of the credential flow; never touches the door. After too
    /// many consecutive mismatches further attempts are refused for the
    /// lockout period without being checked.
    pub fn enter_privileged(
        &mut self,
        candidate: Option<&PrivilegedPassword>,
        now: Tick,
    ) -> (AccessDecision, PrivilegedOutcome) {
        let session = &mut self.session;

        if let Some(until) = session.locked_until {
            if now < until {
                warn!(%until, "Privileged password attempt during lockout");
                return (
                    AccessDecision::new(DecisionReason::PrivilegedPasswordMismatch, None, None, now),
                    PrivilegedOutcome::LockedOut { until },
                );
            }
            session.locked_until = None;
        }

        if candidate.is_some_and(|c| self.store.verify_privileged_password(c)) {
            session.enabled = true;
            session.failures = 0;
            info!("Privileged mode enabled");
            return (
                AccessDecision::new(DecisionReason::PrivilegedPassword, None, None, now),
                PrivilegedOutcome::Enabled,
            );
        }

        session.failures = session.failures.saturating_add(1);
        let outcome = if session.failures >= session.max_failures {
            let until = now.after(session.lockout_ticks);
            session.failures = 0;
            session.locked_until = Some(until);
            warn!(%until, "Privileged console locked out");
            PrivilegedOutcome::LockedOut { until }
        } else {
            warn!(failures = session.failures, "Privileged password mismatch");
            PrivilegedOutcome::Mismatch {
                remaining: session.max_failures - session.failures,
            }
        };
        (
            AccessDecision::new(DecisionReason::PrivilegedPasswordMismatch, None, None, now),
            outcome,
        )
    }

    pub fn exit_privileged(&mut self) {
        if self.session.enabled {
            info!("Privileged mode disabled");
        }
        self.session.enabled = false;
    }

    pub fn is_privileged(&self) -> bool {
        self.session.enabled
    }

    pub fn phase(&self) -> &PhaseTracker {
        &self.phase
    }

    pub fn pending(&self) -> Option<&PendingPin> {
        self.pending.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

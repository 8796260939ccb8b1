//! Door actuator.
//!
//! Owns the lock relay and the siren outputs and the tick-counted hold timer.
//! The [`DoorState`] itself belongs to the scheduler and is lent to each call.

use tracing::{debug, error, info, warn};
use warden_core::{ControllerConfig, DoorState, NightlyRelock, Tick};
use warden_hardware::DigitalOutput;

/// What a grant did to the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Locked → UnlockedTimed.
    Unlocked,
    /// Already open; the hold timer started over.
    Restarted,
    /// The alarm is latched; the door stays shut.
    Suppressed,
}

/// Drives the lock relay for the hold time after a grant.
pub struct DoorActuator {
    lock_relay: Box<dyn DigitalOutput>,
    siren: Box<dyn DigitalOutput>,
    hold_ticks: u64,
    hold_until: Option<Tick>,
    relock: NightlyRelock,
    last_hour: Option<u8>,
}

impl DoorActuator {
    /// Create the actuator and drive both outputs to their safe level.
    pub fn new(
        lock_relay: Box<dyn DigitalOutput>,
        siren: Box<dyn DigitalOutput>,
        hold_ticks: u64,
        relock: NightlyRelock,
    ) -> Self {
        let mut actuator = Self {
            lock_relay,
            siren,
            hold_ticks,
            hold_until: None,
            relock,
            last_hour: None,
        };
        actuator.drive_lock(false);
        actuator.drive_siren(false);
        actuator
    }

    pub fn from_config(
        config: &ControllerConfig,
        lock_relay: Box<dyn DigitalOutput>,
        siren: Box<dyn DigitalOutput>,
    ) -> Self {
        Self::new(lock_relay, siren, config.door_hold_ticks, config.nightly_relock)
    }

    /// Open the door for one hold period.
    ///
    /// A grant while already open restarts the timer instead of stacking a
    /// second one. While the alarm is latched nothing moves.
    pub fn grant(&mut self, door: &mut DoorState, now: Tick) -> GrantOutcome {
        let outcome = match *door {
            DoorState::AlarmLatched => {
                warn!("Grant suppressed while alarm is latched");
                return GrantOutcome::Suppressed;
            }
            DoorState::UnlockedTimed => GrantOutcome::Restarted,
            DoorState::Locked => GrantOutcome::Unlocked,
        };

        let until = now.after(self.hold_ticks);
        self.hold_until = Some(until);
        *door = DoorState::UnlockedTimed;
        self.drive_lock(true);
        debug!(%until, ?outcome, "Door unlocked");
        outcome
    }

    /// Housekeeping: relock once the hold timer has run out.
    ///
    /// Returns `true` if the door was relocked on this tick.
    pub fn tick(&mut self, door: &mut DoorState, now: Tick) -> bool {
        match self.hold_until {
            Some(until) if now >= until => {
                self.hold_until = None;
                if *door == DoorState::UnlockedTimed {
                    *door = DoorState::Locked;
                    self.drive_lock(false);
                    debug!(%now, "Hold expired, door locked");
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    /// Housekeeping: force the door locked when the wall clock enters the
    /// configured relock hour, cancelling any hold in progress.
    ///
    /// Fires once per day, on the first tick that sees the relock hour.
    /// Returns `true` if it fired.
    pub fn nightly_relock(&mut self, door: &mut DoorState, hour: u8, now: Tick) -> bool {
        let previous = self.last_hour.replace(hour);
        if !self.relock.enabled || hour != self.relock.hour || previous == Some(hour) {
            return false;
        }

        info!(hour, %now, "Nightly relock");
        self.cancel_hold(door);
        true
    }

    /// Lock now, cancelling any hold. A latched alarm stays latched.
    pub fn force_lock(&mut self, door: &mut DoorState) {
        self.cancel_hold(door);
    }

    /// The alarm just latched: drop any hold, lock, sound the siren.
    pub fn on_alarm(&mut self) {
        self.hold_until = None;
        self.drive_lock(false);
        self.drive_siren(true);
    }

    /// The alarm was cleared: silence the siren. The door stays locked.
    pub fn silence(&mut self) {
        self.drive_siren(false);
    }

    pub fn hold_until(&self) -> Option<Tick> {
        self.hold_until
    }

    pub fn is_lock_released(&self) -> bool {
        self.lock_relay.is_active()
    }

    pub fn is_siren_on(&self) -> bool {
        self.siren.is_active()
    }

    fn cancel_hold(&mut self, door: &mut DoorState) {
        self.hold_until = None;
        if *door == DoorState::UnlockedTimed {
            *door = DoorState::Locked;
        }
        self.drive_lock(false);
    }

    fn drive_lock(&mut self, release: bool) {
        if let Err(e) = self.lock_relay.set_active(release) {
            error!(error = %e, release, "Lock relay write failed");
        }
    }

    fn drive_siren(&mut self, on: bool) {
        if let Err(e) = self.siren.set_active(on) {
            error!(error = %e, on, "Siren write failed");
        }
    }
}

impl std::fmt::Debug for DoorActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoorActuator")
            .field("hold_ticks", &self.hold_ticks)
            .field("hold_until", &self.hold_until)
            .field("relock", &self.relock)
            .field("lock_released", &self.is_lock_released())
            .field("siren_on", &self.is_siren_on())
            .finish()
    }
}

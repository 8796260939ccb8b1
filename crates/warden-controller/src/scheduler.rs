//! Cooperative scheduler loop.
//!
//! [`Controller`] owns every component and the single [`DoorState`]. One call
//! to [`Controller::tick`] polls each device once and advances every timer;
//! nothing in it waits.
//!
//! # Tick order
//!
//! ```text
//!  sensor ──► AlarmMonitor ──► (latch: DoorActuator::on_alarm)
//!    │
//!  reader 1 ┐
//!  reader 2 ┴► ReaderInputAdapter ─┬─ key ──► KeypadInputAdapter ─┐
//!                                  └─ frame ─────────────────────►┤
//!                                                                 ▼
//!  console line ──► ConsoleCommand ──────────────────► AccessDecisionEngine
//!    │                                                            │ Grant
//!  housekeeping: keypad expiry, PIN window, hold timer, relock    ▼
//!                                                          DoorActuator
//! ```
//!
//! The alarm runs first so that a latch in this tick suppresses any grant
//! that follows it. Input is handled before housekeeping so that a key
//! arriving on the tick a timeout would fire still counts.

use crate::{
    alarm::{AlarmEvent, AlarmMonitor},
    console::{ConsoleCommand, ConsoleReply, StatusReport, UserSummary},
    decision::AccessDecision,
    door::{DoorActuator, GrantOutcome},
    engine::{AccessDecisionEngine, Evaluation, PrivilegedOutcome},
    error::ControllerResult,
};
use tracing::{debug, error, info, trace, warn};
use warden_core::{
    ControllerConfig, CredentialEvent, DoorState, KeypadKey, ReaderIndex, SensorSample, Tick,
};
use warden_hardware::{AnalogInput, ConsoleChannel, DigitalOutput, ReaderPort, WallClock};
use warden_keypad::{InputTimedOut, KeypadEvent, KeypadInputAdapter};
use warden_rfid::{ReaderInput, ReaderInputAdapter};
use warden_storage::CredentialStore;

/// Engine transitions listed by the `s` status.
const STATUS_PHASE_HISTORY: usize = 4;

/// The devices the controller drives.
pub struct Peripherals {
    pub lock_relay: Box<dyn DigitalOutput>,
    pub siren: Box<dyn DigitalOutput>,
    pub sensor: Box<dyn AnalogInput>,
    pub clock: Box<dyn WallClock>,
    pub primary_reader: Box<dyn ReaderPort>,
    pub secondary_reader: Box<dyn ReaderPort>,
    pub console: Box<dyn ConsoleChannel>,
}

/// A keypad buffer discarded for inactivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadTimeout {
    pub reader: ReaderIndex,
    pub event: InputTimedOut,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub decisions: Vec<AccessDecision>,
    pub alarms: Vec<AlarmEvent>,
    pub keypad_timeouts: Vec<KeypadTimeout>,
    pub console_replies: Vec<ConsoleReply>,
    /// Door state after the tick.
    pub door: DoorState,
    /// The hold timer or the nightly relock locked the door on this tick.
    pub relocked: bool,
}

impl TickReport {
    fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    /// Whether anything worth logging happened.
    pub fn is_quiet(&self) -> bool {
        self.decisions.is_empty()
            && self.alarms.is_empty()
            && self.keypad_timeouts.is_empty()
            && self.console_replies.is_empty()
            && !self.relocked
    }
}

struct Inputs {
    sensor: Box<dyn AnalogInput>,
    clock: Box<dyn WallClock>,
    readers: [Box<dyn ReaderPort>; 2],
    console: Box<dyn ConsoleChannel>,
}

/// The access controller.
///
/// # Examples
///
/// ```
/// use warden_controller::{Controller, Peripherals};
/// use warden_core::{ControllerConfig, CredentialId, PermissionLevel, PrivilegedPassword, Tick};
/// use warden_hardware::mock::{MockClock, MockConsole, MockOutput, MockReader, MockSensor};
/// use warden_storage::{StaticStore, UserRecord};
///
/// let (lock_relay, lock) = MockOutput::new("lock");
/// let (siren, _) = MockOutput::new("siren");
/// let (sensor, _) = MockSensor::new(500);
/// let (clock, _) = MockClock::at_hour(12);
/// let (primary_reader, reader) = MockReader::new("reader 1");
/// let (secondary_reader, _) = MockReader::new("reader 2");
/// let (console, _) = MockConsole::new();
///
/// let store = StaticStore::new(
///     vec![UserRecord::new(CredentialId::new(0x1234), PermissionLevel::Standard)],
///     PrivilegedPassword::new(0x31337),
/// );
/// let peripherals = Peripherals {
///     lock_relay: Box::new(lock_relay),
///     siren: Box::new(siren),
///     sensor: Box::new(sensor),
///     clock: Box::new(clock),
///     primary_reader: Box::new(primary_reader),
///     secondary_reader: Box::new(secondary_reader),
///     console: Box::new(console),
/// };
/// let mut controller = Controller::new(ControllerConfig::default(), store, peripherals).unwrap();
///
/// // 26-bit frame carrying 0x001234: even parity first, odd parity last
/// let data: Vec<u8> = (0..24).rev().map(|i| ((0x1234u32 >> i) & 1) as u8).collect();
/// let mut bits = vec![data[..12].iter().sum::<u8>() % 2];
/// bits.extend(&data);
/// bits.push(1 - data[12..].iter().sum::<u8>() % 2);
/// reader.present_bits(bits).unwrap();
///
/// let report = controller.tick(Tick::new(1));
/// assert!(report.decisions[0].is_grant());
/// assert!(lock.is_active());
/// ```
pub struct Controller<S: CredentialStore> {
    engine: AccessDecisionEngine<S>,
    readers: ReaderInputAdapter,
    keypads: [Option<KeypadInputAdapter>; 2],
    actuator: DoorActuator,
    alarm: AlarmMonitor,
    door: DoorState,
    inputs: Inputs,
}

impl<S: CredentialStore> Controller<S> {
    /// Validate `config` and assemble the controller around `store`.
    ///
    /// # Errors
    ///
    /// Returns the configuration error if `config` does not validate.
    pub fn new(config: ControllerConfig, store: S, peripherals: Peripherals) -> ControllerResult<Self> {
        let config = config.validated()?;
        let Peripherals {
            lock_relay,
            siren,
            sensor,
            clock,
            primary_reader,
            secondary_reader,
            console,
        } = peripherals;

        let keypads = ReaderIndex::ALL.map(|reader| {
            config
                .reader_has_keypad(reader)
                .then(|| KeypadInputAdapter::from_config(&config))
        });

        info!(
            board = %config.board,
            card_format = ?config.card_format,
            frame_bits = config.frame_bits,
            users = store.records().len(),
            "Controller ready"
        );

        Ok(Self {
            engine: AccessDecisionEngine::new(store, &config),
            readers: ReaderInputAdapter::from_config(&config),
            keypads,
            actuator: DoorActuator::from_config(&config, lock_relay, siren),
            alarm: AlarmMonitor::from_config(&config),
            door: DoorState::Locked,
            inputs: Inputs {
                sensor,
                clock,
                readers: [primary_reader, secondary_reader],
                console,
            },
        })
    }

    /// Run one scheduler tick.
    pub fn tick(&mut self, now: Tick) -> TickReport {
        let mut report = TickReport::new(now);

        self.poll_sensor(now, &mut report);
        for reader in ReaderIndex::ALL {
            self.poll_reader(reader, now, &mut report);
        }
        self.poll_console(now, &mut report);
        self.housekeeping(now, &mut report);

        report.door = self.door;
        report
    }

    fn poll_sensor(&mut self, now: Tick, report: &mut TickReport) {
        let sample = match self.inputs.sensor.read() {
            Ok(value) => match SensorSample::new(value, now) {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(error = %e, "Discarding sensor sample");
                    return;
                }
            },
            Err(e) => {
                debug!(error = %e, "Sensor read failed");
                return;
            }
        };

        if let Some(event) = self.alarm.observe(sample, &mut self.door) {
            self.actuator.on_alarm();
            report.alarms.push(event);
        }
    }

    fn poll_reader(&mut self, reader: ReaderIndex, now: Tick, report: &mut TickReport) {
        let Some(bits) = self.inputs.readers[slot(reader)].poll_burst() else {
            return;
        };
        trace!(%reader, bits = bits.len(), "Reader burst");

        match self.readers.classify(&bits) {
            Ok(ReaderInput::Key(key)) => self.on_key(reader, key, now, report),
            Ok(ReaderInput::Frame(frame)) => {
                let event = CredentialEvent::new(frame, reader, now);
                self.on_frame(&event, report);
            }
            Err(e) => {
                debug!(%reader, error = %e, "Unreadable burst");
                let event = CredentialEvent::new(bits, reader, now);
                self.readers.log_scan(&event, None, true);
                report.decisions.push(self.engine.on_malformed(reader, now));
            }
        }
    }

    fn on_key(&mut self, reader: ReaderIndex, key: KeypadKey, now: Tick, report: &mut TickReport) {
        let Some(keypad) = self.keypads[slot(reader)].as_mut() else {
            debug!(%reader, %key, "Key on reader without keypad ignored");
            return;
        };

        let event = keypad.press(key, now);
        self.engine.on_keypad_activity(reader, now);

        if let KeypadEvent::Submitted(pin) = event
            && let Some(decision) = self.engine.on_pin(&pin, reader, now)
        {
            self.apply(decision, now, report);
        }
    }

    fn on_frame(&mut self, event: &CredentialEvent, report: &mut TickReport) {
        let (reader, now) = (event.reader, event.timestamp);

        let credential = match self.readers.decode(event) {
            Ok(credential) => credential,
            Err(_) => {
                self.readers.log_scan(event, None, true);
                report.decisions.push(self.engine.on_malformed(reader, now));
                return;
            }
        };

        match self.engine.on_credential(credential, reader, now) {
            Evaluation::Decided(decision) => {
                self.readers
                    .log_scan(event, Some(credential), !decision.is_grant());
                self.apply(decision, now, report);
            }
            Evaluation::AwaitingPin { reader, .. } => {
                self.readers.log_scan(event, Some(credential), false);
                // Digits typed before the scan belong to nobody
                if let Some(keypad) = self.keypads[slot(reader)].as_mut() {
                    keypad.clear();
                }
            }
        }
    }

    fn apply(&mut self, decision: AccessDecision, now: Tick, report: &mut TickReport) {
        if decision.is_grant() && self.actuator.grant(&mut self.door, now) == GrantOutcome::Suppressed {
            warn!(%decision, "Grant recorded while alarm latched");
        }
        report.decisions.push(decision);
    }

    fn poll_console(&mut self, now: Tick, report: &mut TickReport) {
        let Some(line) = self.inputs.console.poll_line() else {
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let reply = match ConsoleCommand::parse(line) {
            Ok(command) => self.run_command(command, now, report),
            Err(e) => ConsoleReply::from(e),
        };

        if let Err(e) = self.inputs.console.write_line(&reply.to_string()) {
            error!(error = %e, "Console write failed");
        }
        report.console_replies.push(reply);
    }

    fn run_command(&mut self, command: ConsoleCommand, now: Tick, report: &mut TickReport) -> ConsoleReply {
        if command.is_privileged() && !self.engine.is_privileged() {
            warn!(?command, "Privileged command refused");
            return ConsoleReply::NotPrivileged;
        }

        match command {
            ConsoleCommand::Help => ConsoleReply::Help,
            ConsoleCommand::Enable(password) => {
                let (decision, outcome) = self.engine.enter_privileged(password.as_ref(), now);
                report.decisions.push(decision);
                match outcome {
                    PrivilegedOutcome::Enabled => ConsoleReply::PrivilegedEnabled,
                    PrivilegedOutcome::Mismatch { remaining } => ConsoleReply::PasswordMismatch { remaining },
                    PrivilegedOutcome::LockedOut { until } => ConsoleReply::LockedOut { until },
                }
            }
            ConsoleCommand::Exit => {
                self.engine.exit_privileged();
                ConsoleReply::PrivilegedDisabled
            }
            ConsoleCommand::Status => ConsoleReply::Status(self.status(now)),
            ConsoleCommand::ListUsers => ConsoleReply::Users(
                self.engine
                    .store()
                    .records()
                    .iter()
                    .map(UserSummary::from)
                    .collect(),
            ),
            ConsoleCommand::AddUser {
                credential,
                level,
                pin,
            } => match self.engine.store_mut().add(credential, level, pin) {
                Ok(()) => {
                    info!(%credential, %level, "User provisioned");
                    ConsoleReply::UserAdded(credential)
                }
                Err(e) => ConsoleReply::Error(e.to_string()),
            },
            ConsoleCommand::Revoke(credential) => match self.engine.store_mut().revoke(credential) {
                Ok(()) => {
                    info!(%credential, "User revoked");
                    ConsoleReply::UserRevoked(credential)
                }
                Err(e) => ConsoleReply::Error(e.to_string()),
            },
            ConsoleCommand::Open => match self.actuator.grant(&mut self.door, now) {
                GrantOutcome::Suppressed => ConsoleReply::DoorOpenSuppressed,
                GrantOutcome::Unlocked | GrantOutcome::Restarted => {
                    info!("Door opened from console");
                    ConsoleReply::DoorOpened
                }
            },
            ConsoleCommand::Lock => {
                self.actuator.force_lock(&mut self.door);
                info!("Door locked from console");
                ConsoleReply::DoorLocked
            }
            ConsoleCommand::ClearAlarm => {
                if self.alarm.clear(&mut self.door) {
                    self.actuator.silence();
                    ConsoleReply::AlarmCleared
                } else {
                    ConsoleReply::NoAlarm
                }
            }
        }
    }

    fn housekeeping(&mut self, now: Tick, report: &mut TickReport) {
        for reader in ReaderIndex::ALL {
            let Some(event) = self.keypads[slot(reader)]
                .as_mut()
                .and_then(|keypad| keypad.poll_timeout(now))
            else {
                continue;
            };
            report.keypad_timeouts.push(KeypadTimeout { reader, event });
            if let Some(decision) = self.engine.on_keypad_timeout(reader, now) {
                report.decisions.push(decision);
            }
        }

        if let Some(decision) = self.engine.expire(now) {
            // The window closed on an empty buffer; make sure nothing lingers
            if let Some(keypad) = decision
                .reader
                .and_then(|reader| self.keypads[slot(reader)].as_mut())
            {
                keypad.clear();
            }
            report.decisions.push(decision);
        }

        let expired = self.actuator.tick(&mut self.door, now);
        let hour = self.inputs.clock.hour();
        let relocked = self.actuator.nightly_relock(&mut self.door, hour, now);
        report.relocked = expired || relocked;
    }

    /// Snapshot for the console `s` command.
    pub fn status(&self, now: Tick) -> StatusReport {
        let phase = self.engine.phase();
        StatusReport {
            door: self.door,
            phase: phase.current(),
            phase_ticks: phase.time_in_phase(now),
            recent_phases: phase.last_transitions(STATUS_PHASE_HISTORY),
            users: self.engine.store().records().len(),
            hold_until: self.actuator.hold_until(),
            siren_on: self.actuator.is_siren_on(),
        }
    }

    pub fn door_state(&self) -> DoorState {
        self.door
    }

    pub fn engine(&self) -> &AccessDecisionEngine<S> {
        &self.engine
    }

    pub fn actuator(&self) -> &DoorActuator {
        &self.actuator
    }

    pub fn alarm(&self) -> &AlarmMonitor {
        &self.alarm
    }

    pub fn keypad(&self, reader: ReaderIndex) -> Option<&KeypadInputAdapter> {
        self.keypads[slot(reader)].as_ref()
    }
}

impl<S: CredentialStore + std::fmt::Debug> std::fmt::Debug for Controller<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("door", &self.door)
            .field("engine", &self.engine)
            .field("actuator", &self.actuator)
            .field("alarm", &self.alarm)
            .finish_non_exhaustive()
    }
}

fn slot(reader: ReaderIndex) -> usize {
    match reader {
        ReaderIndex::Primary => 0,
        ReaderIndex::Secondary => 1,
    }
}

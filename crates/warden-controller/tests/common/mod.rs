//! Shared rig for controller integration tests.
//!
//! A [`Rig`] wires a [`Controller`] to mock devices and keeps every device
//! handle so a test can present cards, press keys, move the sensor and the
//! wall clock, type console lines and inspect the relay outputs.

#![allow(dead_code)]

use warden_controller::{Controller, Peripherals, TickReport};
use warden_core::{
    ControllerConfig, CredentialId, KeypadKey, PermissionLevel, Pin, PrivilegedPassword,
    ReaderIndex, Tick,
};
use warden_hardware::mock::{
    MockClock, MockClockHandle, MockConsole, MockConsoleHandle, MockOutput, MockOutputHandle,
    MockReader, MockReaderHandle, MockSensor, MockSensorHandle,
};
use warden_storage::{CredentialStore, StaticStore, UserRecord};

pub const PASSWORD: u32 = 0x31337;
pub const CARD: CredentialId = CredentialId::new(0x00BEEF);
pub const PIN_CARD: CredentialId = CredentialId::new(0x00CAFE);
pub const OTHER_PIN_CARD: CredentialId = CredentialId::new(0x00F00D);
pub const UNKNOWN_CARD: CredentialId = CredentialId::new(0x00DEAD);
pub const PIN: &str = "4321";
pub const SENSOR_BASELINE: u16 = 500;

/// The default user table used by most scenarios.
pub fn users() -> Vec<UserRecord> {
    let pin = Pin::new(PIN).unwrap();
    vec![
        UserRecord::new(CARD, PermissionLevel::Standard),
        UserRecord::new(PIN_CARD, PermissionLevel::Standard).with_pin(pin.clone()),
        UserRecord::new(OTHER_PIN_CARD, PermissionLevel::Privileged).with_pin(pin),
    ]
}

pub fn static_store() -> StaticStore {
    StaticStore::new(users(), PrivilegedPassword::new(PASSWORD))
}

/// Build a valid parity-stripped Wiegand frame carrying `id`.
pub fn wiegand_frame(id: u64, frame_bits: usize) -> Vec<u8> {
    let data_bits = frame_bits - 2;
    let data: Vec<u8> = (0..data_bits)
        .rev()
        .map(|i| ((id >> i) & 1) as u8)
        .collect();
    let half = data_bits / 2;
    let ones = |bits: &[u8]| bits.iter().filter(|&&b| b == 1).count();

    let mut frame = Vec::with_capacity(frame_bits);
    frame.push((ones(&data[..half]) % 2) as u8);
    frame.extend_from_slice(&data);
    frame.push(1 - (ones(&data[half..]) % 2) as u8);
    frame
}

/// Keys for a PIN string followed by the `#` terminator.
pub fn pin_keys(pin: &str) -> Vec<KeypadKey> {
    pin.chars()
        .map(|c| KeypadKey::digit(c as u8 - b'0').unwrap())
        .chain(std::iter::once(KeypadKey::Hash))
        .collect()
}

pub struct Rig<S: CredentialStore> {
    pub controller: Controller<S>,
    pub lock: MockOutputHandle,
    pub siren: MockOutputHandle,
    pub sensor: MockSensorHandle,
    pub clock: MockClockHandle,
    pub readers: [MockReaderHandle; 2],
    pub console: MockConsoleHandle,
    pub frame_bits: usize,
    now: u64,
}

impl Rig<StaticStore> {
    /// Default configuration, default users, clock at noon.
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        Self::with_store(config, static_store())
    }
}

impl<S: CredentialStore> Rig<S> {
    pub fn with_store(config: ControllerConfig, store: S) -> Self {
        let (lock_relay, lock) = MockOutput::new("lock");
        let (siren_out, siren) = MockOutput::new("siren");
        let (sensor_in, sensor) = MockSensor::new(SENSOR_BASELINE);
        let (clock_in, clock) = MockClock::at_hour(12);
        let (primary, primary_handle) = MockReader::new("reader 1");
        let (secondary, secondary_handle) = MockReader::new("reader 2");
        let (console_in, console) = MockConsole::new();
        let frame_bits = config.frame_bits;

        let peripherals = Peripherals {
            lock_relay: Box::new(lock_relay),
            siren: Box::new(siren_out),
            sensor: Box::new(sensor_in),
            clock: Box::new(clock_in),
            primary_reader: Box::new(primary),
            secondary_reader: Box::new(secondary),
            console: Box::new(console_in),
        };
        let controller = Controller::new(config, store, peripherals).unwrap();

        Self {
            controller,
            lock,
            siren,
            sensor,
            clock,
            readers: [primary_handle, secondary_handle],
            console,
            frame_bits,
            now: 0,
        }
    }

    pub fn reader(&self, reader: ReaderIndex) -> &MockReaderHandle {
        match reader {
            ReaderIndex::Primary => &self.readers[0],
            ReaderIndex::Secondary => &self.readers[1],
        }
    }

    /// Queue a card scan on `reader`.
    pub fn scan(&self, reader: ReaderIndex, credential: CredentialId) {
        self.reader(reader)
            .present_bits(wiegand_frame(credential.as_u64(), self.frame_bits))
            .unwrap();
    }

    /// Queue a PIN followed by `#` on `reader`.
    pub fn enter_pin(&self, reader: ReaderIndex, pin: &str) {
        self.reader(reader).type_keys(&pin_keys(pin)).unwrap();
    }

    pub fn console_line(&self, line: &str) {
        self.console.send_line(line).unwrap();
    }

    pub fn now(&self) -> Tick {
        Tick::new(self.now)
    }

    /// Advance one tick.
    pub fn step(&mut self) -> TickReport {
        self.now += 1;
        self.controller.tick(Tick::new(self.now))
    }

    /// Advance `count` ticks and collect every report.
    pub fn run(&mut self, count: u64) -> Vec<TickReport> {
        (0..count).map(|_| self.step()).collect()
    }

    /// Advance to `tick` (inclusive) and collect every report on the way.
    pub fn run_until(&mut self, tick: u64) -> Vec<TickReport> {
        let count = tick.saturating_sub(self.now);
        self.run(count)
    }
}

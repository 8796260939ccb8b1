//! Host-side emulator for the warden access controller.
//!
//! Runs the scheduler loop on a 1 ms tokio interval against mock devices and
//! takes device events from stdin:
//!
//! ```text
//! scan 1 10000000010111110111011111   present a Wiegand burst on reader 1
//! key 1 4                              press a key on reader 1
//! sensor 730                           set the intrusion sensor reading
//! hour 23                              move the wall clock
//! console e 31337                      type a line on the privileged console
//! quit
//! ```
//!
//! Usage: `warden-cli [config.json]`. Set `RUST_LOG` to change the log level.

mod command;
mod config;

use anyhow::{Context, Result};
use command::{EmulatorCommand, USAGE};
use config::EmulatorConfig;
use std::{path::PathBuf, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use warden_controller::{Controller, Peripherals, TickReport};
use warden_core::{ReaderIndex, Tick, constants::TICKS_PER_SECOND};
use warden_hardware::{
    FileEeprom, SystemClock, WallClock,
    mock::{
        MockClock, MockClockHandle, MockConsole, MockConsoleHandle, MockOutput, MockReader,
        MockReaderHandle, MockSensor, MockSensorHandle,
    },
};
use warden_storage::{CredentialStore, EepromStore, StaticStore};

/// Initial sensor reading; mid-scale on a 10-bit ADC.
const SENSOR_REST: u16 = 512;

/// Device handles the stdin commands act on.
struct Handles {
    readers: [MockReaderHandle; 2],
    sensor: MockSensorHandle,
    clock: MockClockHandle,
    console: MockConsoleHandle,
}

impl Handles {
    fn reader(&self, reader: ReaderIndex) -> &MockReaderHandle {
        match reader {
            ReaderIndex::Primary => &self.readers[0],
            ReaderIndex::Secondary => &self.readers[1],
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => EmulatorConfig::load(&path)?,
        None => {
            info!("No configuration file given, using factory defaults");
            EmulatorConfig::default()
        }
    };
    info!(version = warden_core::VERSION, "warden emulator starting");

    let (peripherals, handles) = mock_peripherals();
    let controller = &config.controller;
    info!(
        baud = controller.console_baud,
        "Console on stdin standing in for the serial line"
    );

    if controller.eeprom_enabled {
        let eeprom = FileEeprom::open(&config.eeprom_path, config.eeprom_size)
            .with_context(|| format!("opening {}", config.eeprom_path.display()))?;
        let store = EepromStore::open(
            eeprom,
            config.users.clone(),
            controller.privileged_password,
            controller.pin_storage,
        );
        info!(
            path = %config.eeprom_path.display(),
            source = ?store.source(),
            "Using EEPROM user table"
        );
        run(Controller::new(controller.clone(), store, peripherals)?, handles).await
    } else {
        let store = StaticStore::new(config.users.clone(), controller.privileged_password)
            .with_pin_storage(controller.pin_storage);
        run(Controller::new(controller.clone(), store, peripherals)?, handles).await
    }
}

fn mock_peripherals() -> (Peripherals, Handles) {
    let (lock_relay, _) = MockOutput::new("lock relay");
    let (siren, _) = MockOutput::new("siren");
    let (sensor, sensor_handle) = MockSensor::new(SENSOR_REST);
    let (clock, clock_handle) = MockClock::new(SystemClock.now());
    let (primary, primary_handle) = MockReader::new("reader 1");
    let (secondary, secondary_handle) = MockReader::new("reader 2");
    let (console, console_handle) = MockConsole::new();

    let peripherals = Peripherals {
        lock_relay: Box::new(lock_relay),
        siren: Box::new(siren),
        sensor: Box::new(sensor),
        clock: Box::new(clock),
        primary_reader: Box::new(primary),
        secondary_reader: Box::new(secondary),
        console: Box::new(console),
    };
    let handles = Handles {
        readers: [primary_handle, secondary_handle],
        sensor: sensor_handle,
        clock: clock_handle,
        console: console_handle,
    };
    (peripherals, handles)
}

async fn run<S: CredentialStore>(mut controller: Controller<S>, handles: Handles) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_millis(1000 / TICKS_PER_SECOND));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();

    info!("Ready: {USAGE}");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Tick::new(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
                let report = controller.tick(now);
                log_report(&report);
                for line in handles.console.take_output() {
                    println!("{line}");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, shutting down");
                    break;
                };
                match EmulatorCommand::parse(&line) {
                    Ok(Some(EmulatorCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = dispatch(&handles, command) {
                            warn!(error = %e, "Command failed");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{e:#}"),
                }
            }
        }
    }

    info!(door = %controller.door_state(), "warden emulator stopped");
    Ok(())
}

fn dispatch(handles: &Handles, command: EmulatorCommand) -> Result<()> {
    debug!(?command, "stdin command");
    match command {
        EmulatorCommand::Scan { reader, bits } => handles.reader(reader).present_bits(bits)?,
        EmulatorCommand::Key { reader, key } => handles.reader(reader).press_key(key)?,
        EmulatorCommand::Sensor(value) => handles.sensor.set_value(value),
        EmulatorCommand::Hour(hour) => handles.clock.set_hour(hour),
        EmulatorCommand::Console(line) => handles.console.send_line(line)?,
        EmulatorCommand::Quit => {}
    }
    Ok(())
}

fn log_report(report: &TickReport) {
    if report.is_quiet() {
        return;
    }
    for alarm in &report.alarms {
        warn!(tick = %report.tick, delta = alarm.delta, "Intrusion alarm");
    }
    for timeout in &report.keypad_timeouts {
        info!(
            reader = %timeout.reader,
            discarded = timeout.event.discarded,
            "Keypad entry timed out"
        );
    }
    for decision in &report.decisions {
        debug!(tick = %report.tick, %decision, "Decision");
    }
    for reply in &report.console_replies {
        info!(%reply, "Console");
    }
    if report.relocked {
        info!(tick = %report.tick, "Door relocked");
    }
    debug!(door = %report.door, "Tick");
}

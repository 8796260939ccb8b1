//! Stdin commands that drive the mock devices.

use anyhow::{Context, Result, bail};
use warden_core::{KeypadKey, ReaderIndex};

pub const USAGE: &str = "scan <1|2> <bits> | key <1|2> <0-9|*|#> | sensor <value> | \
                         hour <0-23> | console <line> | quit";

/// One stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorCommand {
    /// Present a raw Wiegand burst.
    Scan { reader: ReaderIndex, bits: Vec<u8> },
    /// Press a key on the reader's keypad.
    Key { reader: ReaderIndex, key: KeypadKey },
    /// Set the analog sensor reading.
    Sensor(u16),
    /// Move the wall clock to the given hour.
    Hour(u8),
    /// Type a line on the serial console.
    Console(String),
    Quit,
}

impl EmulatorCommand {
    /// Parse a stdin line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "" => return Ok(None),
            "scan" => {
                let (reader, bits) = rest.split_once(' ').context("usage: scan <reader> <bits>")?;
                EmulatorCommand::Scan {
                    reader: reader_arg(reader)?,
                    bits: bit_string(bits.trim())?,
                }
            }
            "key" => {
                let (reader, key) = rest.split_once(' ').context("usage: key <reader> <key>")?;
                EmulatorCommand::Key {
                    reader: reader_arg(reader)?,
                    key: key.trim().parse()?,
                }
            }
            "sensor" => EmulatorCommand::Sensor(rest.parse().context("sensor value")?),
            "hour" => {
                let hour: u8 = rest.parse().context("hour")?;
                if hour > 23 {
                    bail!("hour must be 0-23, got {hour}");
                }
                EmulatorCommand::Hour(hour)
            }
            "console" => EmulatorCommand::Console(rest.to_string()),
            "quit" | "exit" => EmulatorCommand::Quit,
            other => bail!("unknown command '{other}' ({USAGE})"),
        };
        Ok(Some(command))
    }
}

fn reader_arg(arg: &str) -> Result<ReaderIndex> {
    let number: u8 = arg.trim().parse().context("reader number")?;
    Ok(ReaderIndex::from_number(number)?)
}

fn bit_string(bits: &str) -> Result<Vec<u8>> {
    bits.chars()
        .filter(|c| !matches!(c, '_' | ' '))
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => bail!("'{other}' is not a bit"),
        })
        .collect()
}

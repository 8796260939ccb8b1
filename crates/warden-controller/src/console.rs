//! Privileged console commands.
//!
//! One command per line. The first word selects the command:
//!
//! | Line | Command | Privileged |
//! |---|---|---|
//! | `?`, `help` | list commands | no |
//! | `e <hex password>` | enter privileged mode | no |
//! | `x` | leave privileged mode | no |
//! | `s` | status | yes |
//! | `i` | list users | yes |
//! | `m <hex credential> <level 0-2> [pin]` | add or replace a user | yes |
//! | `r <hex credential>` | revoke a user | yes |
//! | `o` | open the door for one hold period | yes |
//! | `l` | lock the door now | yes |
//! | `c` | clear the alarm latch | yes |

use crate::{
    error::{ControllerError, ControllerResult},
    phase::{EnginePhase, PhaseTransition},
};
use std::fmt;
use warden_core::{CredentialId, DoorState, PermissionLevel, Pin, PrivilegedPassword, Tick};
use warden_storage::UserRecord;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    /// `None` when the argument is not a readable password; it still counts
    /// as a failed attempt.
    Enable(Option<PrivilegedPassword>),
    Exit,
    Status,
    ListUsers,
    AddUser {
        credential: CredentialId,
        level: PermissionLevel,
        pin: Option<Pin>,
    },
    Revoke(CredentialId),
    Open,
    Lock,
    ClearAlarm,
}

impl ConsoleCommand {
    /// Parse one console line.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::UnknownCommand` for an unrecognised command
    /// word and `ControllerError::InvalidArgument` (or a wrapped core error)
    /// for missing or malformed arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_controller::console::ConsoleCommand;
    /// use warden_core::{CredentialId, PermissionLevel};
    ///
    /// let cmd = ConsoleCommand::parse("m 1a2b 1 4321").unwrap();
    /// assert!(matches!(
    ///     cmd,
    ///     ConsoleCommand::AddUser { credential, level: PermissionLevel::Standard, pin: Some(_) }
    ///         if credential == CredentialId::new(0x1a2b)
    /// ));
    /// ```
    pub fn parse(line: &str) -> ControllerResult<Self> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(ControllerError::UnknownCommand(String::new()));
        };

        let command = match word {
            "?" | "help" => ConsoleCommand::Help,
            "e" => ConsoleCommand::Enable(required(&mut words, "e", "password")?.parse().ok()),
            "x" => ConsoleCommand::Exit,
            "s" => ConsoleCommand::Status,
            "i" => ConsoleCommand::ListUsers,
            "m" => {
                let credential = required(&mut words, "m", "credential")?.parse()?;
                let level = required(&mut words, "m", "level")?
                    .parse::<u8>()
                    .map_err(|e| ControllerError::invalid_argument("m", e.to_string()))
                    .and_then(|code| PermissionLevel::from_u8(code).map_err(ControllerError::from))?;
                let pin = words.next().map(Pin::new).transpose()?;
                ConsoleCommand::AddUser {
                    credential,
                    level,
                    pin,
                }
            }
            "r" => ConsoleCommand::Revoke(required(&mut words, "r", "credential")?.parse()?),
            "o" => ConsoleCommand::Open,
            "l" => ConsoleCommand::Lock,
            "c" => ConsoleCommand::ClearAlarm,
            other => return Err(ControllerError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Whether the command needs privileged mode.
    pub fn is_privileged(&self) -> bool {
        !matches!(
            self,
            ConsoleCommand::Help | ConsoleCommand::Enable(_) | ConsoleCommand::Exit
        )
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    what: &str,
) -> ControllerResult<&'a str> {
    words
        .next()
        .ok_or_else(|| ControllerError::invalid_argument(command, format!("missing {what}")))
}

/// Controller status as shown by `s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub door: DoorState,
    pub phase: EnginePhase,
    /// Ticks spent in the current phase.
    pub phase_ticks: u64,
    /// Latest engine transitions, oldest first.
    pub recent_phases: Vec<PhaseTransition>,
    pub users: usize,
    pub hold_until: Option<Tick>,
    pub siren_on: bool,
}

/// One line of the `i` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub credential: CredentialId,
    pub level: PermissionLevel,
    pub active: bool,
    pub has_pin: bool,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            credential: record.credential,
            level: record.level,
            active: record.active,
            has_pin: record.requires_pin(),
        }
    }
}

/// Reply written back to the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Help,
    PrivilegedEnabled,
    PrivilegedDisabled,
    PasswordMismatch { remaining: u8 },
    LockedOut { until: Tick },
    NotPrivileged,
    Status(StatusReport),
    Users(Vec<UserSummary>),
    UserAdded(CredentialId),
    UserRevoked(CredentialId),
    DoorOpened,
    DoorOpenSuppressed,
    DoorLocked,
    AlarmCleared,
    NoAlarm,
    Error(String),
}

impl From<ControllerError> for ConsoleReply {
    fn from(error: ControllerError) -> Self {
        ConsoleReply::Error(error.to_string())
    }
}

impl fmt::Display for ConsoleReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleReply::Help => write!(
                f,
                "Commands: ? help | e <pw> enable | x exit | s status | i users | \
                 m <id> <lvl> [pin] add | r <id> revoke | o open | l lock | c clear alarm"
            ),
            ConsoleReply::PrivilegedEnabled => write!(f, "Privileged mode enabled"),
            ConsoleReply::PrivilegedDisabled => write!(f, "Privileged mode disabled"),
            ConsoleReply::PasswordMismatch { remaining } => {
                write!(f, "Wrong password ({remaining} attempts left)")
            }
            ConsoleReply::LockedOut { until } => write!(f, "Console locked until tick {until}"),
            ConsoleReply::NotPrivileged => write!(f, "Privileged mode required"),
            ConsoleReply::Status(status) => {
                write!(
                    f,
                    "Door {} | engine {} | users {} | siren {}",
                    status.door,
                    status.phase,
                    status.users,
                    if status.siren_on { "on" } else { "off" }
                )?;
                if let Some(until) = status.hold_until {
                    write!(f, " | hold until {until}")?;
                }
                write!(f, "\nengine {} for {} ticks", status.phase, status.phase_ticks)?;
                for t in &status.recent_phases {
                    write!(f, "\n  {} {} -> {}", t.tick, t.from, t.to)?;
                }
                Ok(())
            }
            ConsoleReply::Users(users) if users.is_empty() => write!(f, "No users"),
            ConsoleReply::Users(users) => {
                for (i, user) in users.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "{:>3} {} level {}{}{}",
                        i,
                        user.credential,
                        user.level,
                        if user.has_pin { " pin" } else { "" },
                        if user.active { "" } else { " revoked" }
                    )?;
                }
                Ok(())
            }
            ConsoleReply::UserAdded(id) => write!(f, "User {id} added"),
            ConsoleReply::UserRevoked(id) => write!(f, "User {id} revoked"),
            ConsoleReply::DoorOpened => write!(f, "Door opened"),
            ConsoleReply::DoorOpenSuppressed => write!(f, "Alarm latched, door stays locked"),
            ConsoleReply::DoorLocked => write!(f, "Door locked"),
            ConsoleReply::AlarmCleared => write!(f, "Alarm cleared"),
            ConsoleReply::NoAlarm => write!(f, "No alarm latched"),
            ConsoleReply::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

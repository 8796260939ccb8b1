//! Emulator configuration file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use warden_core::{
    ControllerConfig, CredentialId, PermissionLevel, Pin, constants::EEPROM_SIZE,
};
use warden_storage::UserRecord;

/// Top-level JSON document read from the path given on the command line.
///
/// ```json
/// {
///   "controller": { "door_hold_ticks": 3000, "secondary_reader_has_keypad": true },
///   "users": [ { "credential": 48879, "level": "standard", "pin": { "plain": "1234" } } ],
///   "eeprom_path": "users.eeprom"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub controller: ControllerConfig,
    /// Compiled-in user table; also the fallback when the EEPROM image is
    /// unusable.
    pub users: Vec<UserRecord>,
    /// File standing in for the I2C EEPROM when `eeprom_enabled` is set.
    pub eeprom_path: PathBuf,
    pub eeprom_size: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            users: demo_users(),
            eeprom_path: PathBuf::from("warden.eeprom"),
            eeprom_size: EEPROM_SIZE,
        }
    }
}

impl EmulatorConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&document).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(document: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(document)?;
        config.controller = config.controller.validated()?;
        Ok(config)
    }
}

/// Users available when no configuration file names any.
fn demo_users() -> Vec<UserRecord> {
    let mut users = vec![
        UserRecord::new(CredentialId::new(0x00BEEF), PermissionLevel::Standard),
        UserRecord::new(CredentialId::new(0x00A11E), PermissionLevel::Privileged),
    ];
    if let Ok(pin) = Pin::new("1234") {
        users.push(UserRecord::new(CredentialId::new(0x00CAFE), PermissionLevel::Standard).with_pin(pin));
    }
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EmulatorConfig::from_json(r#"{ "controller": { "door_hold_ticks": 3000 } }"#).unwrap();
        assert_eq!(config.controller.door_hold_ticks, 3000);
        assert_eq!(config.users.len(), 3);
        assert_eq!(config.eeprom_size, EEPROM_SIZE);
    }

    #[test]
    fn test_users_replace_demo_table() {
        let config = EmulatorConfig::from_json(
            r#"{ "users": [ { "credential": 4660, "level": "privileged", "pin": { "plain": "9876" } } ] }"#,
        )
        .unwrap();
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].credential, CredentialId::new(0x1234));
        assert!(config.users[0].requires_pin());
        assert!(config.users[0].active);
    }

    #[test]
    fn test_invalid_controller_rejected() {
        assert!(EmulatorConfig::from_json(r#"{ "controller": { "door_hold_ticks": 0 } }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "eeprom_path": "/tmp/x.eeprom" }}"#).unwrap();
        let config = EmulatorConfig::load(file.path()).unwrap();
        assert_eq!(config.eeprom_path, PathBuf::from("/tmp/x.eeprom"));
    }
}

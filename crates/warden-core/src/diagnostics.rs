//! Rendering of credential events for the diagnostic log.
//!
//! The configured [`DiagnosticVerbosity`] decides how much of a scan ends up
//! in the log. Callers pass the rendered line to `tracing`; this module only
//! decides what the line says.

use crate::types::{CredentialEvent, CredentialId};
use serde::{Deserialize, Serialize};

/// How much of a credential event the diagnostic log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DiagnosticVerbosity {
    /// Never log credentials.
    None = 0,
    /// Log denied scans only (hexadecimal identifier).
    DeniedOnly = 1,
    /// Log every scan with a hexadecimal identifier.
    Hex = 2,
    /// Log every scan with a decimal identifier.
    Decimal = 3,
    /// Log every scan with the raw bit string and the hexadecimal identifier.
    RawBinary = 4,
}

/// Render a scan for the log, or `None` if this verbosity suppresses it.
///
/// `id` is `None` when decoding failed; `denied` tells whether the scan ended
/// in a Deny (a malformed scan always counts as denied).
#[must_use]
pub fn render_credential(
    verbosity: DiagnosticVerbosity,
    event: &CredentialEvent,
    id: Option<CredentialId>,
    denied: bool,
) -> Option<String> {
    let decoded = match id {
        Some(id) if verbosity == DiagnosticVerbosity::Decimal => id.as_u64().to_string(),
        Some(id) => id.to_string(),
        None => "<malformed>".to_string(),
    };

    match verbosity {
        DiagnosticVerbosity::None => None,
        DiagnosticVerbosity::DeniedOnly if !denied => None,
        DiagnosticVerbosity::DeniedOnly
        | DiagnosticVerbosity::Hex
        | DiagnosticVerbosity::Decimal => Some(format!("{} credential {decoded}", event.reader)),
        DiagnosticVerbosity::RawBinary => Some(format!(
            "{} raw {} ({} bits) credential {decoded}",
            event.reader,
            bit_string(&event.raw),
            event.raw.len()
        )),
    }
}

fn bit_string(raw: &[u8]) -> String {
    raw.iter()
        .map(|b| match b {
            0 => '0',
            1 => '1',
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReaderIndex, Tick};
    use rstest::rstest;

    fn event() -> CredentialEvent {
        CredentialEvent::new(vec![1, 0, 1, 1], ReaderIndex::Primary, Tick::new(7))
    }

    #[rstest]
    #[case(DiagnosticVerbosity::Hex, Some("reader 1 credential FF"))]
    #[case(DiagnosticVerbosity::Decimal, Some("reader 1 credential 255"))]
    #[case(DiagnosticVerbosity::RawBinary, Some("reader 1 raw 1011 (4 bits) credential FF"))]
    #[case(DiagnosticVerbosity::DeniedOnly, None)]
    #[case(DiagnosticVerbosity::None, None)]
    fn test_render_granted(#[case] verbosity: DiagnosticVerbosity, #[case] expected: Option<&str>) {
        let line = render_credential(verbosity, &event(), Some(CredentialId::new(0xFF)), false);
        assert_eq!(line.as_deref(), expected);
    }

    #[test]
    fn test_denied_only_logs_denials() {
        let line = render_credential(
            DiagnosticVerbosity::DeniedOnly,
            &event(),
            Some(CredentialId::new(0xAB)),
            true,
        );
        assert_eq!(line.as_deref(), Some("reader 1 credential AB"));
    }

    #[test]
    fn test_malformed_scan() {
        let line = render_credential(DiagnosticVerbosity::Hex, &event(), None, true);
        assert_eq!(line.as_deref(), Some("reader 1 credential <malformed>"));
        assert!(render_credential(DiagnosticVerbosity::None, &event(), None, true).is_none());
    }
}

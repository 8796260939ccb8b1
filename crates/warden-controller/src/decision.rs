//! Access decisions.

use serde::Serialize;
use std::fmt;
use warden_core::{CredentialId, ReaderIndex, Tick};
use warden_storage::UserRecord;

/// Grant or Deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Grant,
    Deny,
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    // Grants
    CredentialOnly,
    CredentialPlusPin,
    PrivilegedPassword,

    // Denials
    MalformedCredential,
    UnknownCredential,
    InactiveCredential,
    InsufficientPermission,
    PinMismatch,
    PinTimeout,
    PrivilegedPasswordMismatch,
}

impl DecisionReason {
    /// The outcome this reason implies.
    pub fn outcome(self) -> Outcome {
        match self {
            DecisionReason::CredentialOnly
            | DecisionReason::CredentialPlusPin
            | DecisionReason::PrivilegedPassword => Outcome::Grant,
            _ => Outcome::Deny,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DecisionReason::CredentialOnly => "credential only",
            DecisionReason::CredentialPlusPin => "credential and PIN",
            DecisionReason::PrivilegedPassword => "privileged password",
            DecisionReason::MalformedCredential => "malformed credential",
            DecisionReason::UnknownCredential => "unknown credential",
            DecisionReason::InactiveCredential => "inactive credential",
            DecisionReason::InsufficientPermission => "insufficient permission",
            DecisionReason::PinMismatch => "PIN mismatch",
            DecisionReason::PinTimeout => "PIN timeout",
            DecisionReason::PrivilegedPasswordMismatch => "privileged password mismatch",
        };
        f.write_str(reason)
    }
}

/// Result of one evaluation. Transient: produced, acted on, reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub outcome: Outcome,
    pub user: Option<UserRecord>,
    pub reason: DecisionReason,
    /// Reader the evaluation started from; `None` for the console path.
    pub reader: Option<ReaderIndex>,
    pub tick: Tick,
}

impl AccessDecision {
    pub fn new(
        reason: DecisionReason,
        user: Option<UserRecord>,
        reader: Option<ReaderIndex>,
        tick: Tick,
    ) -> Self {
        Self {
            outcome: reason.outcome(),
            user,
            reason,
            reader,
            tick,
        }
    }

    pub fn is_grant(&self) -> bool {
        self.outcome == Outcome::Grant
    }

    pub fn credential(&self) -> Option<CredentialId> {
        self.user.as_ref().map(|u| u.credential)
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Grant => "Grant",
            Outcome::Deny => "Deny",
        };
        write!(f, "{outcome} ({})", self.reason)?;
        if let Some(credential) = self.credential() {
            write!(f, " credential {credential}")?;
        }
        if let Some(reader) = self.reader {
            write!(f, " on {reader}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use warden_core::PermissionLevel;

    #[rstest]
    #[case(DecisionReason::CredentialOnly, Outcome::Grant)]
    #[case(DecisionReason::CredentialPlusPin, Outcome::Grant)]
    #[case(DecisionReason::PrivilegedPassword, Outcome::Grant)]
    #[case(DecisionReason::UnknownCredential, Outcome::Deny)]
    #[case(DecisionReason::PinTimeout, Outcome::Deny)]
    #[case(DecisionReason::PrivilegedPasswordMismatch, Outcome::Deny)]
    fn test_reason_outcome(#[case] reason: DecisionReason, #[case] outcome: Outcome) {
        assert_eq!(reason.outcome(), outcome);
    }

    #[test]
    fn test_display() {
        let user = UserRecord::new(CredentialId::new(0xBEEF), PermissionLevel::Standard);
        let decision = AccessDecision::new(
            DecisionReason::CredentialOnly,
            Some(user),
            Some(ReaderIndex::Secondary),
            Tick::new(1),
        );
        assert_eq!(
            decision.to_string(),
            "Grant (credential only) credential BEEF on reader 2"
        );
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DecisionReason::PinMismatch).unwrap(),
            "\"pin_mismatch\""
        );
    }
}

//! End-to-end credential and PIN flows through the scheduler loop.

mod common;

use common::{CARD, OTHER_PIN_CARD, PIN, PIN_CARD, Rig, UNKNOWN_CARD, wiegand_frame};
use rstest::rstest;
use warden_controller::{DecisionReason, EnginePhase, Outcome};
use warden_core::{CardFormat, ControllerConfig, DoorState, KeypadKey, ReaderIndex};

const HOLD: u64 = 5000;
const KEYPAD_TIMEOUT: u64 = 5000;

#[test]
fn test_unknown_credential_denied_without_door_change() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, UNKNOWN_CARD);

    let report = rig.step();

    assert_eq!(report.decisions.len(), 1);
    assert_eq!(report.decisions[0].outcome, Outcome::Deny);
    assert_eq!(report.decisions[0].reason, DecisionReason::UnknownCredential);
    assert_eq!(report.door, DoorState::Locked);
    assert!(!rig.lock.is_active());
}

#[test]
fn test_grant_relocks_exactly_after_hold() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, CARD);

    let report = rig.step();
    assert_eq!(report.decisions[0].reason, DecisionReason::CredentialOnly);
    assert_eq!(report.door, DoorState::UnlockedTimed);
    assert!(rig.lock.is_active());

    // Granted on tick 1, so the hold runs out on tick 1 + HOLD
    let reports = rig.run_until(HOLD);
    assert!(reports.iter().all(|r| r.door == DoorState::UnlockedTimed));
    assert!(reports.iter().all(|r| !r.relocked));

    let report = rig.step();
    assert_eq!(rig.now().as_u64(), 1 + HOLD);
    assert!(report.relocked);
    assert_eq!(report.door, DoorState::Locked);
    assert!(!rig.lock.is_active());
}

#[test]
fn test_regrant_restarts_hold_timer() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, CARD);
    rig.step();
    rig.run_until(3000);

    rig.scan(ReaderIndex::Primary, CARD);
    rig.step();
    assert_eq!(rig.controller.actuator().hold_until().map(|t| t.as_u64()), Some(3001 + HOLD));

    rig.run_until(HOLD + 1);
    assert_eq!(rig.controller.door_state(), DoorState::UnlockedTimed);
    rig.run_until(3001 + HOLD);
    assert_eq!(rig.controller.door_state(), DoorState::Locked);
}

#[test]
fn test_correct_pin_within_window_grants() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);

    let report = rig.step();
    assert!(report.decisions.is_empty());
    assert_eq!(rig.controller.engine().phase().current(), EnginePhase::AwaitingPin);

    rig.enter_pin(ReaderIndex::Primary, PIN);
    let reports = rig.run(PIN.len() as u64 + 1);
    let decisions: Vec<_> = reports.iter().flat_map(|r| r.decisions.iter()).collect();

    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].reason, DecisionReason::CredentialPlusPin);
    assert_eq!(decisions[0].credential(), Some(PIN_CARD));
    assert_eq!(rig.controller.door_state(), DoorState::UnlockedTimed);
    assert_eq!(rig.controller.engine().phase().current(), EnginePhase::Idle);
}

#[test]
fn test_wrong_pin_denied() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();

    rig.enter_pin(ReaderIndex::Primary, "1111");
    let reports = rig.run(5);
    let decision = reports
        .iter()
        .flat_map(|r| r.decisions.iter())
        .next()
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::PinMismatch);
    assert_eq!(rig.controller.door_state(), DoorState::Locked);
}

#[test]
fn test_pin_after_window_times_out() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();

    let reports = rig.run_until(2 + KEYPAD_TIMEOUT);
    let timeouts: Vec<_> = reports
        .iter()
        .flat_map(|r| r.decisions.iter().map(move |d| (r.tick, d)))
        .collect();

    assert_eq!(timeouts.len(), 1);
    let (tick, decision) = timeouts[0];
    assert_eq!(tick.as_u64(), 2 + KEYPAD_TIMEOUT);
    assert_eq!(decision.reason, DecisionReason::PinTimeout);
    assert!(rig.controller.engine().pending().is_none());
    assert!(
        rig.controller
            .keypad(ReaderIndex::Primary)
            .unwrap()
            .buffer()
            .is_empty()
    );

    // The late PIN has nothing to attach to
    rig.enter_pin(ReaderIndex::Primary, PIN);
    let reports = rig.run(5);
    assert!(reports.iter().all(|r| r.decisions.is_empty()));
    assert_eq!(rig.controller.door_state(), DoorState::Locked);
}

#[test]
fn test_partial_pin_discarded_by_keypad_timeout() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();
    rig.reader(ReaderIndex::Primary)
        .type_keys(&[KeypadKey::Digit(4), KeypadKey::Digit(3)])
        .unwrap();
    rig.run(2);

    // Last key on tick 3
    let reports = rig.run_until(4 + KEYPAD_TIMEOUT);
    let last = reports.last().unwrap();

    assert_eq!(last.keypad_timeouts.len(), 1);
    assert_eq!(last.keypad_timeouts[0].event.discarded, 2);
    assert_eq!(last.decisions.len(), 1);
    assert_eq!(last.decisions[0].reason, DecisionReason::PinTimeout);
    assert_eq!(reports.iter().map(|r| r.decisions.len()).sum::<usize>(), 1);
}

#[test]
fn test_key_press_keeps_window_open() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();
    rig.run_until(4000);

    rig.reader(ReaderIndex::Primary)
        .press_key(KeypadKey::Digit(4))
        .unwrap();
    let reports = rig.run_until(8000);
    assert!(reports.iter().all(|r| r.decisions.is_empty()));

    rig.reader(ReaderIndex::Primary)
        .type_keys(&common::pin_keys("321"))
        .unwrap();
    let reports = rig.run(4);
    let decision = reports.iter().flat_map(|r| r.decisions.iter()).next().unwrap();
    assert_eq!(decision.reason, DecisionReason::CredentialPlusPin);
}

#[test]
fn test_most_recent_credential_wins() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();
    rig.scan(ReaderIndex::Primary, OTHER_PIN_CARD);
    rig.step();

    assert_eq!(
        rig.controller.engine().pending().map(|p| p.user.credential),
        Some(OTHER_PIN_CARD)
    );

    rig.enter_pin(ReaderIndex::Primary, PIN);
    let reports = rig.run(5);
    let decisions: Vec<_> = reports.iter().flat_map(|r| r.decisions.iter()).collect();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].credential(), Some(OTHER_PIN_CARD));
    assert!(decisions[0].is_grant());
}

#[test]
fn test_digits_before_scan_do_not_count() {
    let mut rig = Rig::new();
    rig.reader(ReaderIndex::Primary)
        .type_keys(&[KeypadKey::Digit(4), KeypadKey::Digit(3)])
        .unwrap();
    rig.run(2);
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();

    // Only the last two digits are typed now; "43" from before is gone
    rig.reader(ReaderIndex::Primary)
        .type_keys(&common::pin_keys("21"))
        .unwrap();
    let reports = rig.run(3);
    let decision = reports.iter().flat_map(|r| r.decisions.iter()).next().unwrap();
    assert_eq!(decision.reason, DecisionReason::PinMismatch);
}

#[test]
fn test_reader_without_keypad_grants_on_credential() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Secondary, PIN_CARD);

    let report = rig.step();
    assert_eq!(report.decisions[0].reason, DecisionReason::CredentialOnly);
    assert_eq!(report.decisions[0].reader, Some(ReaderIndex::Secondary));
    assert_eq!(report.door, DoorState::UnlockedTimed);
}

#[test]
fn test_secondary_keypad_enables_pin_flow() {
    let mut rig = Rig::with_config(ControllerConfig::default().with_secondary_keypad(true));
    rig.scan(ReaderIndex::Secondary, PIN_CARD);
    rig.step();

    // A PIN on the other reader does not belong to this entry
    rig.enter_pin(ReaderIndex::Primary, PIN);
    let reports = rig.run(5);
    assert!(reports.iter().all(|r| r.decisions.is_empty()));

    rig.enter_pin(ReaderIndex::Secondary, PIN);
    let reports = rig.run(5);
    let decision = reports.iter().flat_map(|r| r.decisions.iter()).next().unwrap();
    assert_eq!(decision.reason, DecisionReason::CredentialPlusPin);
}

#[rstest]
#[case::leading_parity(0)]
#[case::trailing_parity(25)]
#[case::data_bit(7)]
fn test_corrupted_frame_is_malformed(#[case] flip: usize) {
    let mut rig = Rig::new();
    let mut frame = wiegand_frame(CARD.as_u64(), 26);
    frame[flip] ^= 1;
    rig.reader(ReaderIndex::Primary).present_bits(frame).unwrap();

    let report = rig.step();

    assert_eq!(report.decisions.len(), 1);
    let decision = &report.decisions[0];
    assert_eq!(decision.reason, DecisionReason::MalformedCredential);
    assert!(decision.user.is_none());
    assert_eq!(report.door, DoorState::Locked);
}

#[test]
fn test_wrong_length_frame_is_malformed() {
    let mut rig = Rig::new();
    rig.reader(ReaderIndex::Primary)
        .present_bits(wiegand_frame(CARD.as_u64(), 34))
        .unwrap();

    let report = rig.step();
    assert_eq!(report.decisions[0].reason, DecisionReason::MalformedCredential);
}

#[test]
fn test_malformed_scan_keeps_pending_entry() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, PIN_CARD);
    rig.step();
    rig.reader(ReaderIndex::Primary)
        .present_bits(vec![1, 0, 1])
        .unwrap();
    rig.step();

    assert!(rig.controller.engine().pending().is_some());
    rig.enter_pin(ReaderIndex::Primary, PIN);
    let reports = rig.run(5);
    assert!(reports.iter().flat_map(|r| r.decisions.iter()).any(|d| d.is_grant()));
}

#[test]
fn test_raw_format_uses_leading_bits() {
    let config = ControllerConfig::default().with_card_format(CardFormat::Raw);
    let frame = wiegand_frame(0x1234, 26);
    // Raw keeps everything but the trailing parity bit
    let raw_id = frame[..25]
        .iter()
        .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit));

    let store = warden_storage::StaticStore::new(
        vec![warden_storage::UserRecord::new(
            warden_core::CredentialId::new(raw_id),
            warden_core::PermissionLevel::Standard,
        )],
        warden_core::PrivilegedPassword::new(common::PASSWORD),
    );
    let mut rig = Rig::with_store(config, store);
    rig.reader(ReaderIndex::Primary).present_bits(frame).unwrap();

    let report = rig.step();
    assert!(report.decisions[0].is_grant());
}

#[test]
fn test_both_readers_in_one_tick() {
    let mut rig = Rig::new();
    rig.scan(ReaderIndex::Primary, UNKNOWN_CARD);
    rig.scan(ReaderIndex::Secondary, CARD);

    let report = rig.step();
    let reasons: Vec<_> = report.decisions.iter().map(|d| d.reason).collect();
    assert_eq!(
        reasons,
        vec![DecisionReason::UnknownCredential, DecisionReason::CredentialOnly]
    );
    assert_eq!(report.door, DoorState::UnlockedTimed);
}

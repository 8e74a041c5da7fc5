//! Trial state machine tests.
//!
//! These cover the checker/finalizer contract against a mock store:
//! - finalize writes the full target mapping, idempotently, regardless of
//!   a bogus prior status
//! - store failures propagate with their message intact
//! - the checker checks status before label and refuses to guess when the
//!   label is missing

use std::collections::BTreeMap;

use proptest::prelude::*;

use super::{TrialError, finalize_trial_for_run_mode, is_trying_recovery_system};
use crate::bootenv::{BootVarError, MockBootVarStore, vars};

// ============================================================================
// Helpers
// ============================================================================

fn expected_finalized(status: &str, system: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (vars::RECOVERY_MODE.to_string(), "run".to_string()),
        (vars::RECOVERY_SYSTEM.to_string(), String::new()),
        (vars::RECOVERY_SYSTEM_STATUS.to_string(), status.to_string()),
        (vars::TRY_RECOVERY_SYSTEM.to_string(), system.to_string()),
    ])
}

/// Shared body for the success and failure transitions, mirroring the
/// lifecycle: finalize a pending trial, then finalize again after an
/// external actor scribbled a bogus status over the result.
fn finalize_for_run_mode_case(success: bool, expected_status: &str) {
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "try"),
        (vars::TRY_RECOVERY_SYSTEM, "1234"),
    ]);

    finalize_trial_for_run_mode(&store, success).unwrap();
    assert_eq!(store.snapshot(), expected_finalized(expected_status, "1234"));

    // The status is overwritten even if it is completely bogus.
    store.seed([(vars::RECOVERY_SYSTEM_STATUS, "foobar")]);
    finalize_trial_for_run_mode(&store, success).unwrap();
    assert_eq!(store.snapshot(), expected_finalized(expected_status, "1234"));

    // One store write per finalize call.
    assert_eq!(store.set_calls(), 2);
}

// ============================================================================
// Finalizer
// ============================================================================

#[test]
fn test_finalize_success_records_tried() {
    finalize_for_run_mode_case(true, "tried");
}

#[test]
fn test_finalize_failure_keeps_try() {
    finalize_for_run_mode_case(false, "try");
}

#[test]
fn test_finalize_write_error_propagates_verbatim() {
    let store = MockBootVarStore::new();
    store.fail_writes("set fails");

    let err = finalize_trial_for_run_mode(&store, true).unwrap_err();
    assert_eq!(err.to_string(), "set fails");
    let err = finalize_trial_for_run_mode(&store, false).unwrap_err();
    assert_eq!(err.to_string(), "set fails");
    assert!(matches!(err, TrialError::Store(BootVarError::Write(_))));
}

#[test]
fn test_finalize_read_error_propagates_verbatim() {
    let store = MockBootVarStore::new();
    store.fail_reads("get fails");

    let err = finalize_trial_for_run_mode(&store, true).unwrap_err();
    assert_eq!(err.to_string(), "get fails");
    assert!(matches!(err, TrialError::Store(BootVarError::Read(_))));
    // Nothing was written: the failure came before the single set.
    assert_eq!(store.set_calls(), 0);
}

#[test]
fn test_finalize_with_no_trial_pending_still_clears_override() {
    // A stuck mode override must be cleared even when no trial state was
    // ever written; failure finalize leaves the empty label empty.
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_MODE, "recover"),
        (vars::RECOVERY_SYSTEM, "1234"),
    ]);
    finalize_trial_for_run_mode(&store, false).unwrap();
    assert_eq!(store.snapshot(), expected_finalized("try", ""));
}

// ============================================================================
// Checker
// ============================================================================

#[test]
fn test_checker_empty_status_is_never_a_trial() {
    // No status, no label.
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, ""),
        (vars::TRY_RECOVERY_SYSTEM, ""),
    ]);
    assert!(!is_trying_recovery_system(&store, "1234").unwrap());

    // Status is checked first: an orphaned label alone is not a trial.
    store.seed([(vars::TRY_RECOVERY_SYSTEM, "1234")]);
    assert!(!is_trying_recovery_system(&store, "1234").unwrap());
}

#[test]
fn test_checker_unset_label_under_try_is_an_error() {
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "try"),
        (vars::TRY_RECOVERY_SYSTEM, ""),
    ]);
    let err = is_trying_recovery_system(&store, "1234").unwrap_err();
    assert!(matches!(err, TrialError::TrySystemUnset));
    assert_eq!(err.to_string(), "try recovery system is unset");
}

#[test]
fn test_checker_unset_label_under_unrecognized_status_is_an_error() {
    // Only emptiness of the status short-circuits; any recorded status
    // with a missing label cannot be interpreted safely.
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "foobar"),
        (vars::TRY_RECOVERY_SYSTEM, ""),
    ]);
    let err = is_trying_recovery_system(&store, "1234").unwrap_err();
    assert!(matches!(err, TrialError::TrySystemUnset));
}

#[test]
fn test_checker_matches_same_system() {
    // The usual scenario.
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "try"),
        (vars::TRY_RECOVERY_SYSTEM, "1234"),
    ]);
    assert!(is_trying_recovery_system(&store, "1234").unwrap());

    // Still matches after the system has been finalized as successful.
    store.seed([(vars::RECOVERY_SYSTEM_STATUS, "tried")]);
    assert!(is_trying_recovery_system(&store, "1234").unwrap());
}

#[test]
fn test_checker_rejects_different_system() {
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "try"),
        (vars::TRY_RECOVERY_SYSTEM, "9999"),
    ]);
    assert!(!is_trying_recovery_system(&store, "1234").unwrap());

    // Same when the other system has already been tried.
    store.seed([(vars::RECOVERY_SYSTEM_STATUS, "tried")]);
    assert!(!is_trying_recovery_system(&store, "1234").unwrap());
}

#[test]
fn test_checker_unrecognized_status_compares_label() {
    let store = MockBootVarStore::with_vars([
        (vars::RECOVERY_SYSTEM_STATUS, "foobar"),
        (vars::TRY_RECOVERY_SYSTEM, "1234"),
    ]);
    assert!(is_trying_recovery_system(&store, "1234").unwrap());
    assert!(!is_trying_recovery_system(&store, "9999").unwrap());
}

#[test]
fn test_checker_read_error_propagates_verbatim() {
    let store = MockBootVarStore::new();
    store.fail_reads("get fails");
    let err = is_trying_recovery_system(&store, "1234").unwrap_err();
    assert_eq!(err.to_string(), "get fails");
    assert!(matches!(err, TrialError::Store(BootVarError::Read(_))));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("try".to_string()),
        Just("tried".to_string()),
        "[a-z]{1,12}",
    ]
}

fn arb_label() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[0-9]{4,8}"]
}

proptest! {
    /// Finalizing twice with the same outcome, from any prior snapshot,
    /// lands on the same state as finalizing once, with the mode override
    /// always cleared.
    #[test]
    fn prop_finalize_is_idempotent(
        status in arb_status(),
        label in arb_label(),
        mode in arb_status(),
        system in arb_label(),
        success in any::<bool>(),
    ) {
        let store = MockBootVarStore::with_vars([
            (vars::RECOVERY_SYSTEM_STATUS, status.as_str()),
            (vars::TRY_RECOVERY_SYSTEM, label.as_str()),
            (vars::RECOVERY_MODE, mode.as_str()),
            (vars::RECOVERY_SYSTEM, system.as_str()),
        ]);

        finalize_trial_for_run_mode(&store, success).unwrap();
        let once = store.snapshot();
        finalize_trial_for_run_mode(&store, success).unwrap();
        let twice = store.snapshot();

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once[vars::RECOVERY_MODE].as_str(), "run");
        prop_assert_eq!(once[vars::RECOVERY_SYSTEM].as_str(), "");
        prop_assert_eq!(once[vars::TRY_RECOVERY_SYSTEM].as_str(), label.as_str());
        let expected = if success { "tried" } else { "try" };
        prop_assert_eq!(once[vars::RECOVERY_SYSTEM_STATUS].as_str(), expected);
    }
}

//! Recovery-system trial state machine.
//!
//! A trial is initiated elsewhere: before rebooting into the candidate
//! system, the initiator persists `recovery_system_status=try` together
//! with the candidate's label in `try_recovery_system`. This module
//! implements the two operations the boot path consumes afterwards:
//!
//! - [`is_trying_recovery_system`], asked during the early boot stage
//!   (before run mode) whether the currently running system is the one
//!   under trial, typically to decide which filesystem to activate.
//! - [`finalize_trial_for_run_mode`], called once run mode is reached, to
//!   record the outcome and clear the boot-mode override so the next boot
//!   does not fall back into recovery.
//!
//! # State machine
//!
//! ```text
//!              initiator (external)
//!   (none) ──────────────────────────────► try
//!                                           │
//!                 finalize(success=true)    │   finalize(success=false)
//!              ┌────────────────────────────┤
//!              ▼                            ▼
//!            tried                         try   (label kept; retry or
//!                                                 abandon is policy above)
//! ```
//!
//! Either finalize arm also writes `snapd_recovery_mode=run` and clears
//! `snapd_recovery_system`, unconditionally: the transition is the full
//! target mapping, never a patch, so repeated or interrupted invocations
//! converge and a corrupted prior status cannot wedge the device in a
//! recovery boot loop.
//!
//! Both operations re-read the store every time. Nothing is cached across
//! calls; the store may have been rewritten by another boot or another
//! process in between.

use std::collections::HashMap;

use crate::bootenv::{BootVarStore, vars};

mod error;
mod state;

#[cfg(test)]
mod tests;

pub use error::TrialError;
pub use state::{TrialOutcomeStatus, TrialSnapshot, TrialStatus};

/// Read the current trial snapshot from the store.
fn read_snapshot(store: &dyn BootVarStore) -> Result<TrialSnapshot, TrialError> {
    let values: HashMap<String, String> =
        store.get_boot_vars(&[vars::RECOVERY_SYSTEM_STATUS, vars::TRY_RECOVERY_SYSTEM])?;
    let status = values.get(vars::RECOVERY_SYSTEM_STATUS).map_or("", String::as_str);
    let system = values.get(vars::TRY_RECOVERY_SYSTEM).map_or("", String::as_str);
    Ok(TrialSnapshot::from_raw(status, system))
}

/// Is the currently running system the one under trial?
///
/// Consulted during the early boot stage, before run mode is reached.
/// Both `try` and `tried` statuses match `current_label`: whether this
/// system was the trial subject is a historical fact independent of the
/// outcome recorded. An empty status is never an active trial, even if an
/// orphaned label is present.
///
/// # Errors
///
/// - [`TrialError::Store`] if the store cannot be read.
/// - [`TrialError::TrySystemUnset`] if a status is recorded but the trial
///   label is empty; the caller must treat this as hard, since guessing
///   either way could activate the wrong system.
pub fn is_trying_recovery_system(
    store: &dyn BootVarStore,
    current_label: &str,
) -> Result<bool, TrialError> {
    let snapshot = read_snapshot(store)?;
    snapshot
        .matches(current_label)
        .ok_or(TrialError::TrySystemUnset)
}

/// Record the trial outcome once the boot has reached run mode.
///
/// Persists, in a single store write: `recovery_system_status` as `tried`
/// on success or the unchanged literal `try` on failure (retry or
/// abandonment is decided by policy above this layer), the trial label
/// carried through untouched, `snapd_recovery_mode=run`, and an empty
/// `snapd_recovery_system`.
///
/// The overwrite is unconditional. The prior status is not branched on
/// beyond the success flag, so a corrupted value cannot prevent the mode
/// override from being cleared, and invoking this twice with the same
/// outcome converges to the same persisted state.
///
/// # Errors
///
/// [`TrialError::Store`] if the store cannot be read or the single write
/// cannot be committed; the store guarantees a failed write left prior
/// values unchanged.
pub fn finalize_trial_for_run_mode(
    store: &dyn BootVarStore,
    success: bool,
) -> Result<(), TrialError> {
    let snapshot = read_snapshot(store)?;

    if !snapshot.status.is_recognized() {
        // Overwritten below regardless; worth a trace in the boot log.
        tracing::warn!(
            status = %snapshot.status,
            "overwriting unexpected recovery system status"
        );
    }
    tracing::debug!(
        success,
        system = %snapshot.system,
        "finalizing recovery system trial for run mode"
    );

    store.set_boot_vars(&snapshot.finalized(success))?;
    Ok(())
}

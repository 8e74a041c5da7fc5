//! Recovery-system trial state machine for device boot management.
//!
//! An operating system can attempt booting into an alternate ("trial")
//! recovery system image and durably record whether that attempt succeeded,
//! so subsequent boots make a safe, deterministic decision about which
//! system to use. This crate implements the trial state machine:
//!
//! - [`trial::is_trying_recovery_system`] answers, during the early boot
//!   stage, whether the currently running system is the one under trial.
//! - [`trial::finalize_trial_for_run_mode`] records the trial outcome once
//!   the boot reaches normal run mode and clears the boot-mode override so
//!   subsequent boots do not loop back into recovery.
//!
//! Both operations re-read the [`bootenv::BootVarStore`] on every call and
//! hold no state across invocations: correctness must survive power loss,
//! repeated reboots, and out-of-process mutation of the persisted variables
//! between calls.
//!
//! # Persisted surface
//!
//! The boot variable names and their value strings (see [`bootenv::vars`])
//! are a compatibility surface shared with the bootloader and with external
//! reporting tools; they are preserved bit-for-bit.

pub mod bootenv;
pub mod trial;

pub use bootenv::{BootMode, BootVarError, BootVarStore, EnvFileStore, MockBootVarStore};
pub use trial::{
    TrialError, TrialOutcomeStatus, TrialSnapshot, TrialStatus, finalize_trial_for_run_mode,
    is_trying_recovery_system,
};

//! Trial state machine error types.

use crate::bootenv::BootVarError;

/// Errors from trial checker and finalizer operations.
///
/// A closed set so callers can tell "storage broken" apart from "storage
/// readable but logically malformed" by matching, not by parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    /// The boot variable store failed; the underlying message passes
    /// through verbatim.
    #[error(transparent)]
    Store(#[from] BootVarError),

    /// A trial status is recorded but the trial system label is empty.
    ///
    /// This persisted combination cannot be safely interpreted either way;
    /// guessing could mount the wrong system. The message text is parsed
    /// by external tooling and must stay as is.
    #[error("try recovery system is unset")]
    TrySystemUnset,
}

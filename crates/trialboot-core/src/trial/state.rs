//! Trial status vocabulary and the pure transition core.
//!
//! The persisted trial state is derived from the raw boot variables on
//! every read; nothing here caches. The finalize transition is a pure
//! function from a snapshot and an outcome to the complete next variable
//! mapping, so the store-touching shell in the parent module is a thin
//! read/compute/write wrapper.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bootenv::{BootMode, vars};

/// Status of a recovery-system trial, as persisted in
/// [`vars::RECOVERY_SYSTEM_STATUS`].
///
/// Any string outside the known vocabulary parses as [`Unknown`] rather
/// than failing: a corrupted status must never block boot progress. The
/// raw value is carried so it can be reported and round-tripped.
///
/// [`Unknown`]: TrialStatus::Unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStatus {
    /// No trial is pending or recorded.
    None,
    /// A trial has been requested and has not been finalized.
    Try,
    /// A trial was finalized as successful.
    Tried,
    /// An unexpected persisted value, tolerated on read.
    Unknown(String),
}

// Serialized as the raw persisted string so external reporting tools see
// exactly the wire value, empty string included.
impl Serialize for TrialStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TrialStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

impl TrialStatus {
    /// Parse the raw persisted value.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "" => Self::None,
            "try" => Self::Try,
            "tried" => Self::Tried,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The raw persisted value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "",
            Self::Try => "try",
            Self::Tried => "tried",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the value is inside the known vocabulary.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        matches!(self, Self::None | Self::Try | Self::Tried)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status written by a finalize transition.
///
/// Finalize never writes anything else: success records `tried`, failure
/// leaves the literal `try` in place for retry/fallback policy to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialOutcomeStatus {
    /// The trial failed; the pending `try` marker is kept.
    Try,
    /// The trial succeeded.
    Tried,
}

impl TrialOutcomeStatus {
    /// Map a boot-reached-run-mode outcome to the status to persist.
    #[must_use]
    pub const fn from_success(success: bool) -> Self {
        if success { Self::Tried } else { Self::Try }
    }

    /// The raw persisted value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Try => "try",
            Self::Tried => "tried",
        }
    }
}

/// Trial state derived from the boot variable store.
///
/// Reconstructed from the raw variables on every call; holding one across
/// calls would defeat the resilience to out-of-process mutation between
/// boots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSnapshot {
    /// Parsed [`vars::RECOVERY_SYSTEM_STATUS`].
    pub status: TrialStatus,
    /// Raw [`vars::TRY_RECOVERY_SYSTEM`] label; may be empty.
    pub system: String,
}

impl TrialSnapshot {
    /// Build a snapshot from the raw variable values.
    #[must_use]
    pub fn from_raw(status: &str, system: &str) -> Self {
        Self {
            status: TrialStatus::from_raw(status),
            system: system.to_string(),
        }
    }

    /// Pure checker predicate: does `current_label` name the system under
    /// trial?
    ///
    /// Status is checked before the label: with no status at all, an
    /// orphaned label is not an active trial. With any non-empty status an
    /// empty label is inconsistent and cannot be interpreted either way,
    /// so the answer is `None`; both `try` and `tried` match, because
    /// whether this system was the trial subject is a historical fact
    /// independent of the recorded outcome.
    #[must_use]
    pub fn matches(&self, current_label: &str) -> Option<bool> {
        if self.status == TrialStatus::None {
            return Some(false);
        }
        if self.system.is_empty() {
            return None;
        }
        Some(self.system == current_label)
    }

    /// Pure finalize transition: the complete next variable mapping.
    ///
    /// Always the full target state, never a patch of individual fields,
    /// and never a branch on the prior status beyond the success flag:
    /// a corrupted prior value must not keep the mode override set, or the
    /// device loops back into recovery forever. The trial label is carried
    /// through unchanged.
    #[must_use]
    pub fn finalized(&self, success: bool) -> BTreeMap<String, String> {
        let status = TrialOutcomeStatus::from_success(success);
        BTreeMap::from([
            (
                vars::RECOVERY_MODE.to_string(),
                BootMode::Run.as_str().to_string(),
            ),
            (vars::RECOVERY_SYSTEM.to_string(), String::new()),
            (
                vars::RECOVERY_SYSTEM_STATUS.to_string(),
                status.as_str().to_string(),
            ),
            (vars::TRY_RECOVERY_SYSTEM.to_string(), self.system.clone()),
        ])
    }
}

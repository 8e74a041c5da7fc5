//! Boot variable store contract and backends.
//!
//! The boot variable store is the persistent key/value mechanism that
//! survives reboot and power loss and passes boot decisions between boot
//! stages. This module defines the consumed contract ([`BootVarStore`]),
//! the shared variable vocabulary ([`vars`]), the boot mode vocabulary
//! ([`BootMode`]), and two backends:
//!
//! - [`EnvFileStore`]: a file-backed store with rename-atomic writes.
//! - [`MockBootVarStore`]: an in-memory store with error injection, for
//!   tests of code consuming the contract.
//!
//! # Store contract
//!
//! `get_boot_vars` never fails on absent keys; they read as the empty
//! string. `set_boot_vars` is atomic from the caller's perspective: a
//! successful call is fully applied, a failed call leaves prior values
//! unchanged. Callers issue a single `set_boot_vars` per logical
//! transition and never attempt partial writes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod envfile;
mod mock;

pub use envfile::EnvFileStore;
pub use mock::MockBootVarStore;

/// Boot variable names shared with the bootloader and external tooling.
///
/// These names and their value strings are a compatibility surface and are
/// preserved bit-for-bit.
pub mod vars {
    /// Which boot mode to enter (`run`, `recover`, ...).
    pub const RECOVERY_MODE: &str = "snapd_recovery_mode";

    /// Label of the recovery system to boot into, if overriding the
    /// default; empty when no override is in effect.
    pub const RECOVERY_SYSTEM: &str = "snapd_recovery_system";

    /// Trial status: empty, `try`, or `tried`. Any other string is treated
    /// as an unexpected value, tolerated on read and overwritten on
    /// finalize.
    pub const RECOVERY_SYSTEM_STATUS: &str = "recovery_system_status";

    /// Label of the system currently on trial; may be empty.
    pub const TRY_RECOVERY_SYSTEM: &str = "try_recovery_system";
}

/// Errors from boot variable store operations.
///
/// The underlying error message passes through [`fmt::Display`] verbatim:
/// callers that surface these to boot logs or parse them must see the
/// store's own message, not a wrapper.
#[derive(Debug, thiserror::Error)]
pub enum BootVarError {
    /// The store could not be read.
    #[error(transparent)]
    Read(io::Error),

    /// The store could not be written; prior values are unchanged.
    #[error(transparent)]
    Write(io::Error),
}

/// Persistent key/value store for boot variables.
///
/// Implementations must guarantee that a successful `set_boot_vars` is
/// fully applied and a failed one leaves prior values unchanged, including
/// across power loss.
pub trait BootVarStore {
    /// Read the named variables. Absent keys yield the empty string; the
    /// returned map contains an entry for every requested name.
    ///
    /// # Errors
    ///
    /// Returns [`BootVarError::Read`] if the underlying medium cannot be
    /// read.
    fn get_boot_vars(&self, names: &[&str]) -> Result<HashMap<String, String>, BootVarError>;

    /// Write the given variables, leaving all others unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BootVarError::Write`] if the write cannot be committed;
    /// in that case prior values remain in effect.
    fn set_boot_vars(&self, values: &BTreeMap<String, String>) -> Result<(), BootVarError>;
}

/// Boot mode recorded in [`vars::RECOVERY_MODE`].
///
/// Only [`BootMode::Run`] is ever written by this crate; the remaining
/// modes are read and reported but set by other boot stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootMode {
    /// Normal, non-recovery operation.
    Run,
    /// Boot into the recovery system for repair.
    Recover,
    /// Fresh install from the recovery system.
    Install,
    /// Factory reset from the recovery system.
    FactoryReset,
}

impl BootMode {
    /// Returns the persisted value string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Recover => "recover",
            Self::Install => "install",
            Self::FactoryReset => "factory-reset",
        }
    }
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized boot mode string.
#[derive(Debug, thiserror::Error)]
#[error("unknown boot mode: {0:?}")]
pub struct UnknownBootMode(String);

impl FromStr for BootMode {
    type Err = UnknownBootMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Self::Run),
            "recover" => Ok(Self::Recover),
            "install" => Ok(Self::Install),
            "factory-reset" => Ok(Self::FactoryReset),
            other => Err(UnknownBootMode(other.to_string())),
        }
    }
}

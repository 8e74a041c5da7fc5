//! In-memory boot variable store with error injection.
//!
//! Mirrors what a mock bootloader provides to tests of boot logic: seedable
//! variables, forced read/write failures whose messages reach the caller
//! verbatim, and a write counter for asserting single-`set` behavior.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BootVarError, BootVarStore};

#[derive(Debug, Default)]
struct Inner {
    vars: BTreeMap<String, String>,
    get_err: Option<String>,
    set_err: Option<String>,
    set_calls: u64,
}

/// In-memory [`BootVarStore`] for tests.
#[derive(Debug, Default)]
pub struct MockBootVarStore {
    inner: Mutex<Inner>,
}

impl MockBootVarStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means a panicking test; the inner state is a
    /// plain map and stays usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a mock store seeded with the given variables.
    #[must_use]
    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store.seed(vars);
        store
    }

    /// Overwrite variables directly, bypassing error injection.
    pub fn seed<K, V>(&self, vars: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut inner = self.lock();
        for (key, value) in vars {
            inner.vars.insert(key.into(), value.into());
        }
    }

    /// Make every subsequent `get_boot_vars` fail with `message`.
    pub fn fail_reads(&self, message: &str) {
        self.lock().get_err = Some(message.to_string());
    }

    /// Make every subsequent `set_boot_vars` fail with `message`, leaving
    /// the stored variables untouched.
    pub fn fail_writes(&self, message: &str) {
        self.lock().set_err = Some(message.to_string());
    }

    /// Number of `set_boot_vars` calls made, including failed ones.
    #[must_use]
    pub fn set_calls(&self) -> u64 {
        self.lock().set_calls
    }

    /// Snapshot of the stored variables.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().vars.clone()
    }
}

impl BootVarStore for MockBootVarStore {
    fn get_boot_vars(&self, names: &[&str]) -> Result<HashMap<String, String>, BootVarError> {
        let inner = self.lock();
        if let Some(message) = &inner.get_err {
            return Err(BootVarError::Read(io::Error::other(message.clone())));
        }
        Ok(names
            .iter()
            .map(|&name| {
                let value = inner.vars.get(name).cloned().unwrap_or_default();
                (name.to_string(), value)
            })
            .collect())
    }

    fn set_boot_vars(&self, values: &BTreeMap<String, String>) -> Result<(), BootVarError> {
        let mut inner = self.lock();
        inner.set_calls += 1;
        if let Some(message) = &inner.set_err {
            return Err(BootVarError::Write(io::Error::other(message.clone())));
        }
        for (key, value) in values {
            inner.vars.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

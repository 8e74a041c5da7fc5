//! File-backed boot variable store.
//!
//! Variables are persisted as `key=value` lines in a single env file owned
//! by the boot stack. Writes stage the complete new contents in a temporary
//! file in the same directory, fsync it, rename it over the live file, and
//! fsync the directory, so a `set_boot_vars` that returns `Ok` is fully on
//! disk and an interrupted one leaves the prior contents intact. This is
//! the all-or-nothing guarantee the trial state machine assumes of its
//! store.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{BootVarError, BootVarStore};

/// Boot variable store persisted as `key=value` lines in a single file.
///
/// A missing file reads as a store with every variable empty; the file is
/// created on first write.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    /// Create a store backed by the env file at `path`.
    ///
    /// The file is not touched until the first read or write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing env file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full on-disk snapshot. A missing file is an empty snapshot.
    fn load(&self) -> io::Result<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err),
        };

        let mut snapshot = BTreeMap::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "malformed boot env line {} in {}: missing '='",
                        idx + 1,
                        self.path.display()
                    ),
                ));
            };
            snapshot.insert(key.to_string(), value.to_string());
        }
        Ok(snapshot)
    }

    /// Replace the on-disk snapshot atomically.
    fn commit(&self, snapshot: &BTreeMap<String, String>) -> io::Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("boot env path has no parent directory: {}", self.path.display()),
            )
        })?;

        let mut contents = String::new();
        for (key, value) in snapshot {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(value);
            contents.push('\n');
        }

        let mut staged = tempfile::Builder::new()
            .prefix(".bootenv-")
            .tempfile_in(dir)?;
        staged.write_all(contents.as_bytes())?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .map_err(|persist_err| persist_err.error)?;

        // The rename itself must survive power loss too.
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    fn validate(values: &BTreeMap<String, String>) -> io::Result<()> {
        for (key, value) in values {
            if key.is_empty() || key.contains('=') || key.contains('\n') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid boot variable name {key:?}"),
                ));
            }
            if value.contains('\n') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid value for boot variable {key:?}: contains newline"),
                ));
            }
        }
        Ok(())
    }
}

impl BootVarStore for EnvFileStore {
    fn get_boot_vars(&self, names: &[&str]) -> Result<HashMap<String, String>, BootVarError> {
        let snapshot = self.load().map_err(BootVarError::Read)?;
        Ok(names
            .iter()
            .map(|&name| {
                let value = snapshot.get(name).cloned().unwrap_or_default();
                (name.to_string(), value)
            })
            .collect())
    }

    fn set_boot_vars(&self, values: &BTreeMap<String, String>) -> Result<(), BootVarError> {
        Self::validate(values).map_err(BootVarError::Write)?;

        // Merge into the current snapshot; the whole file is rewritten, so
        // the read is part of the write path and fails as one.
        let mut snapshot = self.load().map_err(BootVarError::Write)?;
        for (key, value) in values {
            snapshot.insert(key.clone(), value.clone());
        }
        self.commit(&snapshot).map_err(BootVarError::Write)
    }
}

//! File-backed save storage.
//!
//! Each slot is one JSON file, `<save_dir>/<slot>.json`. Writes go to a
//! temporary file first and are renamed into place so a crash mid-write
//! never leaves a truncated save behind. A save that fails to load can be
//! moved aside to `<slot>.json.bad`, a name no slot maps to.

use std::path::{Path, PathBuf};

use caravan_core::{PersistenceError, PersistenceSink};
use tracing::{debug, warn};

/// Stores saves as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// A sink writing into `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the sink writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move a slot's file to `<slot>.json.bad` so later saves to the slot
    /// leave it intact. Returns the new path, or `None` for an empty slot.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::Storage`] for invalid slot names or a failed
    /// rename.
    pub fn set_aside(&self, slot: &str) -> Result<Option<PathBuf>, PersistenceError> {
        let path = self.slot_path(slot)?;
        let bad = path.with_extension("json.bad");
        match std::fs::rename(&path, &bad) {
            Ok(()) => {
                warn!(slot, path = %bad.display(), "save set aside");
                Ok(Some(bad))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(slot, &e)),
        }
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(storage_error(slot, &"slot names may only contain [A-Za-z0-9_-]"));
        }
        Ok(self.dir.join(format!("{slot}.json")))
    }
}

impl PersistenceSink for FileSink {
    fn store(&mut self, slot: &str, payload: &str) -> Result<(), PersistenceError> {
        let path = self.slot_path(slot)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::create_dir_all(&self.dir).map_err(|e| storage_error(slot, &e))?;
        std::fs::write(&tmp, payload).map_err(|e| storage_error(slot, &e))?;
        std::fs::rename(&tmp, &path).map_err(|e| storage_error(slot, &e))?;
        debug!(slot, path = %path.display(), bytes = payload.len(), "save written");
        Ok(())
    }

    fn fetch(&self, slot: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.slot_path(slot)?;
        match std::fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(slot, &e)),
        }
    }
}

fn storage_error(slot: &str, reason: &dyn core::fmt::Display) -> PersistenceError {
    PersistenceError::Storage {
        slot: slot.to_owned(),
        reason: reason.to_string(),
    }
}

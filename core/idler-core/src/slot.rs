//! The persisted AppID slot: a single-line text file.
//!
//! The session component reads the same file during initialization, so the
//! default location is the working directory under the name the component
//! expects.

use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::appid;
use crate::error::{IdlerError, Result};

pub const SLOT_FILE: &str = "steam_appid.txt";

pub struct AppIdSlot {
    path: PathBuf,
}

impl AppIdSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_current_dir() -> Self {
        Self::new(SLOT_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of the file, trimmed. `None` when the file is missing,
    /// unreadable or blank.
    pub fn load(&self) -> Option<String> {
        let data = fs::read_to_string(&self.path).ok()?;
        let line = appid::trim(data.lines().next().unwrap_or(""));
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    /// Overwrite the slot atomically (write to a sibling, then rename).
    pub fn save(&self, appid: &str) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, format!("{}\n", appid)).map_err(|source| IdlerError::SlotWrite {
            path: self.path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| IdlerError::SlotWrite {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), appid, "Persisted AppID");
        Ok(())
    }
}

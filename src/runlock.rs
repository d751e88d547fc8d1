//! Advisory lock serializing backup runs against one output directory.
//!
//! Two overlapping runs would race on rotation (both list, both delete).
//! The lock is an fs2 exclusive lock on `<out_dir>/.sqlsnap.lock`,
//! released on Drop. External schedulers should still avoid overlap; this
//! turns an overlap into a clean `LockHeld` failure instead of a race.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::errors::{BackupError, Result};

pub const LOCK_FILE_NAME: &str = ".sqlsnap.lock";

pub struct RunLock {
    file: std::fs::File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the exclusive run lock. Fails immediately with
    /// `LockHeld` if another run owns it — waiting would only stack up
    /// timer-fired runs behind each other.
    pub fn try_acquire(out_dir: &Path) -> Result<Self> {
        let path = out_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| BackupError::LockHeld(out_dir.to_path_buf()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

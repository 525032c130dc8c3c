//! Advisory, host-local lock files
//!
//! A [`LockFile`] guards one logical resource through `<resource>.lock`.
//! Acquisition never blocks: a held lock is reported as `Ok(false)` so the
//! caller can abort with an "already running" outcome. The lock is released
//! on [`LockFile::release`] or when the value is dropped, so every exit path
//! of the owning scope (including unwinding) gives it back. The file itself
//! is left on disk as an existence marker.

use crate::error::LockError;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix appended to a resource path to form its lock file
pub const LOCK_SUFFIX: &str = ".lock";

/// Lock file path for a resource (`/srv/backups` -> `/srv/backups.lock`)
pub fn lock_path_for(resource: &Path) -> PathBuf {
    let mut path = resource.as_os_str().to_owned();
    path.push(LOCK_SUFFIX);
    PathBuf::from(path)
}

/// Non-reentrant advisory lock bound to a file path
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    file: Option<File>,
}

impl LockFile {
    /// Lock on an explicit lock file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Lock guarding `resource` through `<resource>.lock`
    pub fn for_resource(resource: &Path) -> Self {
        Self::new(lock_path_for(resource))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Try to take the lock without waiting.
    ///
    /// Returns `Ok(false)` when another holder has it, including another
    /// `LockFile` in this process, and when this value already holds it.
    pub fn try_acquire(&mut self) -> Result<bool, LockError> {
        if self.file.is_some() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| LockError::Open {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| LockError::Open {
                path: self.path.clone(),
                source,
            })?;

        let acquired = file.try_lock_exclusive().map_err(|source| LockError::Lock {
            path: self.path.clone(),
            source,
        })?;

        if !acquired {
            debug!("Lock {} is held elsewhere", self.path.display());
            return Ok(false);
        }

        // Record the holder; purely informational
        if file.set_len(0).is_ok() {
            let _ = writeln!(file, "{}", std::process::id());
        }

        debug!("Acquired lock {}", self.path.display());
        self.file = Some(file);
        Ok(true)
    }

    /// Give the lock back. Safe to call when not held.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!("Failed to unlock {}: {}", self.path.display(), e);
            } else {
                debug!("Released lock {}", self.path.display());
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.release();
    }
}

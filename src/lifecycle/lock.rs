//! Per-target advisory locking
//!
//! Mutating actions hold a non-blocking exclusive lock on a `.lock` file in
//! the target's working directory. A contended lock fails immediately with
//! [`BackupError::Lock`]; the caller never waits. Different targets use
//! different lock files and are fully independent.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{BackupError, BackupResult};

/// RAII guard for the per-target lock file
///
/// The lock is released when the guard drops; the lock file itself is left
/// in place.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Acquire the lock, failing immediately if it is already held
    pub fn acquire(path: &Path) -> BackupResult<LockGuard> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                BackupError::Lock(path.display().to_string())
            } else {
                BackupError::Io(e.to_string())
            }
        })?;
        Ok(LockGuard {
            file,
            path: path.to_path_buf(),
        })
    }

    /// The lock file this guard holds
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

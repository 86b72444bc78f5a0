//! Snapshot catalog
//!
//! Scans a target's `snapshots/` directory and parses each entry into a
//! [`Snapshot`] record. Only plain directories (never symlinks) whose name
//! is all digits count; staging directories, retired `*.remove` directories
//! and alias symlinks are invisible here by construction.

use std::fs;
use std::path::Path;

use crate::error::BackupResult;
use crate::models::Snapshot;

/// List the committed snapshots under `directory`
///
/// A missing directory is an empty catalog, not an error. The result is
/// unsorted; callers order it as needed.
pub fn read_snapshots(directory: &Path) -> BackupResult<Vec<Snapshot>> {
    if !directory.exists() {
        return Ok(Vec::new());
    }
    let mut snapshots = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        // file_type() does not follow symlinks.
        let file_type = entry.file_type()?;
        if file_type.is_symlink() || !file_type.is_dir() {
            continue;
        }
        if let Some(snapshot) = Snapshot::from_path(&entry.path()) {
            snapshots.push(snapshot);
        }
    }
    Ok(snapshots)
}

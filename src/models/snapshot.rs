//! Snapshot model
//!
//! A snapshot is one committed backup directory whose name is the decimal
//! rendering of its creation timestamp. The directory tree itself is the
//! only durable state; `Snapshot` records are derived from a listing each
//! time an action runs and are never persisted.

use std::path::{Path, PathBuf};

/// One committed, timestamp-named snapshot directory
///
/// Ordering is by timestamp; the crate sorts descending everywhere it
/// needs "most recent first".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot {
    /// Creation time in whole seconds since the epoch
    pub timestamp: i64,
    /// Directory name, always equal to `timestamp.to_string()`
    pub dirname: String,
    /// Absolute path of the snapshot directory
    pub path: PathBuf,
}

impl Snapshot {
    /// Parse a snapshot from its directory path
    ///
    /// Returns `None` unless the final path component is a non-empty
    /// all-digit string that fits a 64-bit timestamp.
    pub fn from_path(path: &Path) -> Option<Self> {
        let dirname = path.file_name()?.to_str()?.to_string();
        if dirname.is_empty() || !dirname.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let timestamp = dirname.parse::<i64>().ok()?;
        // Leading zeros would break `dirname == timestamp.to_string()`.
        if timestamp.to_string() != dirname {
            return None;
        }
        Some(Self {
            timestamp,
            dirname,
            path: path.to_path_buf(),
        })
    }
}

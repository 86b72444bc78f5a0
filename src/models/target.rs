//! Target and retention models
//!
//! A target is one named backup destination: a retention policy, the rsync
//! invocation pieces, optional reachability probes and an ordered list of
//! backup specs. Targets are produced fully validated by the `config`
//! module; nothing here re-checks them at action time.

use std::path::{Component, Path, PathBuf};

use crate::clock::Granularity;
use crate::error::{BackupError, BackupResult};

/// How many snapshots to retain per time bucket
///
/// A count of zero disables that bucket entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub hourly: u32,
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub yearly: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            hourly: 6,
            daily: 7,
            weekly: 4,
            monthly: 6,
            yearly: 0,
        }
    }
}

impl RetentionPolicy {
    /// The retention count for one granularity
    pub fn count(&self, granularity: Granularity) -> u32 {
        match granularity {
            Granularity::Hourly => self.hourly,
            Granularity::Daily => self.daily,
            Granularity::Weekly => self.weekly,
            Granularity::Monthly => self.monthly,
            Granularity::Yearly => self.yearly,
        }
    }

    /// True when every bucket is disabled
    pub fn is_disabled(&self) -> bool {
        Granularity::ALL.iter().all(|&g| self.count(g) == 0)
    }
}

/// One source tree copied into every snapshot of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSpec {
    /// rsync source (local path or remote `host:path` spec)
    pub source: String,
    /// Destination relative to the snapshot root; empty means the root itself
    pub dest: String,
    /// Extra rsync options for this backup only
    pub options: Vec<String>,
}

impl BackupSpec {
    /// Build a spec, validating that `dest` stays inside the snapshot
    pub fn new(source: String, dest: String, options: Vec<String>) -> BackupResult<Self> {
        if source.is_empty() {
            return Err(BackupError::Config("source is required for backup".into()));
        }
        let dest = validate_dest(&dest)?;
        Ok(Self { source, dest, options })
    }
}

/// Reject absolute destinations and ones that escape the snapshot via `..`
fn validate_dest(dest: &str) -> BackupResult<String> {
    let path = Path::new(dest);
    let mut depth: i32 = 0;
    let escapes = path.components().any(|c| match c {
        Component::RootDir | Component::Prefix(_) => true,
        Component::ParentDir => {
            depth -= 1;
            depth < 0
        }
        Component::Normal(_) => {
            depth += 1;
            false
        }
        Component::CurDir => false,
    });
    if escapes {
        return Err(BackupError::Config(format!(
            "destination must be a relative path inside the snapshot directory: {}",
            dest
        )));
    }
    if depth == 0 {
        // "", "." and "a/.." all mean the snapshot root.
        return Ok(String::new());
    }
    Ok(dest.to_string())
}

/// One named backup target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target name; no path separators, never the reserved word "all"
    pub name: String,
    /// Generational retention counts
    pub retention: RetentionPolicy,
    /// Path of the rsync binary
    pub rsync_bin: String,
    /// Options passed to every rsync invocation
    pub rsync_defaults: Vec<String>,
    /// Target-level rsync options
    pub rsync_options: Vec<String>,
    /// Patterns passed as `--exclude` arguments
    pub rsync_exclude: Vec<String>,
    /// Reachability probe command, invoked once per host in `ping_hosts`
    pub ping_cmd: Vec<String>,
    /// Hosts that must answer the probe before a sync is attempted
    pub ping_hosts: Vec<String>,
    /// Source trees copied into each snapshot
    pub backups: Vec<BackupSpec>,
    /// strftime pattern for the per-snapshot alias symlinks
    pub link_fmt: String,
    /// Root under which every target keeps its working directory
    pub backup_directory: PathBuf,
}

impl Target {
    /// The per-target working directory, `backup_directory/name`
    pub fn work_dir(&self) -> PathBuf {
        self.backup_directory.join(&self.name)
    }
}

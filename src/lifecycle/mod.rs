//! Lifecycle controller
//!
//! Drives one action across a list of targets, one target at a time, in the
//! caller-supplied order. Owns the per-target lock, the sync skip guard, the
//! chaining of rotate after sync and the per-target error policy: a failed
//! target is logged and recorded, never fatal for the remaining targets.

pub mod lock;

use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use tracing::{debug, warn};

use crate::catalog::read_snapshots;
use crate::clock::{Clock, Granularity};
use crate::effect::{Effect, EffectRunner, OsRunner};
use crate::error::{BackupError, BackupResult};
use crate::models::{RetentionPolicy, RunOptions, Target};
use crate::planner::{plan_rotate, plan_sync, refresh_aliases};
use crate::retention::{self, KeepBuckets};

use lock::LockGuard;

/// Name of the per-target lock file
pub const LOCK_FILE: &str = ".lock";

/// The three user-visible actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new snapshot per target
    Sync,
    /// Retire snapshots outside the retention policy
    Rotate,
    /// Report snapshots and their bucket membership
    Status,
}

/// Run `action` for every target; returns the names of the targets that failed
pub fn run_action(action: Action, options: &RunOptions, targets: &[Target]) -> Vec<String> {
    let padding = match action {
        Action::Status => print_status_header(targets),
        _ => 0,
    };

    let mut failed = Vec::new();
    for target in targets {
        if let Err(e) = run_target(action, options, target, padding) {
            warn!("[{}] Error: {}", target.name, e);
            failed.push(target.name.clone());
        }
    }
    if !failed.is_empty() {
        warn!("The following targets had errors: {}", failed.join(","));
    }
    failed
}

/// Prepare the working directory and dispatch one target
fn run_target(
    action: Action,
    options: &RunOptions,
    target: &Target,
    padding: usize,
) -> BackupResult<()> {
    if !target.backup_directory.exists() {
        return Err(BackupError::Io(format!(
            "backup directory does not exist: {}",
            target.backup_directory.display()
        )));
    }
    let work_dir = target.work_dir();
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(&work_dir)?;

    match action {
        Action::Sync => sync_target(options, target, &work_dir),
        Action::Rotate => rotate_target(options, target, &work_dir),
        Action::Status => status_target(options, target, &work_dir, padding),
    }
}

/// Sync one target under its lock, then optionally chain into rotate
fn sync_target(options: &RunOptions, target: &Target, work_dir: &Path) -> BackupResult<()> {
    let timestamp = options.clock.now();
    {
        let _lock = LockGuard::acquire(&work_dir.join(LOCK_FILE))?;
        let snapshots = read_snapshots(&work_dir.join("snapshots"))?;
        let plan = retention::rotate(&target.retention, options.clock, &snapshots)?;

        if !options.force
            && interval_already_covered(&target.retention, &plan.keep, options.clock, timestamp)?
        {
            debug!(
                "Target {} already has a snapshot for the current interval",
                target.name
            );
            return Ok(());
        }

        let link_dest = snapshots.iter().max().map(|s| s.path.clone());
        let mut runner = OsRunner::new();
        plan_sync(
            &mut runner,
            options,
            target,
            work_dir,
            timestamp,
            link_dest.as_deref(),
        )?;
        if !options.dry_run {
            refresh_aliases(&mut runner, options.clock, target, work_dir)?;
        }
    }

    if options.rotate_after_sync {
        rotate_target(options, target, work_dir)?;
    }
    Ok(())
}

/// Rotate one target: rename under the lock, delete outside it
fn rotate_target(options: &RunOptions, target: &Target, work_dir: &Path) -> BackupResult<()> {
    let mut runner = OsRunner::new();
    let retired = {
        let _lock = LockGuard::acquire(&work_dir.join(LOCK_FILE))?;
        let snapshots = read_snapshots(&work_dir.join("snapshots"))?;
        let retired = plan_rotate(&mut runner, options, target, &snapshots)?;
        if !options.dry_run {
            refresh_aliases(&mut runner, options.clock, target, work_dir)?;
        }
        retired
    };

    for path in retired {
        runner.run_unit(Effect::RemoveTree {
            path,
            ignore_errors: false,
        })?;
    }
    Ok(())
}

/// Whether the first enabled bucket already holds a snapshot for "now"
///
/// The fixed hourly > daily > weekly > monthly > yearly priority is
/// deliberate: only the finest enabled granularity decides, coarser ones
/// are never consulted. With every bucket disabled a sync would retain
/// nothing, so it is skipped too.
fn interval_already_covered(
    retention: &RetentionPolicy,
    keep: &KeepBuckets,
    clock: Clock,
    now: i64,
) -> BackupResult<bool> {
    for granularity in Granularity::ALL {
        if retention.count(granularity) == 0 {
            continue;
        }
        let current = clock.bucket_label(granularity, now)?;
        for snapshot in keep.bucket(granularity) {
            if clock.bucket_label(granularity, snapshot.timestamp)? == current {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    Ok(true)
}

/// Print the snapshot table for one target, newest first
fn status_target(
    options: &RunOptions,
    target: &Target,
    work_dir: &Path,
    padding: usize,
) -> BackupResult<()> {
    let mut snapshots = read_snapshots(&work_dir.join("snapshots"))?;
    let plan = retention::rotate(&target.retention, options.clock, &snapshots)?;
    snapshots.sort_by(|a, b| b.cmp(a));

    for snapshot in &snapshots {
        let marks: Vec<String> = Granularity::ALL
            .iter()
            .map(|&g| {
                if plan.keep.retains(g, snapshot) {
                    g.marker().to_string()
                } else {
                    " ".to_string()
                }
            })
            .collect();
        println!(
            "{:<width$}  {}  {}",
            target.name,
            options.clock.format(snapshot.timestamp, "%Y-%m-%d %H:%M   %W")?,
            marks.join(" "),
            width = padding,
        );
    }
    Ok(())
}

/// Print the status header; returns the name column width
fn print_status_header(targets: &[Target]) -> usize {
    let padding = targets
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0)
        .max(6);
    println!("{:<width$}  Date       Time  Week  Snapshot ", "Target", width = padding);
    println!("{}==================================", "=".repeat(padding));
    padding
}

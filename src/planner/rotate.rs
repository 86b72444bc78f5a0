//! The rotate planner
//!
//! Retires every snapshot the retention policy no longer keeps by renaming
//! it to `<dirname>.remove`. The rename is the only step that must happen
//! under the target lock; the returned paths are deleted by the caller
//! afterwards, outside the lock, since recursive deletion is slow and no
//! longer changes what a concurrent listing observes.

use std::path::PathBuf;

use tracing::info;

use crate::effect::{Effect, EffectRunner};
use crate::error::BackupResult;
use crate::models::{RunOptions, Snapshot, Target};
use crate::retention;

/// Suffix marking a retired snapshot awaiting deletion
pub const REMOVE_SUFFIX: &str = ".remove";

/// Rename removable snapshots aside; returns the renamed paths
///
/// In dry-run mode the removals are only logged and nothing is renamed.
pub fn plan_rotate(
    runner: &mut dyn EffectRunner,
    options: &RunOptions,
    target: &Target,
    snapshots: &[Snapshot],
) -> BackupResult<Vec<PathBuf>> {
    let plan = retention::rotate(&target.retention, options.clock, snapshots)?;

    let mut retired = Vec::new();
    for snapshot in &plan.remove {
        info!(
            "Removing snapshot for target {} from {}",
            target.name,
            options.clock.display(snapshot.timestamp)?
        );
        if options.dry_run {
            continue;
        }
        let mut renamed = snapshot.path.clone().into_os_string();
        renamed.push(REMOVE_SUFFIX);
        let renamed = PathBuf::from(renamed);
        runner.run_unit(Effect::Rename {
            src: snapshot.path.clone(),
            dst: renamed.clone(),
        })?;
        retired.push(renamed);
    }
    Ok(retired)
}

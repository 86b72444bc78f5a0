//! The alias refresher
//!
//! Keeps one human-readable symlink per snapshot at the top of the target's
//! working directory, named by formatting the snapshot timestamp with the
//! target's `link_fmt`. All existing non-hidden symlinks are removed first,
//! then one link per snapshot is recreated. When two snapshots format to
//! the same name, the newer one wins: the map is filled in ascending
//! timestamp order so later inserts overwrite earlier ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::read_snapshots;
use crate::clock::Clock;
use crate::effect::{Effect, EffectRunner};
use crate::error::BackupResult;
use crate::models::{Snapshot, Target};

/// Rebuild the alias symlinks for `target`
pub fn refresh_aliases(
    runner: &mut dyn EffectRunner,
    clock: Clock,
    target: &Target,
    work_dir: &Path,
) -> BackupResult<()> {
    for link in existing_aliases(work_dir)? {
        runner.run_unit(Effect::RemoveFile { path: link })?;
    }

    let mut snapshots = read_snapshots(&work_dir.join("snapshots"))?;
    snapshots.sort();

    let mut names: BTreeMap<String, Snapshot> = BTreeMap::new();
    for snapshot in snapshots {
        let name = clock.format(snapshot.timestamp, &target.link_fmt)?;
        names.insert(name, snapshot);
    }

    for (name, snapshot) in names {
        runner.run_unit(Effect::Symlink {
            // Always relative, so the whole tree can be moved or remounted.
            target: Path::new("snapshots").join(&snapshot.dirname),
            link: work_dir.join(name),
        })?;
    }
    Ok(())
}

/// The non-hidden top-level symlinks currently in the working directory
fn existing_aliases(work_dir: &Path) -> BackupResult<Vec<PathBuf>> {
    let mut links = Vec::new();
    for entry in fs::read_dir(work_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_symlink() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        links.push(entry.path());
    }
    Ok(links)
}

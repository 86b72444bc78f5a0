//! The sync planner
//!
//! Stages a new snapshot in a hidden temporary directory, fills it with one
//! rsync run per backup spec, and commits it with a single atomic rename to
//! its timestamp name. A crash or failure at any earlier point leaves only
//! a discardable staging directory, never a half-visible snapshot.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::effect::{Effect, EffectRunner};
use crate::error::BackupResult;
use crate::models::{BackupSpec, RunOptions, Target};

/// rsync exit codes treated as success
///
/// 24 is "some files vanished before they could be transferred", routine
/// when backing up a live system.
pub const RSYNC_SUCCESS: [i32; 2] = [0, 24];

/// Probe exit codes the planner inspects itself: 0 = up, 1 = down
const PING_CODES: [i32; 2] = [0, 1];

/// Permission bits applied to a snapshot at commit time
const SNAPSHOT_MODE: u32 = 0o755;

/// How a sync run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A snapshot was committed at this path
    Committed(PathBuf),
    /// Dry run: transfers were simulated, nothing was committed
    DryRun,
    /// A probe host was down; the sync was skipped without error
    HostDown,
}

/// Plan and drive one sync for `target`
///
/// `link_dest` is the most recent existing snapshot, passed to rsync so
/// unchanged files become hard links instead of copies.
pub fn plan_sync(
    runner: &mut dyn EffectRunner,
    options: &RunOptions,
    target: &Target,
    work_dir: &Path,
    timestamp: i64,
    link_dest: Option<&Path>,
) -> BackupResult<SyncOutcome> {
    let snapshots_dir = work_dir.join("snapshots");
    runner.run_unit(Effect::MakeDir {
        path: snapshots_dir.clone(),
        recursive: true,
    })?;

    for host in &target.ping_hosts {
        let mut argv = target.ping_cmd.clone();
        argv.push(host.clone());
        let code = runner.run_exit(Effect::RunProcess {
            argv,
            ok_codes: PING_CODES.to_vec(),
            silent: true,
        })?;
        if code == 1 {
            info!(
                "Host {} is not up, skipping sync for target {}",
                host, target.name
            );
            return Ok(SyncOutcome::HostDown);
        }
    }

    info!(
        "Creating new snapshot for target {} at {}",
        target.name,
        options.clock.display(timestamp)?
    );
    let staging = runner.run_path(Effect::MakeTempDir {
        prefix: ".rsync.".into(),
        parent: snapshots_dir.clone(),
    })?;

    if let Err(e) = run_transfers(runner, options, target, &staging, link_dest) {
        // Best-effort cleanup before re-raising the transfer failure.
        let _ = runner.run(Effect::RemoveTree {
            path: staging,
            ignore_errors: true,
        });
        return Err(e);
    }

    if options.dry_run {
        runner.run_unit(Effect::RemoveTree {
            path: staging,
            ignore_errors: false,
        })?;
        return Ok(SyncOutcome::DryRun);
    }

    let committed = snapshots_dir.join(timestamp.to_string());
    runner.run_unit(Effect::Touch {
        path: staging.clone(),
    })?;
    runner.run_unit(Effect::Chmod {
        path: staging.clone(),
        mode: SNAPSHOT_MODE,
    })?;
    runner.run_unit(Effect::Rename {
        src: staging,
        dst: committed.clone(),
    })?;
    Ok(SyncOutcome::Committed(committed))
}

/// One mkdir + rsync per backup spec, into the staging directory
fn run_transfers(
    runner: &mut dyn EffectRunner,
    options: &RunOptions,
    target: &Target,
    staging: &Path,
    link_dest: Option<&Path>,
) -> BackupResult<()> {
    for backup in &target.backups {
        let dst = if backup.dest.is_empty() {
            staging.to_path_buf()
        } else {
            staging.join(&backup.dest)
        };
        runner.run_unit(Effect::MakeDir {
            path: dst.clone(),
            recursive: true,
        })?;
        runner.run_exit(Effect::RunProcess {
            argv: rsync_argv(options, target, backup, &dst, link_dest),
            ok_codes: RSYNC_SUCCESS.to_vec(),
            silent: false,
        })?;
    }
    Ok(())
}

/// Assemble the rsync command line for one backup spec
fn rsync_argv(
    options: &RunOptions,
    target: &Target,
    backup: &BackupSpec,
    dst: &Path,
    link_dest: Option<&Path>,
) -> Vec<String> {
    let mut argv = vec![target.rsync_bin.clone()];
    if options.dry_run {
        argv.push("--dry-run".into());
    }
    argv.extend(target.rsync_defaults.iter().cloned());
    argv.extend(target.rsync_options.iter().cloned());
    argv.extend(backup.options.iter().cloned());
    for pattern in &target.rsync_exclude {
        argv.push("--exclude".into());
        argv.push(pattern.clone());
    }
    if let Some(prior) = link_dest {
        argv.push("--link-dest".into());
        argv.push(prior.display().to_string());
    }
    argv.push(backup.source.clone());
    argv.push(dst.display().to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::script::{created, done, exited, ScriptedRunner, Step};
    use crate::models::RetentionPolicy;

    fn target(backups: Vec<BackupSpec>, ping_hosts: Vec<String>) -> Target {
        Target {
            name: "web".into(),
            retention: RetentionPolicy::default(),
            rsync_bin: "/usr/bin/rsync".into(),
            rsync_defaults: vec!["-ax".into(), "--delete".into()],
            rsync_options: vec!["--one-file-system".into()],
            rsync_exclude: vec!["*.tmp".into()],
            ping_cmd: vec!["/bin/ping".into(), "-w1".into(), "-c1".into()],
            ping_hosts,
            backups,
            link_fmt: "%Y-%m-%d.%H%M".into(),
            backup_directory: "/srv/swiftbackup".into(),
        }
    }

    fn backup(src: &str, dst: &str) -> BackupSpec {
        BackupSpec::new(src.into(), dst.into(), vec!["-H".into()]).unwrap()
    }

    fn options() -> RunOptions {
        RunOptions {
            clock: crate::clock::Clock::utc(),
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_successful_sync_effect_sequence() {
        let target = target(vec![backup("/etc", "etc")], vec![]);
        let mut runner = ScriptedRunner::with_script(vec![
            done(),
            created("/w/snapshots/.rsync.abc"),
        ]);

        let outcome = plan_sync(
            &mut runner,
            &options(),
            &target,
            Path::new("/w"),
            1612325106,
            Some(Path::new("/w/snapshots/1612321506")),
        )
        .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Committed("/w/snapshots/1612325106".into())
        );
        assert_eq!(
            runner.log,
            vec![
                Effect::MakeDir {
                    path: "/w/snapshots".into(),
                    recursive: true,
                },
                Effect::MakeTempDir {
                    prefix: ".rsync.".into(),
                    parent: "/w/snapshots".into(),
                },
                Effect::MakeDir {
                    path: "/w/snapshots/.rsync.abc/etc".into(),
                    recursive: true,
                },
                Effect::RunProcess {
                    argv: vec![
                        "/usr/bin/rsync".into(),
                        "-ax".into(),
                        "--delete".into(),
                        "--one-file-system".into(),
                        "-H".into(),
                        "--exclude".into(),
                        "*.tmp".into(),
                        "--link-dest".into(),
                        "/w/snapshots/1612321506".into(),
                        "/etc".into(),
                        "/w/snapshots/.rsync.abc/etc".into(),
                    ],
                    ok_codes: vec![0, 24],
                    silent: false,
                },
                Effect::Touch {
                    path: "/w/snapshots/.rsync.abc".into(),
                },
                Effect::Chmod {
                    path: "/w/snapshots/.rsync.abc".into(),
                    mode: 0o755,
                },
                Effect::Rename {
                    src: "/w/snapshots/.rsync.abc".into(),
                    dst: "/w/snapshots/1612325106".into(),
                },
            ]
        );
    }

    #[test]
    fn test_no_link_dest_on_first_sync() {
        let target = target(vec![backup("/etc", "")], vec![]);
        let mut runner = ScriptedRunner::new();

        plan_sync(&mut runner, &options(), &target, Path::new("/w"), 1000, None).unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(!commands[0].iter().any(|a| a == "--link-dest"));
        // Empty dest transfers straight into the staging root.
        assert_eq!(
            commands[0].last().map(String::as_str),
            Some("/w/snapshots/.rsync.scripted")
        );
    }

    #[test]
    fn test_host_down_is_a_soft_skip() {
        let target = target(vec![backup("/etc", "")], vec!["web.example.com".into()]);
        let mut runner = ScriptedRunner::with_script(vec![done(), exited(1)]);

        let outcome = plan_sync(
            &mut runner,
            &options(),
            &target,
            Path::new("/w"),
            1000,
            None,
        )
        .unwrap();

        assert_eq!(outcome, SyncOutcome::HostDown);
        // MakeDir + probe only: no staging directory was ever created.
        assert_eq!(runner.log.len(), 2);
        assert_eq!(
            runner.log[1],
            Effect::RunProcess {
                argv: vec![
                    "/bin/ping".into(),
                    "-w1".into(),
                    "-c1".into(),
                    "web.example.com".into(),
                ],
                ok_codes: vec![0, 1],
                silent: true,
            }
        );
    }

    #[test]
    fn test_host_up_proceeds_past_probe() {
        let target = target(vec![backup("/etc", "")], vec!["web.example.com".into()]);
        let mut runner = ScriptedRunner::with_script(vec![done(), exited(0)]);

        let outcome = plan_sync(
            &mut runner,
            &options(),
            &target,
            Path::new("/w"),
            1000,
            None,
        )
        .unwrap();

        assert!(matches!(outcome, SyncOutcome::Committed(_)));
    }

    #[test]
    fn test_transfer_failure_cleans_up_staging() {
        let target = target(vec![backup("/etc", "etc")], vec![]);
        let mut runner = ScriptedRunner::with_script(vec![
            done(),
            created("/w/snapshots/.rsync.abc"),
            done(),
            Step::Fail,
        ]);

        let err = plan_sync(
            &mut runner,
            &options(),
            &target,
            Path::new("/w"),
            1000,
            None,
        )
        .unwrap_err();

        assert!(err.is_command());
        assert_eq!(
            runner.log.last().unwrap(),
            &Effect::RemoveTree {
                path: "/w/snapshots/.rsync.abc".into(),
                ignore_errors: true,
            }
        );
        // No commit effects after the failure.
        assert!(!runner
            .log
            .iter()
            .any(|e| matches!(e, Effect::Rename { .. })));
    }

    #[test]
    fn test_dry_run_discards_staging_instead_of_committing() {
        let target = target(vec![backup("/etc", "etc")], vec![]);
        let mut runner = ScriptedRunner::with_script(vec![
            done(),
            created("/w/snapshots/.rsync.abc"),
        ]);
        let options = RunOptions {
            dry_run: true,
            ..options()
        };

        let outcome = plan_sync(
            &mut runner,
            &options,
            &target,
            Path::new("/w"),
            1000,
            None,
        )
        .unwrap();

        assert_eq!(outcome, SyncOutcome::DryRun);
        assert_eq!(runner.commands()[0][1], "--dry-run");
        assert_eq!(
            runner.log.last().unwrap(),
            &Effect::RemoveTree {
                path: "/w/snapshots/.rsync.abc".into(),
                ignore_errors: false,
            }
        );
        assert!(!runner
            .log
            .iter()
            .any(|e| matches!(e, Effect::Rename { .. } | Effect::Touch { .. })));
    }

    #[test]
    fn test_dry_run_teardown_handles_populated_staging() {
        // A non-empty dst leaves a subdirectory inside staging, so the
        // teardown must be a recursive removal, not a bare rmdir.
        let target = target(vec![backup("/etc", "etc/sub")], vec![]);
        let mut runner = ScriptedRunner::with_script(vec![
            done(),
            created("/w/snapshots/.rsync.abc"),
        ]);
        let options = RunOptions {
            dry_run: true,
            ..options()
        };

        let outcome = plan_sync(
            &mut runner,
            &options,
            &target,
            Path::new("/w"),
            1000,
            None,
        )
        .unwrap();

        assert_eq!(outcome, SyncOutcome::DryRun);
        assert!(runner.log.contains(&Effect::MakeDir {
            path: "/w/snapshots/.rsync.abc/etc/sub".into(),
            recursive: true,
        }));
        assert_eq!(
            runner.log.last().unwrap(),
            &Effect::RemoveTree {
                path: "/w/snapshots/.rsync.abc".into(),
                ignore_errors: false,
            }
        );
    }

    #[test]
    fn test_multiple_backups_transfer_in_order() {
        let target = target(vec![backup("/etc", "etc"), backup("/home", "home")], vec![]);
        let mut runner = ScriptedRunner::new();

        plan_sync(&mut runner, &options(), &target, Path::new("/w"), 1000, None).unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0][commands[0].len() - 2], "/etc");
        assert_eq!(commands[1][commands[1].len() - 2], "/home");
    }
}

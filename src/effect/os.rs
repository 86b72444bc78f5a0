//! The OS-backed effect runner

use std::fs;
use std::os::unix::fs::{symlink, DirBuilderExt, PermissionsExt};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{BackupError, BackupResult};

use super::{Effect, EffectOutput, EffectRunner};

/// Runs effects against the real filesystem and process table
#[derive(Debug, Default)]
pub struct OsRunner;

impl OsRunner {
    pub fn new() -> Self {
        Self
    }

    fn run_process(argv: &[String], ok_codes: &[i32], silent: bool) -> BackupResult<i32> {
        let (bin, args) = argv
            .split_first()
            .ok_or_else(|| BackupError::Io("empty command line".into()))?;
        debug!(command = %Effect::format_argv(argv), "running external command");

        let mut command = Command::new(bin);
        command.args(args);
        if silent {
            command.stdout(Stdio::null());
        }
        let status = command.status().map_err(|e| BackupError::Command {
            status: -1,
            command: format!("{} ({})", Effect::format_argv(argv), e),
        })?;
        // A signal death has no exit code; -1 never sits in an ok set.
        let code = status.code().unwrap_or(-1);
        debug!(rc = code, rc_ok = ?ok_codes, "external command finished");

        if ok_codes.contains(&code) {
            Ok(code)
        } else {
            Err(BackupError::Command {
                status: code,
                command: Effect::format_argv(argv),
            })
        }
    }
}

impl EffectRunner for OsRunner {
    fn run(&mut self, effect: Effect) -> BackupResult<EffectOutput> {
        match effect {
            Effect::MakeDir { path, recursive } => {
                if recursive {
                    fs::DirBuilder::new()
                        .recursive(true)
                        .mode(0o755)
                        .create(&path)?;
                } else {
                    fs::create_dir(&path)?;
                }
                Ok(EffectOutput::Done)
            }
            Effect::MakeTempDir { prefix, parent } => {
                let dir = tempfile::Builder::new()
                    .prefix(&prefix)
                    .tempdir_in(&parent)?;
                Ok(EffectOutput::Created(dir.into_path()))
            }
            Effect::RunProcess {
                argv,
                ok_codes,
                silent,
            } => Self::run_process(&argv, &ok_codes, silent).map(EffectOutput::Exited),
            Effect::Rename { src, dst } => {
                fs::rename(&src, &dst)?;
                Ok(EffectOutput::Done)
            }
            Effect::RemoveTree {
                path,
                ignore_errors,
            } => {
                match fs::remove_dir_all(&path) {
                    Ok(()) => {}
                    Err(_) if ignore_errors => {}
                    Err(e) => return Err(e.into()),
                }
                Ok(EffectOutput::Done)
            }
            Effect::RemoveFile { path } => {
                fs::remove_file(&path)?;
                Ok(EffectOutput::Done)
            }
            Effect::Symlink { target, link } => {
                symlink(&target, &link)?;
                Ok(EffectOutput::Done)
            }
            Effect::Touch { path } => {
                let file = fs::File::open(&path)?;
                file.set_modified(SystemTime::now())?;
                Ok(EffectOutput::Done)
            }
            Effect::Chmod { path, mode } => {
                fs::set_permissions(&path, fs::Permissions::from_mode(mode))?;
                Ok(EffectOutput::Done)
            }
        }
    }
}

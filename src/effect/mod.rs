//! Side-effect descriptors and their runner
//!
//! Every observable side effect of the tool is described by an [`Effect`]
//! value first and performed by an [`EffectRunner`] second. Planners only
//! ever build `Effect` values and react to the results the runner hands
//! back, which keeps them deterministic: tests swap the OS-backed runner
//! for a scripted fake that records the emitted sequence and replays
//! canned results, including failures.

mod os;
#[cfg(test)]
pub(crate) mod script;

pub use os::OsRunner;

use std::path::PathBuf;

use crate::error::{BackupError, BackupResult};

/// One side-effecting operation, as pure data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create a directory, optionally with all missing parents
    MakeDir { path: PathBuf, recursive: bool },
    /// Create a uniquely named directory under `parent`; yields its path
    MakeTempDir { prefix: String, parent: PathBuf },
    /// Run an external process; yields its exit code
    ///
    /// Fails when the exit code is not in `ok_codes`. `silent` discards
    /// the child's stdout.
    RunProcess {
        argv: Vec<String>,
        ok_codes: Vec<i32>,
        silent: bool,
    },
    /// Atomically rename `src` to `dst`
    Rename { src: PathBuf, dst: PathBuf },
    /// Recursively delete a directory tree
    ///
    /// With `ignore_errors` the effect always succeeds.
    RemoveTree { path: PathBuf, ignore_errors: bool },
    /// Delete a single file or symlink
    RemoveFile { path: PathBuf },
    /// Create a symlink at `link` pointing to `target`
    Symlink { target: PathBuf, link: PathBuf },
    /// Refresh a path's modification time to now
    Touch { path: PathBuf },
    /// Set a path's permission bits
    Chmod { path: PathBuf, mode: u32 },
}

impl Effect {
    /// Shell-style rendering of a `RunProcess` argv for errors and logs
    pub(crate) fn format_argv(argv: &[String]) -> String {
        argv.join(" ")
    }
}

/// What running an effect produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutput {
    /// The effect has no interesting result
    Done,
    /// `MakeTempDir` yields the created path
    Created(PathBuf),
    /// `RunProcess` yields the (acceptable) exit code
    Exited(i32),
}

/// Executes effects and reports results back to the planner
///
/// The one OS-backed implementation is [`OsRunner`]; tests use a scripted
/// fake. A returned `Err` is the "raised failure" a planner may catch to
/// run compensating effects before re-raising.
pub trait EffectRunner {
    /// Execute one effect
    fn run(&mut self, effect: Effect) -> BackupResult<EffectOutput>;

    /// Execute an effect whose result carries no data
    fn run_unit(&mut self, effect: Effect) -> BackupResult<()> {
        self.run(effect).map(|_| ())
    }

    /// Execute an effect that yields a created path
    fn run_path(&mut self, effect: Effect) -> BackupResult<PathBuf> {
        match self.run(effect)? {
            EffectOutput::Created(path) => Ok(path),
            other => Err(BackupError::Io(format!(
                "effect runner returned {:?} where a path was expected",
                other
            ))),
        }
    }

    /// Execute an effect that yields an exit code
    fn run_exit(&mut self, effect: Effect) -> BackupResult<i32> {
        match self.run(effect)? {
            EffectOutput::Exited(code) => Ok(code),
            other => Err(BackupError::Io(format!(
                "effect runner returned {:?} where an exit code was expected",
                other
            ))),
        }
    }
}

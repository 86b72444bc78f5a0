//! Scripted effect runner for planner tests
//!
//! Records every emitted effect and replays a scripted result for each, so
//! planner tests can assert the exact effect sequence without touching the
//! filesystem or spawning processes.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::error::{BackupError, BackupResult};

use super::{Effect, EffectOutput, EffectRunner};

/// A canned reaction to one emitted effect
pub(crate) enum Step {
    /// Succeed with the given output
    Ok(EffectOutput),
    /// Raise a command failure into the planner
    Fail,
}

/// Effect runner driven by a prepared script
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    script: VecDeque<Step>,
    /// Every effect the planner emitted, in order
    pub log: Vec<Effect>,
}

impl ScriptedRunner {
    /// Runner that answers every effect with a default success
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that replays `script`, then falls back to default successes
    pub fn with_script(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            log: Vec::new(),
        }
    }

    /// Default output for an effect when the script has run out
    fn default_output(effect: &Effect) -> EffectOutput {
        match effect {
            Effect::MakeTempDir { prefix, parent } => {
                EffectOutput::Created(parent.join(format!("{}scripted", prefix)))
            }
            Effect::RunProcess { ok_codes, .. } => {
                EffectOutput::Exited(ok_codes.first().copied().unwrap_or(0))
            }
            _ => EffectOutput::Done,
        }
    }

    /// The paths of all recorded `RunProcess` argvs, for quick assertions
    pub fn commands(&self) -> Vec<&[String]> {
        self.log
            .iter()
            .filter_map(|e| match e {
                Effect::RunProcess { argv, .. } => Some(argv.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl EffectRunner for ScriptedRunner {
    fn run(&mut self, effect: Effect) -> BackupResult<EffectOutput> {
        let step = self.script.pop_front();
        let result = match step {
            Some(Step::Ok(output)) => Ok(output),
            Some(Step::Fail) => Err(BackupError::Command {
                status: 23,
                command: match &effect {
                    Effect::RunProcess { argv, .. } => Effect::format_argv(argv),
                    other => format!("{:?}", other),
                },
            }),
            None => Ok(Self::default_output(&effect)),
        };
        self.log.push(effect);
        result
    }
}

/// Scripted path result, shorthand for temp-dir steps
pub(crate) fn created(path: &str) -> Step {
    Step::Ok(EffectOutput::Created(PathBuf::from(path)))
}

/// Scripted exit-code result
pub(crate) fn exited(code: i32) -> Step {
    Step::Ok(EffectOutput::Exited(code))
}

/// Scripted unit result
pub(crate) fn done() -> Step {
    Step::Ok(EffectOutput::Done)
}

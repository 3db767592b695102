//! Error taxonomy for the Cadre engine.
//!
//! Three families, matching the three phases of a run's life:
//!
//! - [`ConfigError`] — anything wrong with the configuration graph. Detected
//!   entirely at load time; a configuration either loads completely or not at
//!   all.
//! - [`TemplateError`] — a prompt or validation command referenced something
//!   that is not in scope. Detected at render time, aborts the current run.
//! - [`ExecutionError`] — a task run could not complete. Always carries the
//!   failing step's id so callers never see a bare failure.
//!
//! Collaborator errors ([`InvocationError`], [`RunnerError`]) live next to
//! their traits in [`crate::workflow::invoker`] and are folded into step
//! failure accounting by the executor.

use std::path::PathBuf;

use thiserror::Error;

use crate::workflow::template::TemplateError;

/// The kind of configuration entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Command,
    McpServer,
    Agent,
    Task,
    Step,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Command => "command",
            EntityKind::McpServer => "mcp server",
            EntityKind::Agent => "agent",
            EntityKind::Task => "task",
            EntityKind::Step => "step",
        };
        f.write_str(name)
    }
}

/// Load-time configuration errors. None of these are retried, and no partial
/// configuration is ever returned alongside one.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: {message}", .document.display())]
    Io { document: PathBuf, message: String },

    #[error("{}: invalid YAML: {message}", .document.display())]
    Parse { document: PathBuf, message: String },

    #[error("{}: {entity} is missing required field `{field}`", .document.display())]
    MissingField {
        document: PathBuf,
        entity: String,
        field: &'static str,
    },

    #[error(
        "{}: field `{field}` has invalid value `{value}` (expected {expected})",
        .document.display()
    )]
    InvalidEnum {
        document: PathBuf,
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("{}: invalid value for `{field}`: {message}", .document.display())]
    InvalidRange {
        document: PathBuf,
        field: String,
        message: String,
    },

    #[error("{}: invalid glob pattern `{pattern}` in `{field}`: {message}", .document.display())]
    InvalidGlob {
        document: PathBuf,
        field: String,
        pattern: String,
        message: String,
    },

    #[error(
        "duplicate {kind} id `{id}` (defined in {} and {})",
        .first.display(),
        .second.display()
    )]
    DuplicateId {
        kind: EntityKind,
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("import cycle detected: {}", format_cycle(.chain))]
    ImportCycle { chain: Vec<PathBuf> },

    #[error("{}: agent `{agent}` references unknown {kind} `{id}`", .document.display())]
    UnknownToolRef {
        document: PathBuf,
        agent: String,
        kind: EntityKind,
        id: String,
    },

    #[error(
        "{}: step `{step}` in task `{task}` references `{reference}`, which is not an earlier step",
        .document.display()
    )]
    UnknownStepRef {
        document: PathBuf,
        task: String,
        step: String,
        reference: String,
    },
}

fn format_cycle(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Run-time execution errors. Each aborts the current task run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("task `{0}` not found in configuration")]
    UnknownTask(String),

    #[error("step `{step}`: unknown agent `{agent}`")]
    UnknownAgent { step: String, agent: String },

    #[error("step `{step}`: rendering failed: {source}")]
    RenderFailed {
        step: String,
        #[source]
        source: TemplateError,
    },

    #[error("step `{step}`: agent invocation failed: {message}")]
    InvocationFailed { step: String, message: String },

    #[error("step `{step}`: validation exhausted after {attempts} attempt(s): {last_output}")]
    ValidationExhausted {
        step: String,
        attempts: u32,
        last_output: String,
    },

    #[error("run cancelled before step `{step}`")]
    Cancelled { step: String },
}

impl ExecutionError {
    /// The id of the step the run failed at, if the error is step-scoped.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            ExecutionError::UnknownTask(_) => None,
            ExecutionError::UnknownAgent { step, .. }
            | ExecutionError::RenderFailed { step, .. }
            | ExecutionError::InvocationFailed { step, .. }
            | ExecutionError::ValidationExhausted { step, .. }
            | ExecutionError::Cancelled { step } => Some(step),
        }
    }
}

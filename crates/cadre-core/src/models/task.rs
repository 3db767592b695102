//! Task, step, and validation definitions.

use std::collections::BTreeMap;

use crate::models::value::ParamValue;

/// Advisory file-scope declarations for a task. Patterns are validated as
/// globs at load time; enforcement belongs to the execution environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesScope {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

/// Post-step validation gate: an external command template, a retry bound,
/// and whether exhaustion aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSpec {
    /// Command template, rendered with the step's scope before running.
    pub command: String,
    /// Additional attempts after the first; `0` means no retry.
    pub max_retries: u32,
    /// When true, exhausting retries is recorded instead of aborting.
    pub continue_on_failure: bool,
}

/// One agent invocation within a task.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDef {
    /// Unique id within the task.
    pub id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Id of the agent to invoke.
    pub agent: String,
    /// Prompt template.
    pub prompt: String,
    /// Arbitrary `with` parameters beyond `prompt`/`context_from`. These
    /// overlay the run inputs in this step's rendering scope.
    pub params: BTreeMap<String, ParamValue>,
    /// Earlier steps whose outputs are visible to this step's templates.
    pub context_from: Vec<String>,
    pub validate: Option<ValidationSpec>,
}

/// An ordered pipeline of steps sharing a working directory and file scope.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDef {
    /// Unique id within the merged configuration.
    pub id: String,
    pub description: String,
    /// Relative to the configuration root; defaults to `.`.
    pub working_dir: String,
    pub files: FilesScope,
    pub steps: Vec<StepDef>,
}

impl TaskDef {
    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }
}

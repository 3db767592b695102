//! Structured results of a task run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a single step within a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    /// Validation retries were exhausted but `continue_on_failure` let the
    /// run proceed.
    FailedContinued,
}

/// Per-step accounting for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step_id: String,
    pub status: StepStatus,
    /// Invoke+validate attempts consumed (1 when there was no retry).
    pub attempts: u32,
    /// Recorded output text; absent for failed steps.
    pub output: Option<String>,
    /// Last failure description for failed-but-continued steps.
    pub failure: Option<String>,
}

/// Overall status of a run that reached the end of its step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// All steps executed, but at least one recorded a non-fatal failure.
    CompletedWithFailures,
}

/// The result of a completed run. An aborted run surfaces as an
/// [`ExecutionError`](crate::error::ExecutionError) instead.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: String,
    pub task_id: String,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    /// Final context store contents: step id → output text.
    pub outputs: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn step(&self, step_id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

//! Workflow executor — drives a task's steps strictly in order.
//!
//! For each step: look up the agent, build the rendering scope from
//! `context_from`, render the prompt, invoke the agent through the
//! collaborator seam, then gate on validation with bounded retry. Outputs
//! become visible in the context store in step-list order, and step *n+1*
//! never begins until step *n* has fully completed, retries included.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::ExecutionError;
use crate::models::{AgentDef, ParamValue, StepDef, ValidationSpec};
use crate::workflow::context::{ContextStore, RunContext, StepOutput};
use crate::workflow::invoker::{AgentInvoker, CommandOutput, CommandRunner, InvocationRequest};
use crate::workflow::result::{RunResult, RunStatus, StepRecord, StepStatus};
use crate::workflow::template::{render, TemplateScope};

/// Executes task runs against a shared, read-only [`Configuration`].
///
/// The executor owns no per-run state; each [`run`](Self::run) call creates
/// its own [`RunContext`], so concurrent runs over the same configuration are
/// safe.
pub struct WorkflowExecutor {
    config: Arc<Configuration>,
    invoker: Arc<dyn AgentInvoker>,
    runner: Arc<dyn CommandRunner>,
    cancel: CancellationToken,
}

/// Retry state machine for one step with a validation gate.
enum StepPhase {
    Invoking { attempt: u32 },
    Validating { attempt: u32, text: String },
    RetryPending { attempt: u32, failure: String },
    Succeeded { attempts: u32, text: String },
    Exhausted { attempts: u32, failure: String },
}

enum StepOutcome {
    Succeeded { text: String, attempts: u32 },
    Failed { attempts: u32, failure: String },
}

impl WorkflowExecutor {
    pub fn new(
        config: Arc<Configuration>,
        invoker: Arc<dyn AgentInvoker>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            invoker,
            runner,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for cooperative cancellation. Cancellation is observed between
    /// steps, before each Invoke; mid-invocation cancellation is the
    /// invoker's own concern and surfaces as an invocation failure.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a task to completion. A completed run (including one with
    /// non-fatal step failures) is `Ok`; an aborted run is `Err` and names
    /// the failing step.
    pub async fn run(
        &self,
        task_id: &str,
        inputs: BTreeMap<String, ParamValue>,
    ) -> Result<RunResult, ExecutionError> {
        let task = self
            .config
            .task(task_id)
            .ok_or_else(|| ExecutionError::UnknownTask(task_id.to_string()))?;
        let cwd = self.config.task_working_dir(task);
        let mut ctx = RunContext::new(inputs);

        info!(
            task = %task.id,
            run = %ctx.run_id,
            steps = task.steps.len(),
            "task run started"
        );

        let mut records: Vec<StepRecord> = Vec::with_capacity(task.steps.len());
        for step in &task.steps {
            if self.cancel.is_cancelled() {
                warn!(task = %task.id, step = %step.id, "run cancelled");
                return Err(ExecutionError::Cancelled {
                    step: step.id.clone(),
                });
            }

            let agent =
                self.config
                    .agent(&step.agent)
                    .ok_or_else(|| ExecutionError::UnknownAgent {
                        step: step.id.clone(),
                        agent: step.agent.clone(),
                    })?;

            // Step-local `with` parameters overlay the run inputs for this
            // step's rendering scope only.
            let inputs = overlay_inputs(&ctx.inputs, &step.params);
            let prompt = {
                let scope = step_scope(&inputs, step, &ctx.store, None);
                render(&step.prompt, &scope).map_err(|source| ExecutionError::RenderFailed {
                    step: step.id.clone(),
                    source,
                })?
            };
            debug!(step = %step.id, agent = %agent.id, "prompt rendered");

            match self
                .drive_step(step, agent, &prompt, &inputs, &ctx.store, &cwd)
                .await?
            {
                StepOutcome::Succeeded { text, attempts } => {
                    info!(step = %step.id, attempts, "step succeeded");
                    ctx.store.record(&step.id, text.clone());
                    records.push(StepRecord {
                        step_id: step.id.clone(),
                        status: StepStatus::Succeeded,
                        attempts,
                        output: Some(text),
                        failure: None,
                    });
                }
                StepOutcome::Failed { attempts, failure } => {
                    warn!(step = %step.id, attempts, failure = %failure, "step failed, continuing");
                    records.push(StepRecord {
                        step_id: step.id.clone(),
                        status: StepStatus::FailedContinued,
                        attempts,
                        output: None,
                        failure: Some(failure),
                    });
                }
            }
        }

        let status = if records
            .iter()
            .any(|r| r.status == StepStatus::FailedContinued)
        {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Succeeded
        };
        info!(task = %task.id, run = %ctx.run_id, ?status, "task run completed");

        Ok(RunResult {
            run_id: ctx.run_id,
            task_id: task.id.clone(),
            status,
            steps: records,
            outputs: ctx.store.into_texts(),
            started_at: ctx.started_at,
            finished_at: Utc::now(),
        })
    }

    /// Execute one step's invoke/validate cycle.
    ///
    /// Without a validation gate there is a single attempt and any invocation
    /// failure aborts the run. With one, invocation and validation failures
    /// both consume attempts out of `max_retries + 1`, and exhaustion either
    /// aborts or is absorbed per `continue_on_failure`.
    async fn drive_step(
        &self,
        step: &StepDef,
        agent: &AgentDef,
        prompt: &str,
        inputs: &BTreeMap<String, ParamValue>,
        store: &ContextStore,
        cwd: &Path,
    ) -> Result<StepOutcome, ExecutionError> {
        let Some(validation) = step.validate.as_ref() else {
            return match self.invoke_agent(agent, prompt, cwd).await {
                Ok(text) => Ok(StepOutcome::Succeeded { text, attempts: 1 }),
                Err(message) => Err(ExecutionError::InvocationFailed {
                    step: step.id.clone(),
                    message,
                }),
            };
        };

        let max_attempts = validation.max_retries + 1;
        let mut phase = StepPhase::Invoking { attempt: 1 };
        loop {
            phase = match phase {
                StepPhase::Invoking { attempt } => {
                    debug!(step = %step.id, attempt, "invoking agent");
                    match self.invoke_agent(agent, prompt, cwd).await {
                        Ok(text) => StepPhase::Validating { attempt, text },
                        Err(failure) => StepPhase::RetryPending { attempt, failure },
                    }
                }
                StepPhase::Validating { attempt, text } => {
                    self.validate_attempt(step, validation, attempt, text, inputs, store, cwd)
                        .await?
                }
                StepPhase::RetryPending { attempt, failure } => {
                    if attempt < max_attempts {
                        warn!(
                            step = %step.id,
                            attempt,
                            max_attempts,
                            failure = %failure,
                            "attempt failed, retrying"
                        );
                        StepPhase::Invoking {
                            attempt: attempt + 1,
                        }
                    } else {
                        StepPhase::Exhausted {
                            attempts: attempt,
                            failure,
                        }
                    }
                }
                StepPhase::Succeeded { attempts, text } => {
                    return Ok(StepOutcome::Succeeded { text, attempts });
                }
                StepPhase::Exhausted { attempts, failure } => {
                    if validation.continue_on_failure {
                        return Ok(StepOutcome::Failed { attempts, failure });
                    }
                    return Err(ExecutionError::ValidationExhausted {
                        step: step.id.clone(),
                        attempts,
                        last_output: failure,
                    });
                }
            };
        }
    }

    async fn invoke_agent(
        &self,
        agent: &AgentDef,
        prompt: &str,
        cwd: &Path,
    ) -> Result<String, String> {
        let request = InvocationRequest {
            prompt,
            model: &agent.model,
            instructions: &agent.instructions,
            policy: &agent.tools,
            catalog: self.config.tools(),
            limits: &agent.limits,
            working_dir: cwd,
        };
        self.invoker
            .invoke(request)
            .await
            .map(|output| output.text)
            .map_err(|e| e.to_string())
    }

    #[allow(clippy::too_many_arguments)]
    async fn validate_attempt(
        &self,
        step: &StepDef,
        validation: &ValidationSpec,
        attempt: u32,
        text: String,
        inputs: &BTreeMap<String, ParamValue>,
        store: &ContextStore,
        cwd: &Path,
    ) -> Result<StepPhase, ExecutionError> {
        // The validation command sees the step's own candidate output under
        // its id, alongside the usual context_from scope.
        let candidate = StepOutput::new(text.clone());
        let command = {
            let scope = step_scope(inputs, step, store, Some((&step.id, &candidate)));
            render(&validation.command, &scope).map_err(|source| ExecutionError::RenderFailed {
                step: step.id.clone(),
                source,
            })?
        };
        debug!(step = %step.id, attempt, command = %command, "running validation");

        Ok(match self.runner.run(&command, cwd).await {
            Ok(result) if result.success() => StepPhase::Succeeded {
                attempts: attempt,
                text,
            },
            Ok(result) => StepPhase::RetryPending {
                attempt,
                failure: describe_validation_failure(&command, &result),
            },
            Err(err) => StepPhase::RetryPending {
                attempt,
                failure: err.to_string(),
            },
        })
    }
}

fn overlay_inputs(
    run_inputs: &BTreeMap<String, ParamValue>,
    step_params: &BTreeMap<String, ParamValue>,
) -> BTreeMap<String, ParamValue> {
    let mut merged = run_inputs.clone();
    for (key, value) in step_params {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Rendering scope for one step: the overlaid inputs, outputs of the steps
/// named in `context_from` (only those), and optionally the step's own
/// candidate output during validation.
fn step_scope<'a>(
    inputs: &'a BTreeMap<String, ParamValue>,
    step: &'a StepDef,
    store: &'a ContextStore,
    candidate: Option<(&'a str, &'a StepOutput)>,
) -> TemplateScope<'a> {
    let mut scope = TemplateScope::new(inputs);
    for id in &step.context_from {
        // A step that failed under continue_on_failure has no recorded
        // output; referencing it fails at render time.
        if let Some(output) = store.get(id) {
            scope.steps.insert(id.as_str(), output);
        }
    }
    if let Some((id, output)) = candidate {
        scope.steps.insert(id, output);
    }
    scope
}

fn describe_validation_failure(command: &str, output: &CommandOutput) -> String {
    let detail = if output.stderr.trim().is_empty() {
        output.stdout.trim()
    } else {
        output.stderr.trim()
    };
    if detail.is_empty() {
        format!("`{command}` exited with status {}", output.exit_code)
    } else {
        format!(
            "`{command}` exited with status {}: {detail}",
            output.exit_code
        )
    }
}

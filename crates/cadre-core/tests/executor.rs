//! Integration tests for the workflow executor: context propagation,
//! validation retry accounting, continue-vs-abort, and cancellation.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cadre_core::config::{ConfigLoader, Configuration};
use cadre_core::error::ExecutionError;
use cadre_core::models::ParamValue;
use cadre_core::workflow::{
    AgentInvoker, AgentOutput, CommandOutput, CommandRunner, InvocationError, InvocationRequest,
    RunStatus, RunnerError, StepStatus, WorkflowExecutor,
};

/// Invoker that records rendered prompts and replays scripted responses.
/// Once the script is exhausted it answers `"ok"`.
#[derive(Default)]
struct ScriptedInvoker {
    prompts: Mutex<Vec<String>>,
    script: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedInvoker {
    fn new(script: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(&self, request: InvocationRequest<'_>) -> Result<AgentOutput, InvocationError> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(AgentOutput { text }),
            Some(Err(message)) => Err(InvocationError::Failed(message)),
            None => Ok(AgentOutput {
                text: "ok".to_string(),
            }),
        }
    }
}

/// Runner that records rendered commands and replays scripted exit codes.
/// Once the script is exhausted it answers exit code 0.
#[derive(Default)]
struct ScriptedRunner {
    commands: Mutex<Vec<String>>,
    exit_codes: Mutex<VecDeque<i32>>,
}

impl ScriptedRunner {
    fn new(exit_codes: Vec<i32>) -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
            exit_codes: Mutex::new(exit_codes.into_iter().collect()),
        })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, _cwd: &Path) -> Result<CommandOutput, RunnerError> {
        self.commands.lock().unwrap().push(command.to_string());
        let exit_code = self.exit_codes.lock().unwrap().pop_front().unwrap_or(0);
        Ok(CommandOutput {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "tests failed".to_string()
            },
        })
    }
}

fn load_config(yaml: &str) -> Arc<Configuration> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadre.yaml");
    fs::write(&path, yaml).unwrap();
    Arc::new(ConfigLoader::new().load(&path).unwrap())
}

fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, ParamValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
        .collect()
}

const ECHO_TASK: &str = r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
    tools:
      mode: whitelist
      commands: []
tasks:
  - id: t
    description: "one step"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "{{ inputs.prompt }}"
"#;

#[tokio::test]
async fn test_single_step_renders_inputs_and_succeeds() {
    let config = load_config(ECHO_TASK);
    let invoker = ScriptedInvoker::new(vec![Ok("hi")]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let result = executor
        .run("t", inputs(&[("prompt", "hello")]))
        .await
        .unwrap();

    assert_eq!(invoker.prompts(), vec!["hello".to_string()]);
    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, StepStatus::Succeeded);
    assert_eq!(result.outputs["s1"], "hi");
}

#[tokio::test]
async fn test_context_from_feeds_later_step() {
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "two steps"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "{{ inputs.prompt }}"
      - id: s2
        agent:
          use: echo
          with:
            prompt: "{{ steps.s1.text }} world"
            context_from: [s1]
"#,
    );
    let invoker = ScriptedInvoker::new(vec![Ok("hi"), Ok("done")]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let result = executor
        .run("t", inputs(&[("prompt", "hello")]))
        .await
        .unwrap();

    assert_eq!(
        invoker.prompts(),
        vec!["hello".to_string(), "hi world".to_string()]
    );
    assert_eq!(result.outputs["s2"], "done");
}

#[tokio::test]
async fn test_step_output_not_in_context_from_is_invisible() {
    // s2's output exists in the store, but s3 only declares s1.
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "three steps"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "one"
      - id: s2
        agent:
          use: echo
          with:
            prompt: "two"
      - id: s3
        agent:
          use: echo
          with:
            prompt: "{{ steps.s2.text }}"
            context_from: [s1]
"#,
    );
    let invoker = ScriptedInvoker::new(vec![Ok("a"), Ok("b")]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let err = executor.run("t", inputs(&[])).await.unwrap_err();
    match err {
        ExecutionError::RenderFailed { step, .. } => assert_eq!(step, "s3"),
        other => panic!("expected RenderFailed, got {other}"),
    }
    // s1 and s2 ran; s3 aborted before invoking.
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn test_retry_bound_is_exactly_max_retries_plus_one() {
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "retries"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "go"
        validate:
          command: "make test"
          max_retries: 2
"#,
    );
    let invoker = ScriptedInvoker::new(vec![]);
    // Validation fails on every attempt.
    let runner = ScriptedRunner::new(vec![1, 1, 1, 1, 1]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner.clone());

    let err = executor.run("t", inputs(&[])).await.unwrap_err();
    match err {
        ExecutionError::ValidationExhausted {
            step,
            attempts,
            last_output,
        } => {
            assert_eq!(step, "s1");
            assert_eq!(attempts, 3);
            assert!(last_output.contains("make test"));
            assert!(last_output.contains("tests failed"));
        }
        other => panic!("expected ValidationExhausted, got {other}"),
    }
    // Exactly N+1 invoke+validate cycles.
    assert_eq!(invoker.calls(), 3);
    assert_eq!(runner.calls(), 3);
}

#[tokio::test]
async fn test_validation_success_stops_retrying() {
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "second attempt passes"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "go"
        validate:
          command: "make test"
          max_retries: 3
"#,
    );
    let invoker = ScriptedInvoker::new(vec![Ok("first"), Ok("second")]);
    let runner = ScriptedRunner::new(vec![1, 0]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner.clone());

    let result = executor.run("t", inputs(&[])).await.unwrap();
    assert_eq!(invoker.calls(), 2);
    assert_eq!(runner.calls(), 2);
    assert_eq!(result.steps[0].attempts, 2);
    // The recorded output is from the attempt that passed validation.
    assert_eq!(result.outputs["s1"], "second");
}

const THREE_STEP_TASK: &str = r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "middle step fails"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "one"
      - id: s2
        agent:
          use: echo
          with:
            prompt: "two"
        validate:
          command: "make test"
          max_retries: 1
          continue_on_failure: CONTINUE
      - id: s3
        agent:
          use: echo
          with:
            prompt: "three"
"#;

#[tokio::test]
async fn test_continue_on_failure_records_and_proceeds() {
    let yaml = THREE_STEP_TASK.replace("CONTINUE", "true");
    let config = load_config(&yaml);
    let invoker = ScriptedInvoker::new(vec![]);
    let runner = ScriptedRunner::new(vec![1, 1]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let result = executor.run("t", inputs(&[])).await.unwrap();

    assert_eq!(result.status, RunStatus::CompletedWithFailures);
    assert!(!result.succeeded());
    assert_eq!(result.steps.len(), 3);
    assert_eq!(result.steps[1].status, StepStatus::FailedContinued);
    assert_eq!(result.steps[1].attempts, 2);
    assert!(result.steps[1].failure.is_some());
    assert_eq!(result.steps[2].status, StepStatus::Succeeded);
    // Failed step leaves no output behind.
    assert!(!result.outputs.contains_key("s2"));
    // s1 + two s2 attempts + s3.
    assert_eq!(invoker.calls(), 4);
}

#[tokio::test]
async fn test_abort_on_exhaustion_skips_remaining_steps() {
    let yaml = THREE_STEP_TASK.replace("CONTINUE", "false");
    let config = load_config(&yaml);
    let invoker = ScriptedInvoker::new(vec![]);
    let runner = ScriptedRunner::new(vec![1, 1]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let err = executor.run("t", inputs(&[])).await.unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::ValidationExhausted { ref step, .. } if step == "s2"
    ));
    // s3 never ran: s1 + two s2 attempts.
    assert_eq!(invoker.calls(), 3);
    assert_eq!(invoker.prompts(), vec!["one", "two", "two"]);
}

#[tokio::test]
async fn test_invocation_failure_without_validation_aborts() {
    let config = load_config(ECHO_TASK);
    let invoker = ScriptedInvoker::new(vec![Err("model unavailable")]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    let err = executor
        .run("t", inputs(&[("prompt", "hello")]))
        .await
        .unwrap_err();
    match err {
        ExecutionError::InvocationFailed { step, message } => {
            assert_eq!(step, "s1");
            assert!(message.contains("model unavailable"));
        }
        other => panic!("expected InvocationFailed, got {other}"),
    }
    // No implicit retries without an explicit validation policy.
    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn test_invocation_failure_counts_against_validation_retries() {
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "invoke fails once, then passes"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "go"
        validate:
          command: "make test"
          max_retries: 1
"#,
    );
    let invoker = ScriptedInvoker::new(vec![Err("transient"), Ok("fine")]);
    let runner = ScriptedRunner::new(vec![0]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner.clone());

    let result = executor.run("t", inputs(&[])).await.unwrap();
    assert_eq!(invoker.calls(), 2);
    // Validation only ran for the attempt that produced output.
    assert_eq!(runner.calls(), 1);
    assert_eq!(result.steps[0].attempts, 2);
    assert_eq!(result.outputs["s1"], "fine");
}

#[tokio::test]
async fn test_validation_command_sees_own_step_output() {
    let config = load_config(
        r#"
version: 1
agents:
  - id: echo
    role: "Echo"
    model: x
    instructions: "say hi"
tasks:
  - id: t
    description: "validation references output"
    steps:
      - id: s1
        agent:
          use: echo
          with:
            prompt: "go"
        validate:
          command: "check {{ steps.s1.text }}"
"#,
    );
    let invoker = ScriptedInvoker::new(vec![Ok("artifact.txt")]);
    let runner = ScriptedRunner::new(vec![0]);
    let executor = WorkflowExecutor::new(config, invoker, runner.clone());

    executor.run("t", inputs(&[])).await.unwrap();
    assert_eq!(runner.commands(), vec!["check artifact.txt".to_string()]);
}

#[tokio::test]
async fn test_unknown_task_is_rejected() {
    let config = load_config(ECHO_TASK);
    let invoker = ScriptedInvoker::new(vec![]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker, runner);

    assert!(matches!(
        executor.run("missing", inputs(&[])).await.unwrap_err(),
        ExecutionError::UnknownTask(_)
    ));
}

#[tokio::test]
async fn test_unknown_agent_aborts_at_selection() {
    let config = load_config(
        r#"
version: 1
tasks:
  - id: t
    description: "references a missing agent"
    steps:
      - id: s1
        agent:
          use: ghost
          with:
            prompt: "go"
"#,
    );
    let invoker = ScriptedInvoker::new(vec![]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    match executor.run("t", inputs(&[])).await.unwrap_err() {
        ExecutionError::UnknownAgent { step, agent } => {
            assert_eq!(step, "s1");
            assert_eq!(agent, "ghost");
        }
        other => panic!("expected UnknownAgent, got {other}"),
    }
    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn test_cancellation_before_first_step() {
    let config = load_config(ECHO_TASK);
    let invoker = ScriptedInvoker::new(vec![]);
    let runner = ScriptedRunner::new(vec![]);
    let executor = WorkflowExecutor::new(config, invoker.clone(), runner);

    executor.cancel_token().cancel();
    let err = executor
        .run("t", inputs(&[("prompt", "hello")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Cancelled { .. }));
    assert_eq!(invoker.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_runs_share_configuration() {
    let config = load_config(ECHO_TASK);
    let invoker_a = ScriptedInvoker::new(vec![Ok("a")]);
    let invoker_b = ScriptedInvoker::new(vec![Ok("b")]);
    let exec_a = WorkflowExecutor::new(config.clone(), invoker_a, ScriptedRunner::new(vec![]));
    let exec_b = WorkflowExecutor::new(config, invoker_b, ScriptedRunner::new(vec![]));

    let (a, b) = tokio::join!(
        exec_a.run("t", inputs(&[("prompt", "one")])),
        exec_b.run("t", inputs(&[("prompt", "two")])),
    );
    assert_eq!(a.unwrap().outputs["s1"], "a");
    assert_eq!(b.unwrap().outputs["s1"], "b");
}

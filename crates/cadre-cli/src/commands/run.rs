//! `cadre run` — execute a task from the loaded configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use cadre_core::models::ParamValue;
use cadre_core::workflow::{ProcessCommandRunner, StepStatus, WorkflowExecutor};

use crate::commands::{load_configuration, parse_key_val};
use crate::invoker::ProcessAgentInvoker;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config_path: Option<&str>,
    strict: bool,
    task_id: &str,
    prompt: Option<&str>,
    inputs: &[String],
    agent_cmd: &str,
    json: bool,
) -> Result<(), String> {
    let config = load_configuration(config_path, strict)?;
    tracing::debug!(task = task_id, agent_cmd, "starting task run");

    let mut run_inputs: BTreeMap<String, ParamValue> = BTreeMap::new();
    for pair in inputs {
        let (key, value) = parse_key_val(pair)?;
        run_inputs.insert(key, ParamValue::from(value));
    }
    if let Some(prompt) = prompt {
        run_inputs.insert("prompt".to_string(), ParamValue::from(prompt));
    }

    let (description, step_count) = match config.task(task_id) {
        Some(task) => (task.description.clone(), task.steps.len()),
        None => {
            let available: Vec<&str> = config.tasks().map(|t| t.id.as_str()).collect();
            return Err(format!(
                "task '{task_id}' not found. Available tasks: {}",
                available.join(", ")
            ));
        }
    };

    if !json {
        println!("📄 {task_id} — {description}");
        println!("   {step_count} step(s)");
        println!();
    }

    let executor = WorkflowExecutor::new(
        Arc::new(config),
        Arc::new(ProcessAgentInvoker::new(agent_cmd)),
        Arc::new(ProcessCommandRunner::new()),
    );

    let result = executor
        .run(task_id, run_inputs)
        .await
        .map_err(|e| format!("run aborted: {e}"))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?
        );
        return Ok(());
    }

    for record in &result.steps {
        match record.status {
            StepStatus::Succeeded => {
                println!("   ✅ {} ({} attempt(s))", record.step_id, record.attempts);
            }
            StepStatus::FailedContinued => {
                println!(
                    "   ❌ {} — {}",
                    record.step_id,
                    record.failure.as_deref().unwrap_or("failed")
                );
            }
        }
    }

    if result.succeeded() {
        println!("\n🎉 Task '{task_id}' completed successfully");
    } else {
        println!("\n⚠ Task '{task_id}' completed, but some steps failed");
    }
    Ok(())
}

//! Collaborator seams: the agent invoker and the validation command runner.
//!
//! The executor never talks to a model or spawns a process directly. Actor
//! turns go through [`AgentInvoker`], which must honor the supplied tool
//! policy and enforce the resource limits itself. Validation checks go
//! through [`CommandRunner`]. Both are trait objects so runs can be driven
//! by real processes, HTTP adapters, or test fakes.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ResourceLimits, ToolAccessPolicy, ToolsCatalog};

/// Everything an invoker needs for one agent turn.
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    /// Fully rendered prompt.
    pub prompt: &'a str,
    /// Actor/model identifier from the agent definition.
    pub model: &'a str,
    /// Literal instruction text (system prompt).
    pub instructions: &'a str,
    /// Capability filter the invoker must apply to tool-use attempts,
    /// under [`crate::policy`] semantics.
    pub policy: &'a ToolAccessPolicy,
    pub catalog: &'a ToolsCatalog,
    /// Enforced by the invoker, not the executor.
    pub limits: &'a ResourceLimits,
    pub working_dir: &'a Path,
}

/// A successful agent turn.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("resource limit exceeded: {message}")]
    LimitExceeded { message: String },

    #[error("agent invocation failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, request: InvocationRequest<'_>) -> Result<AgentOutput, InvocationError>;
}

/// Captured result of a validation command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, RunnerError>;
}

/// Default [`CommandRunner`]: runs the command through `sh -c` in the task's
/// working directory and captures its output.
#[derive(Debug, Clone, Default)]
pub struct ProcessCommandRunner {
    /// Applied to every command when set.
    pub timeout: Option<Duration>,
}

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, RunnerError> {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_err = |e: std::io::Error| RunnerError::Spawn {
            command: command.to_string(),
            message: e.to_string(),
        };

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| RunnerError::Timeout {
                    command: command.to_string(),
                    timeout,
                })?
                .map_err(spawn_err)?,
            None => cmd.output().await.map_err(spawn_err)?,
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

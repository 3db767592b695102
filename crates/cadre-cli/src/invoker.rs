//! Process-backed agent invoker.
//!
//! Spawns a headless agent CLI (Claude Code compatible flags, `claude` by
//! default) for each agent turn: the rendered prompt goes in via `-p`, the
//! agent definition supplies `--model` and the appended system prompt, and
//! the tool-access policy maps to `--allowedTools`/`--disallowedTools`
//! patterns. The runtime limit is enforced here with a tokio timeout, as the
//! invoker contract requires.

use std::process::Stdio;

use async_trait::async_trait;

use cadre_core::models::{AccessMode, ToolAccessPolicy, ToolsCatalog};
use cadre_core::policy::{is_command_allowed, is_mcp_allowed};
use cadre_core::workflow::{AgentInvoker, AgentOutput, InvocationError, InvocationRequest};

pub struct ProcessAgentInvoker {
    command: String,
}

impl ProcessAgentInvoker {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Catalog entries the policy allows, as agent-CLI tool patterns: command
/// ids become `Bash(<id>:*)`, MCP server ids become `mcp__<id>__*`. Ids the
/// catalog does not know are dropped here, which matches the evaluator:
/// they are denied whatever the policy says.
fn allowed_patterns(policy: &ToolAccessPolicy, catalog: &ToolsCatalog) -> Vec<String> {
    catalog
        .commands()
        .filter(|c| is_command_allowed(catalog, policy, &c.id))
        .map(|c| format!("Bash({}:*)", c.id))
        .chain(
            catalog
                .mcp_servers()
                .filter(|s| is_mcp_allowed(catalog, policy, &s.id))
                .map(|s| format!("mcp__{}__*", s.id)),
        )
        .collect()
}

/// Blacklisted ids as deny patterns, taken straight from the policy.
fn denied_patterns(policy: &ToolAccessPolicy) -> Vec<String> {
    policy
        .commands
        .iter()
        .map(|id| format!("Bash({id}:*)"))
        .chain(policy.mcp.iter().map(|id| format!("mcp__{id}__*")))
        .collect()
}

#[async_trait]
impl AgentInvoker for ProcessAgentInvoker {
    async fn invoke(&self, request: InvocationRequest<'_>) -> Result<AgentOutput, InvocationError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.arg("-p")
            .arg(request.prompt)
            .arg("--model")
            .arg(request.model)
            .arg("--append-system-prompt")
            .arg(request.instructions)
            .current_dir(request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(iterations) = request.limits.iterations {
            cmd.arg("--max-turns").arg(iterations.to_string());
        }

        match request.policy.mode {
            // An empty whitelist still gets the flag: no tools allowed.
            AccessMode::Whitelist => {
                let patterns = allowed_patterns(request.policy, request.catalog);
                cmd.arg("--allowedTools").arg(patterns.join(","));
            }
            AccessMode::Blacklist => {
                let patterns = denied_patterns(request.policy);
                if !patterns.is_empty() {
                    cmd.arg("--disallowedTools").arg(patterns.join(","));
                }
            }
        }

        let spawn_err = |e: std::io::Error| {
            InvocationError::Failed(format!("failed to spawn `{}`: {e}", self.command))
        };
        let output = match request.limits.runtime {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| InvocationError::LimitExceeded {
                    message: format!("runtime limit of {}s exceeded", timeout.as_secs()),
                })?
                .map_err(spawn_err)?,
            None => cmd.output().await.map_err(spawn_err)?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InvocationError::Failed(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(AgentOutput {
            text: String::from_utf8_lossy(&output.stdout)
                .trim_end()
                .to_string(),
        })
    }
}

//! Configuration loader: import resolution, merging, and validation.
//!
//! Imports are resolved depth-first relative to the importing document's
//! directory, with an explicit resolving stack for precise cycle diagnostics.
//! A document already merged in the same load is skipped on re-import, so
//! diamond-shaped graphs load each fragment exactly once. Tool, agent, and
//! task ids must be unique across the whole merged graph.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::schema::{
    RawAgent, RawCommand, RawDocument, RawMcp, RawStep, RawTask, RawValidation,
};
use crate::config::Configuration;
use crate::error::{ConfigError, EntityKind};
use crate::models::agent::is_instructions_path;
use crate::models::{
    parse_duration, AccessMode, AgentDef, ArgsMode, CommandTool, FilesScope, McpServer,
    McpTransport, ResourceLimits, StepDef, TaskDef, ToolAccessPolicy, ToolsCatalog,
    ValidationSpec,
};

/// Loads a root document and its transitive imports into a [`Configuration`].
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    strict: bool,
}

#[derive(Default)]
struct LoadState {
    /// Documents currently being resolved, for cycle detection.
    stack: Vec<PathBuf>,
    /// Documents fully merged in this load.
    visited: HashSet<PathBuf>,
    catalog: ToolsCatalog,
    agents: BTreeMap<String, AgentDef>,
    tasks: BTreeMap<String, TaskDef>,
    command_sources: HashMap<String, PathBuf>,
    mcp_sources: HashMap<String, PathBuf>,
    agent_sources: HashMap<String, PathBuf>,
    task_sources: HashMap<String, PathBuf>,
    root_doc: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// In strict mode, an agent policy referencing a tool id absent from the
    /// merged catalog fails the load instead of logging a warning.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load and fully validate a configuration. Either the whole graph loads,
    /// or the first error aborts the load; no partial configuration is ever
    /// returned.
    pub fn load(&self, root: impl AsRef<Path>) -> Result<Configuration, ConfigError> {
        let mut state = LoadState::default();
        self.load_document(root.as_ref(), &mut state, true)?;
        self.check_tool_refs(&state)?;

        let root_doc = state.root_doc.unwrap_or_else(|| root.as_ref().to_path_buf());
        let root_dir = root_doc
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            document = %root_doc.display(),
            commands = state.catalog.commands().count(),
            mcp = state.catalog.mcp_servers().count(),
            agents = state.agents.len(),
            tasks = state.tasks.len(),
            "configuration loaded"
        );

        Ok(Configuration {
            root_dir,
            tools: state.catalog,
            agents: state.agents,
            tasks: state.tasks,
        })
    }

    fn load_document(
        &self,
        path: &Path,
        state: &mut LoadState,
        is_root: bool,
    ) -> Result<(), ConfigError> {
        let document = path.canonicalize().map_err(|e| ConfigError::Io {
            document: path.to_path_buf(),
            message: format!("cannot resolve document: {e}"),
        })?;

        if let Some(pos) = state.stack.iter().position(|p| p == &document) {
            let mut chain = state.stack[pos..].to_vec();
            chain.push(document);
            return Err(ConfigError::ImportCycle { chain });
        }
        if !state.visited.insert(document.clone()) {
            debug!(document = %document.display(), "document already merged, skipping");
            return Ok(());
        }

        let text = fs::read_to_string(&document).map_err(|e| ConfigError::Io {
            document: document.clone(),
            message: e.to_string(),
        })?;
        let raw: RawDocument = serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            document: document.clone(),
            message: e.to_string(),
        })?;

        match raw.version {
            Some(v) if v < 1 => {
                return Err(ConfigError::InvalidRange {
                    document,
                    field: "version".to_string(),
                    message: format!("must be >= 1, got {v}"),
                });
            }
            // Imported fragments may omit the version; the root must not.
            None if is_root => {
                return Err(ConfigError::MissingField {
                    document,
                    entity: "document".to_string(),
                    field: "version",
                });
            }
            _ => {}
        }

        if is_root {
            state.root_doc = Some(document.clone());
        }

        debug!(document = %document.display(), imports = raw.imports.len(), "loading document");

        let dir = document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        state.stack.push(document.clone());
        let merged = (|| {
            // Imports merge before the document's own inline sections.
            for import in &raw.imports {
                let target = resolve_import(&dir, import);
                self.load_document(&target, state, false)?;
            }
            self.merge_document(&document, &dir, &raw, state)
        })();
        state.stack.pop();
        merged
    }

    fn merge_document(
        &self,
        document: &Path,
        dir: &Path,
        raw: &RawDocument,
        state: &mut LoadState,
    ) -> Result<(), ConfigError> {
        if let Some(tools) = &raw.tools {
            for raw_command in &tools.commands {
                let command = convert_command(document, raw_command)?;
                if let Some(first) = state.command_sources.get(&command.id) {
                    return Err(ConfigError::DuplicateId {
                        kind: EntityKind::Command,
                        id: command.id,
                        first: first.clone(),
                        second: document.to_path_buf(),
                    });
                }
                state
                    .command_sources
                    .insert(command.id.clone(), document.to_path_buf());
                state.catalog.insert_command(command);
            }
            for raw_mcp in &tools.mcp {
                let server = convert_mcp(document, raw_mcp)?;
                if let Some(first) = state.mcp_sources.get(&server.id) {
                    return Err(ConfigError::DuplicateId {
                        kind: EntityKind::McpServer,
                        id: server.id,
                        first: first.clone(),
                        second: document.to_path_buf(),
                    });
                }
                state
                    .mcp_sources
                    .insert(server.id.clone(), document.to_path_buf());
                state.catalog.insert_mcp(server);
            }
        }

        for raw_agent in &raw.agents {
            let agent = convert_agent(document, dir, raw_agent)?;
            if let Some(first) = state.agent_sources.get(&agent.id) {
                return Err(ConfigError::DuplicateId {
                    kind: EntityKind::Agent,
                    id: agent.id,
                    first: first.clone(),
                    second: document.to_path_buf(),
                });
            }
            state
                .agent_sources
                .insert(agent.id.clone(), document.to_path_buf());
            state.agents.insert(agent.id.clone(), agent);
        }

        for raw_task in &raw.tasks {
            let task = convert_task(document, raw_task)?;
            if let Some(first) = state.task_sources.get(&task.id) {
                return Err(ConfigError::DuplicateId {
                    kind: EntityKind::Task,
                    id: task.id,
                    first: first.clone(),
                    second: document.to_path_buf(),
                });
            }
            state
                .task_sources
                .insert(task.id.clone(), document.to_path_buf());
            state.tasks.insert(task.id.clone(), task);
        }

        Ok(())
    }

    /// Agent policies may only name tools the merged catalog knows about.
    /// Checked after the whole graph is merged, since a fragment loaded later
    /// may contribute the tool.
    fn check_tool_refs(&self, state: &LoadState) -> Result<(), ConfigError> {
        for agent in state.agents.values() {
            let document = state
                .agent_sources
                .get(&agent.id)
                .cloned()
                .unwrap_or_default();
            for id in &agent.tools.commands {
                if !state.catalog.has_command(id) {
                    if self.strict {
                        return Err(ConfigError::UnknownToolRef {
                            document,
                            agent: agent.id.clone(),
                            kind: EntityKind::Command,
                            id: id.clone(),
                        });
                    }
                    warn!(
                        agent = %agent.id,
                        command = %id,
                        "agent policy references a command not in the catalog; it will always be denied"
                    );
                }
            }
            for id in &agent.tools.mcp {
                if !state.catalog.has_mcp(id) {
                    if self.strict {
                        return Err(ConfigError::UnknownToolRef {
                            document,
                            agent: agent.id.clone(),
                            kind: EntityKind::McpServer,
                            id: id.clone(),
                        });
                    }
                    warn!(
                        agent = %agent.id,
                        mcp = %id,
                        "agent policy references an mcp server not in the catalog; it will always be denied"
                    );
                }
            }
        }
        Ok(())
    }
}

fn resolve_import(dir: &Path, import: &str) -> PathBuf {
    let path = Path::new(import);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

fn require_field(
    document: &Path,
    entity: impl Into<String>,
    field: &'static str,
    value: Option<&str>,
) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingField {
            document: document.to_path_buf(),
            entity: entity.into(),
            field,
        }),
    }
}

fn parse_mode(
    document: &Path,
    field: String,
    value: &str,
) -> Result<AccessMode, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "whitelist" => Ok(AccessMode::Whitelist),
        "blacklist" => Ok(AccessMode::Blacklist),
        _ => Err(ConfigError::InvalidEnum {
            document: document.to_path_buf(),
            field,
            value: value.to_string(),
            expected: "`whitelist` or `blacklist`",
        }),
    }
}

fn parse_timeout(
    document: &Path,
    field: String,
    value: Option<&str>,
) -> Result<Option<std::time::Duration>, ConfigError> {
    value
        .map(|v| {
            parse_duration(v).map_err(|message| ConfigError::InvalidRange {
                document: document.to_path_buf(),
                field: field.clone(),
                message,
            })
        })
        .transpose()
}

fn convert_command(document: &Path, raw: &RawCommand) -> Result<CommandTool, ConfigError> {
    let id = require_field(document, "command", "id", raw.id.as_deref())?;
    let bin = require_field(
        document,
        format!("command `{id}`"),
        "bin",
        raw.bin.as_deref(),
    )?;
    let args_mode = match raw.args_mode.as_deref() {
        None => ArgsMode::Whitelist,
        Some(value) => match parse_mode(
            document,
            format!("tools.commands[{id}].args_mode"),
            value,
        )? {
            AccessMode::Whitelist => ArgsMode::Whitelist,
            AccessMode::Blacklist => ArgsMode::Blacklist,
        },
    };
    let timeout = parse_timeout(
        document,
        format!("tools.commands[{id}].timeout"),
        raw.timeout.as_deref(),
    )?;
    Ok(CommandTool {
        id,
        bin,
        args: raw.args.clone(),
        args_mode,
        timeout,
    })
}

fn convert_mcp(document: &Path, raw: &RawMcp) -> Result<McpServer, ConfigError> {
    let id = require_field(document, "mcp server", "id", raw.id.as_deref())?;
    let transport_raw = require_field(
        document,
        format!("mcp server `{id}`"),
        "transport",
        raw.transport.as_deref(),
    )?;
    let transport = match transport_raw.to_ascii_lowercase().as_str() {
        "stdio" => McpTransport::Stdio,
        "http" => McpTransport::Http,
        _ => {
            return Err(ConfigError::InvalidEnum {
                document: document.to_path_buf(),
                field: format!("tools.mcp[{id}].transport"),
                value: transport_raw,
                expected: "`stdio` or `http`",
            });
        }
    };
    if raw.command.is_empty() {
        return Err(ConfigError::MissingField {
            document: document.to_path_buf(),
            entity: format!("mcp server `{id}`"),
            field: "command",
        });
    }
    Ok(McpServer {
        id,
        transport,
        command: raw.command.clone(),
        calls: raw.calls.clone(),
    })
}

fn convert_agent(document: &Path, dir: &Path, raw: &RawAgent) -> Result<AgentDef, ConfigError> {
    let id = require_field(document, "agent", "id", raw.id.as_deref())?;
    let entity = format!("agent `{id}`");
    let role = require_field(document, entity.clone(), "role", raw.role.as_deref())?;
    let model = require_field(document, entity.clone(), "model", raw.model.as_deref())?;
    let raw_instructions =
        require_field(document, entity.clone(), "instructions", raw.instructions.as_deref())?;

    // A path reference resolves relative to the document that defined the
    // agent, and is read into literal text here at load time.
    let instructions = if is_instructions_path(&raw_instructions) {
        let path = Path::new(&raw_instructions);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            dir.join(path)
        };
        fs::read_to_string(&resolved).map_err(|e| ConfigError::Io {
            document: resolved.clone(),
            message: format!("failed to read instructions for agent `{id}`: {e}"),
        })?
    } else {
        raw_instructions
    };

    let tools = match &raw.tools {
        None => ToolAccessPolicy::default(),
        Some(raw_tools) => {
            let mode = match raw_tools.mode.as_deref() {
                None => AccessMode::Whitelist,
                Some(value) => parse_mode(document, format!("agents[{id}].tools.mode"), value)?,
            };
            ToolAccessPolicy {
                mode,
                commands: raw_tools.commands.iter().cloned().collect(),
                mcp: raw_tools.mcp.iter().cloned().collect(),
            }
        }
    };

    let limits = match &raw.limits {
        None => ResourceLimits::default(),
        Some(raw_limits) => {
            let runtime = parse_timeout(
                document,
                format!("agents[{id}].limits.runtime"),
                raw_limits.runtime.as_deref(),
            )?;
            let iterations = match raw_limits.iterations {
                None => None,
                Some(n) if (1..=i64::from(u32::MAX)).contains(&n) => Some(n as u32),
                Some(n) => {
                    return Err(ConfigError::InvalidRange {
                        document: document.to_path_buf(),
                        field: format!("agents[{id}].limits.iterations"),
                        message: format!("must be >= 1, got {n}"),
                    });
                }
            };
            ResourceLimits { runtime, iterations }
        }
    };

    Ok(AgentDef {
        id,
        role,
        model,
        instructions,
        tools,
        limits,
    })
}

fn convert_task(document: &Path, raw: &RawTask) -> Result<TaskDef, ConfigError> {
    let id = require_field(document, "task", "id", raw.id.as_deref())?;
    let entity = format!("task `{id}`");
    let description =
        require_field(document, entity.clone(), "description", raw.description.as_deref())?;
    let working_dir = raw
        .working_dir
        .clone()
        .unwrap_or_else(|| ".".to_string());

    let files = match &raw.files {
        None => FilesScope::default(),
        Some(raw_files) => {
            for (field, patterns) in [("files.read", &raw_files.read), ("files.write", &raw_files.write)]
            {
                for pattern in patterns {
                    if let Err(e) = glob::Pattern::new(pattern) {
                        return Err(ConfigError::InvalidGlob {
                            document: document.to_path_buf(),
                            field: format!("tasks[{id}].{field}"),
                            pattern: pattern.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            FilesScope {
                read: raw_files.read.clone(),
                write: raw_files.write.clone(),
            }
        }
    };

    let mut steps: Vec<StepDef> = Vec::with_capacity(raw.steps.len());
    for (index, raw_step) in raw.steps.iter().enumerate() {
        let step = convert_step(document, &id, index, raw_step, &steps)?;
        if steps.iter().any(|s| s.id == step.id) {
            return Err(ConfigError::DuplicateId {
                kind: EntityKind::Step,
                id: step.id,
                first: document.to_path_buf(),
                second: document.to_path_buf(),
            });
        }
        steps.push(step);
    }

    Ok(TaskDef {
        id,
        description,
        working_dir,
        files,
        steps,
    })
}

fn convert_step(
    document: &Path,
    task_id: &str,
    index: usize,
    raw: &RawStep,
    earlier: &[StepDef],
) -> Result<StepDef, ConfigError> {
    let entity = format!("step #{} of task `{task_id}`", index + 1);
    let id = require_field(document, entity.clone(), "id", raw.id.as_deref())?;

    let invocation = raw.agent.as_ref().ok_or_else(|| ConfigError::MissingField {
        document: document.to_path_buf(),
        entity: entity.clone(),
        field: "agent",
    })?;
    let agent = require_field(
        document,
        entity.clone(),
        "agent.use",
        invocation.agent_id.as_deref(),
    )?;
    let with = invocation.with.clone().unwrap_or_default();
    let prompt = require_field(
        document,
        entity.clone(),
        "agent.with.prompt",
        with.prompt.as_deref(),
    )?;

    // Fail fast: context_from may only name steps that occur earlier in the
    // same task.
    for reference in &with.context_from {
        if !earlier.iter().any(|s| &s.id == reference) {
            return Err(ConfigError::UnknownStepRef {
                document: document.to_path_buf(),
                task: task_id.to_string(),
                step: id,
                reference: reference.clone(),
            });
        }
    }

    let validate = raw
        .validate
        .as_ref()
        .map(|raw_validation| convert_validation(document, &entity, raw_validation))
        .transpose()?;

    Ok(StepDef {
        id,
        name: raw.name.clone(),
        agent,
        prompt,
        params: with.params,
        context_from: with.context_from,
        validate,
    })
}

fn convert_validation(
    document: &Path,
    entity: &str,
    raw: &RawValidation,
) -> Result<ValidationSpec, ConfigError> {
    let command = require_field(document, entity, "validate.command", raw.command.as_deref())?;
    Ok(ValidationSpec {
        command,
        max_retries: raw.max_retries,
        continue_on_failure: raw.continue_on_failure,
    })
}

//! Raw YAML schema for configuration documents.
//!
//! A document declares tools, agents, and tasks, and may compose other
//! documents via `imports`:
//!
//! ```yaml
//! version: 1
//!
//! imports:
//!   - fragments/tools.yaml
//!   - fragments/agents.yaml
//!
//! tools:
//!   commands:
//!     - id: git
//!       bin: git
//!       args: ["status", "diff", "log"]
//!       timeout: "2m"
//!   mcp:
//!     - id: fs
//!       transport: stdio
//!       command: ["npx", "-y", "@modelcontextprotocol/server-filesystem", "."]
//!       calls: ["read_file", "list_directory"]
//!
//! agents:
//!   - id: coder
//!     role: "Software Developer"
//!     model: claude-sonnet-4-5
//!     instructions: agents/coder.md
//!     tools:
//!       mode: whitelist
//!       commands: ["git", "make"]
//!     limits:
//!       runtime: "10m"
//!       iterations: 30
//!
//! tasks:
//!   - id: code
//!     description: "Implement -> test -> review"
//!     working_dir: "."
//!     files:
//!       read: ["**/*"]
//!     steps:
//!       - id: implement
//!         agent:
//!           use: coder
//!           with:
//!             prompt: "Implement: {{ inputs.prompt }}"
//!         validate:
//!           command: "make test"
//!           max_retries: 2
//!           continue_on_failure: false
//! ```
//!
//! Fields that the loader requires are still optional here: the
//! [`loader`](crate::config::loader) validates them explicitly so errors can
//! name the document, entity, and field instead of surfacing as serde noise.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::ParamValue;

/// One configuration document, before import resolution and validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDocument {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub tools: Option<RawTools>,
    #[serde(default)]
    pub agents: Vec<RawAgent>,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTools {
    #[serde(default)]
    pub commands: Vec<RawCommand>,
    #[serde(default)]
    pub mcp: Vec<RawMcp>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCommand {
    pub id: Option<String>,
    pub bin: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub args_mode: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMcp {
    pub id: Option<String>,
    pub transport: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub calls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAgent {
    pub id: Option<String>,
    pub role: Option<String>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub tools: Option<RawAgentTools>,
    pub limits: Option<RawLimits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAgentTools {
    pub mode: Option<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub mcp: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLimits {
    pub runtime: Option<String>,
    pub iterations: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTask {
    pub id: Option<String>,
    pub description: Option<String>,
    pub working_dir: Option<String>,
    pub files: Option<RawFiles>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFiles {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStep {
    pub id: Option<String>,
    pub name: Option<String>,
    pub agent: Option<RawAgentInvocation>,
    pub validate: Option<RawValidation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAgentInvocation {
    #[serde(rename = "use")]
    pub agent_id: Option<String>,
    pub with: Option<RawWith>,
}

/// The `with` bag: `prompt` and `context_from` are structural, everything
/// else flattens into free-form parameters. (`deny_unknown_fields` cannot be
/// combined with `flatten`, which is exactly what we want here.)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWith {
    pub prompt: Option<String>,
    #[serde(default)]
    pub context_from: Vec<String>,
    #[serde(flatten)]
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawValidation {
    pub command: Option<String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub continue_on_failure: bool,
}

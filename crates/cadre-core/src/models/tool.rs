//! External capabilities an agent may be permitted to use: command-line
//! binaries and MCP servers.

use std::collections::BTreeMap;
use std::time::Duration;

/// Whether a command's `args` list permits or forbids the listed arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgsMode {
    #[default]
    Whitelist,
    Blacklist,
}

/// A named command-line capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTool {
    /// Unique id within the merged configuration.
    pub id: String,
    /// Binary or executable name.
    pub bin: String,
    /// Argument filter; empty means unrestricted.
    pub args: Vec<String>,
    pub args_mode: ArgsMode,
    /// Per-invocation timeout for this command.
    pub timeout: Option<Duration>,
}

impl CommandTool {
    /// Check a single argument against the command's argument policy.
    pub fn is_arg_allowed(&self, arg: &str) -> bool {
        if self.args.is_empty() {
            return true;
        }
        let listed = self.args.iter().any(|a| a == arg);
        match self.args_mode {
            ArgsMode::Whitelist => listed,
            ArgsMode::Blacklist => !listed,
        }
    }
}

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpTransport {
    Stdio,
    Http,
}

impl std::fmt::Display for McpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McpTransport::Stdio => f.write_str("stdio"),
            McpTransport::Http => f.write_str("http"),
        }
    }
}

/// A named MCP server capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    /// Unique id within the merged configuration.
    pub id: String,
    pub transport: McpTransport,
    /// Launch command as an ordered argv list.
    pub command: Vec<String>,
    /// Calls this server exposes; empty means unspecified.
    pub calls: Vec<String>,
}

/// All tools known to a merged configuration, keyed by id within each kind.
#[derive(Debug, Clone, Default)]
pub struct ToolsCatalog {
    commands: BTreeMap<String, CommandTool>,
    mcp: BTreeMap<String, McpServer>,
}

impl ToolsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a command; returns false when the id is already taken.
    pub fn insert_command(&mut self, command: CommandTool) -> bool {
        if self.commands.contains_key(&command.id) {
            return false;
        }
        self.commands.insert(command.id.clone(), command);
        true
    }

    /// Insert an MCP server; returns false when the id is already taken.
    pub fn insert_mcp(&mut self, server: McpServer) -> bool {
        if self.mcp.contains_key(&server.id) {
            return false;
        }
        self.mcp.insert(server.id.clone(), server);
        true
    }

    pub fn command(&self, id: &str) -> Option<&CommandTool> {
        self.commands.get(id)
    }

    pub fn mcp(&self, id: &str) -> Option<&McpServer> {
        self.mcp.get(id)
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.commands.contains_key(id)
    }

    pub fn has_mcp(&self, id: &str) -> bool {
        self.mcp.contains_key(id)
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandTool> {
        self.commands.values()
    }

    pub fn mcp_servers(&self) -> impl Iterator<Item = &McpServer> {
        self.mcp.values()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.mcp.is_empty()
    }
}

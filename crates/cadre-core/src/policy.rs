//! Access-control evaluation for agent tool policies.
//!
//! Pure functions over `(catalog, policy, id)`. An identifier the catalog
//! does not know is always denied, whatever the policy says.

use crate::models::{AccessMode, ToolAccessPolicy, ToolsCatalog};

/// Decide whether an agent may use the given command.
pub fn is_command_allowed(
    catalog: &ToolsCatalog,
    policy: &ToolAccessPolicy,
    command_id: &str,
) -> bool {
    if !catalog.has_command(command_id) {
        return false;
    }
    match policy.mode {
        AccessMode::Whitelist => policy.commands.contains(command_id),
        AccessMode::Blacklist => !policy.commands.contains(command_id),
    }
}

/// Decide whether an agent may use the given MCP server.
pub fn is_mcp_allowed(catalog: &ToolsCatalog, policy: &ToolAccessPolicy, server_id: &str) -> bool {
    if !catalog.has_mcp(server_id) {
        return false;
    }
    match policy.mode {
        AccessMode::Whitelist => policy.mcp.contains(server_id),
        AccessMode::Blacklist => !policy.mcp.contains(server_id),
    }
}

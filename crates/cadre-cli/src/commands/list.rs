//! `cadre list` — show the tasks, agents, and tools a configuration defines.

use crate::commands::{load_configuration, truncate};

pub fn run(config_path: Option<&str>, strict: bool) -> Result<(), String> {
    let config = load_configuration(config_path, strict)?;

    println!("┌──────────────────┬──────────────────────────────────────┬───────┐");
    println!("│ Task             │ Description                          │ Steps │");
    println!("├──────────────────┼──────────────────────────────────────┼───────┤");
    for task in config.tasks() {
        println!(
            "│ {:<16} │ {:<36} │ {:<5} │",
            truncate(&task.id, 16),
            truncate(&task.description, 36),
            task.steps.len()
        );
    }
    println!("└──────────────────┴──────────────────────────────────────┴───────┘");

    println!();
    println!("┌──────────────────┬──────────────────────────┬──────────────────┐");
    println!("│ Agent            │ Role                     │ Model            │");
    println!("├──────────────────┼──────────────────────────┼──────────────────┤");
    for agent in config.agents() {
        println!(
            "│ {:<16} │ {:<24} │ {:<16} │",
            truncate(&agent.id, 16),
            truncate(&agent.role, 24),
            truncate(&agent.model, 16)
        );
    }
    println!("└──────────────────┴──────────────────────────┴──────────────────┘");

    if !config.tools().is_empty() {
        println!();
        println!("Tools:");
        for command in config.tools().commands() {
            println!("  - {} (command: {})", command.id, command.bin);
        }
        for server in config.tools().mcp_servers() {
            println!("  - {} (mcp: {})", server.id, server.transport);
        }
    }
    Ok(())
}

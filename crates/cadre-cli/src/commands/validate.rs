//! `cadre validate` — load the configuration without executing anything.

use crate::commands::load_configuration;

pub fn run(config_path: Option<&str>, strict: bool) -> Result<(), String> {
    let config = load_configuration(config_path, strict)?;

    println!("✅ configuration is valid");
    println!(
        "   Tools  : {} command(s), {} mcp server(s)",
        config.tools().commands().count(),
        config.tools().mcp_servers().count()
    );
    println!("   Agents : {}", config.agents().count());
    println!("   Tasks  : {}", config.tasks().count());
    for task in config.tasks() {
        println!("     - {} ({} step(s))", task.id, task.steps.len());
    }
    Ok(())
}

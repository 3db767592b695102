//! Cadre CLI — declarative multi-agent task automation.
//!
//! Thin surface over cadre-core: load a configuration, then validate it,
//! list what it defines, or run one of its tasks.

use clap::{Parser, Subcommand};

use cadre_cli::commands;

/// Cadre — declarative multi-agent task automation
#[derive(Parser)]
#[command(
    name = "cadre",
    version,
    about = "Cadre — declarative multi-agent task automation"
)]
struct Cli {
    /// Path to the configuration file (searched upward from the current
    /// directory when omitted)
    #[arg(long, env = "CADRE_CONFIG", global = true)]
    config: Option<String>,

    /// Fail the load when an agent references a tool id missing from the
    /// catalog
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task from the configuration
    Run {
        /// Task id
        task: String,

        /// Value for the `{{ inputs.prompt }}` parameter
        #[arg(short = 'p', long)]
        prompt: Option<String>,

        /// Additional named input (repeatable)
        #[arg(long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Headless agent command used to execute agent turns
        #[arg(long, env = "CADRE_AGENT_CMD", default_value = "claude")]
        agent_cmd: String,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the configuration without executing anything
    Validate,

    /// List the tasks, agents, and tools the configuration defines
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadre_core=warn,cadre_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            task,
            prompt,
            inputs,
            agent_cmd,
            json,
        } => {
            commands::run::run(
                cli.config.as_deref(),
                cli.strict,
                &task,
                prompt.as_deref(),
                &inputs,
                &agent_cmd,
                json,
            )
            .await
        }
        Commands::Validate => commands::validate::run(cli.config.as_deref(), cli.strict),
        Commands::List => commands::list::run(cli.config.as_deref(), cli.strict),
    };

    if let Err(message) = result {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
}

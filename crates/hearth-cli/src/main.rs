//! hearth - terminal AI coding assistant.
//!
//! A thin binary: it resolves configuration (C1), builds the provider,
//! hook registry (C3), tool registry (C4), and runtime (C5/C6/C7), then
//! drives one interactive session. All the hard work lives in the
//! library crates; this binary is wiring.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod prompt;
mod theme;

use theme::print_banner;

/// hearth - terminal AI coding assistant.
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the workspace root (defaults to the current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, env = "HEARTH_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default if no subcommand given).
    Chat {
        /// Model to use, overriding configuration.
        #[arg(long)]
        model: Option<String>,
    },

    /// Show the resolved configuration.
    Config,

    /// Launch a built-in agent profile (C7) on a single task and exit.
    Agent {
        /// Agent profile name (`general-purpose`, `output-style-setup`, `statusline-setup`).
        profile: String,
        /// The task to give the agent.
        task: String,
        /// Model to use, overriding configuration.
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = hearth_telemetry::LogConfig::new(cli.log_level.clone());
    hearth_telemetry::setup_logging(&log_config)?;

    let workspace_root = cli
        .workspace
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command.unwrap_or(Commands::Chat { model: None }) {
        Commands::Chat { model } => {
            print_banner();
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                anyhow::anyhow!("ANTHROPIC_API_KEY is not set; export it before starting a chat session")
            })?;
            let model = model.unwrap_or_else(resolve_model_name);
            commands::chat::run(workspace_root, api_key, model).await
        },
        Commands::Config => commands::config::show(workspace_root),
        Commands::Agent { profile, task, model } => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                anyhow::anyhow!("ANTHROPIC_API_KEY is not set; export it before launching an agent")
            })?;
            let model = model.unwrap_or_else(resolve_model_name);
            commands::agent::run(workspace_root, api_key, model, profile, task).await
        },
    }
}

/// Resolve the model name from configuration, falling back to a sane
/// default when no `mainLoopModel` key is set.
fn resolve_model_name() -> String {
    std::env::var("HEARTH_MODEL").unwrap_or_else(|_| "claude-sonnet-4-5".to_string())
}

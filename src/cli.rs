//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crucible::output::OutputConfig;

use crate::commands;

/// Crucible - Manage versioned native application containers
#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a cauldron and write the .crucible.yaml configuration
    Init(commands::init::InitArgs),

    /// List or register native applications tracked in the cauldron
    Apps(commands::apps::AppsArgs),

    /// Manage mini-apps embedded in a container
    Miniapp(commands::miniapp::MiniAppArgs),

    /// Manage native dependencies embedded in a container
    Dependency(commands::dependency::DependencyArgs),

    /// Regenerate and republish the container for a descriptor
    Regen(commands::regen::RegenArgs),

    /// Generate a container locally, without touching the cauldron
    Container(commands::container::ContainerArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .init();

        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &output),
            Commands::Apps(args) => commands::apps::execute(args, &output),
            Commands::Miniapp(args) => commands::miniapp::execute(args, &output),
            Commands::Dependency(args) => commands::dependency::execute(args, &output),
            Commands::Regen(args) => commands::regen::execute(args, &output),
            Commands::Container(args) => commands::container::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

//! # Init Command Implementation
//!
//! This module implements the `init` subcommand, which sets up a cauldron
//! and writes the `.crucible.yaml` configuration file.
//!
//! ## Functionality
//!
//! - **Local Cauldron**: Creates a cauldron directory seeded with an empty
//!   document (the default).
//! - **Remote Cauldron**: Clones an existing cauldron repository, seeding
//!   and pushing the document if the repository is empty.
//! - **Interactive Mode**: Prompts for the cauldron location and remote via
//!   a CLI wizard (default when no flags are given).
//! - **Non-interactive Mode**: Skip prompts with --yes for automation.
//! - **Force Mode**: Overwrites an existing configuration file.

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Input};
use std::fs;
use std::path::{Path, PathBuf};

use crucible::cauldron::{git, FileStore};
use crucible::config::{CauldronConfig, Config};
use crucible::defaults::{self, DEFAULT_CONFIG_FILENAME};
use crucible::output::{emoji, OutputConfig};

/// Initialize a cauldron and write the .crucible.yaml configuration
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory for the cauldron (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR")]
    pub cauldron_path: Option<PathBuf>,

    /// Git remote holding the cauldron (cloned if given)
    #[arg(long, value_name = "URL")]
    pub repository: Option<String>,

    /// Non-interactive mode: accept defaults without prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Overwrite an existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the `init` command.
///
/// Writes `.crucible.yaml` in the current directory and makes sure the
/// configured cauldron holds a document, creating (and pushing, for remote
/// cauldrons) a fresh empty one when needed.
pub fn execute(args: InitArgs, output: &OutputConfig) -> Result<()> {
    let config_path = Path::new(DEFAULT_CONFIG_FILENAME);

    // Check if config file already exists
    if config_path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Configuration file '{}' already exists. Use --force to overwrite.",
            DEFAULT_CONFIG_FILENAME
        ));
    }

    println!(
        "{} Initializing crucible configuration...",
        emoji(output, "🎯", "[INIT]")
    );

    let (cauldron_path, repository) = if args.yes || args.cauldron_path.is_some() || args.repository.is_some()
    {
        (args.cauldron_path, args.repository)
    } else {
        prompt_for_settings()?
    };

    let config = Config {
        cauldron: CauldronConfig {
            path: cauldron_path,
            repository,
        },
        ..Config::default()
    };

    let root = config.cauldron_root();

    // Clone the remote cauldron when one is configured and not yet present
    if let Some(url) = &config.cauldron.repository {
        if !root.join(".git").exists() {
            println!(
                "{} Cloning cauldron from {}...",
                emoji(output, "📥", "[CLONE]"),
                url
            );
            git::clone(url, &root)?;
        }
    }

    // Seed an empty document unless the cauldron already holds one
    if root.join(defaults::CAULDRON_DOCUMENT_FILENAME).exists() {
        println!(
            "{} Cauldron already present at {}",
            emoji(output, "📦", "[OK]"),
            root.display()
        );
    } else {
        FileStore::create(&root)?;
        if let Some(url) = &config.cauldron.repository {
            git::commit_and_push(url, &root, "crucible: initialize cauldron")?;
        }
        println!(
            "{} Created empty cauldron at {}",
            emoji(output, "📦", "[OK]"),
            root.display()
        );
    }

    // Write the configuration file
    fs::write(config_path, config.to_yaml()?)?;
    println!(
        "{} Created {}",
        emoji(output, "✅", "[OK]"),
        DEFAULT_CONFIG_FILENAME
    );
    println!(
        "{} Run `crucible apps add <name:platform:version>` to register a native application",
        emoji(output, "💡", "[TIP]")
    );

    Ok(())
}

/// Interactive wizard for the cauldron location and remote.
fn prompt_for_settings() -> Result<(Option<PathBuf>, Option<String>)> {
    let theme = ColorfulTheme::default();

    let default_path = defaults::default_cauldron_root();
    let path: String = Input::with_theme(&theme)
        .with_prompt("Cauldron directory")
        .default(default_path.display().to_string())
        .interact_text()?;

    let repository: String = Input::with_theme(&theme)
        .with_prompt("Cauldron git remote (empty for a local-only cauldron)")
        .allow_empty(true)
        .interact_text()?;

    let path = if path == default_path.display().to_string() {
        None
    } else {
        Some(PathBuf::from(path))
    };
    let repository = if repository.trim().is_empty() {
        None
    } else {
        Some(repository.trim().to_string())
    };

    Ok((path, repository))
}

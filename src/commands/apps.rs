//! # Apps Command Implementation
//!
//! This module implements the `apps` subcommand, which lists the native
//! applications tracked in the cauldron and registers new application
//! versions.
//!
//! ## Functionality
//!
//! - **Listing** (default): Renders every application, platform, and
//!   version, with release markers and recorded container versions. A safe,
//!   read-only operation.
//!
//! - **Registration** (`apps add`): Adds a new native application version
//!   to the cauldron inside a transaction. No container is generated for a
//!   freshly registered version; that happens on the first mini-app or
//!   dependency update.

use anyhow::Result;
use clap::{Args, Subcommand};
use log::warn;
use std::path::PathBuf;

use crucible::cauldron::StateStore;
use crucible::config::Config;
use crucible::descriptor::NativeApplicationDescriptor;
use crucible::output::{emoji, OutputConfig};
use crucible::preconditions::{Check, Precondition};

use super::enforce_preconditions;

/// List or register native applications tracked in the cauldron
#[derive(Args, Debug)]
pub struct AppsArgs {
    #[command(subcommand)]
    pub command: Option<AppsCommand>,

    /// Path to the .crucible.yaml configuration file.
    #[arg(short, long, value_name = "FILE", env = "CRUCIBLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum AppsCommand {
    /// List all tracked applications (the default)
    List,

    /// Register a native application version
    Add {
        /// Complete descriptor of the version to register (name:platform:version)
        #[arg(value_name = "DESCRIPTOR")]
        descriptor: String,
    },
}

/// Execute the `apps` command.
pub fn execute(args: AppsArgs, output: &OutputConfig) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        None | Some(AppsCommand::List) => list(&config, output),
        Some(AppsCommand::Add { descriptor }) => add(&config, &descriptor, output),
    }
}

fn list(config: &Config, output: &OutputConfig) -> Result<()> {
    let store = config.open_store()?;

    if !store.is_active() {
        println!("No cauldron found. Run 'crucible init' to create one.");
        return Ok(());
    }

    let apps = store.native_apps()?;
    if apps.is_empty() {
        println!("The cauldron is empty. Register an application with 'crucible apps add'.");
        return Ok(());
    }

    for app in apps {
        println!("{} {}", emoji(output, "📱", "[APP]"), app.name);
        for platform in &app.platforms {
            println!("  {}", platform.name);
            for version in &platform.versions {
                let released = if version.is_released {
                    emoji(output, " 🚀", " (released)")
                } else {
                    ""
                };
                let container = match &version.container_version {
                    Some(v) => format!(" [container {}]", v),
                    None => String::new(),
                };
                println!("    {}{}{}", version.name, container, released);
            }
        }
    }

    Ok(())
}

fn add(config: &Config, raw_descriptor: &str, output: &OutputConfig) -> Result<()> {
    let mut store = config.open_store()?;
    let registry = config.registry_client();

    let checks = vec![
        Check::new(Precondition::CauldronActive),
        Check::new(Precondition::CompleteDescriptor {
            descriptor: raw_descriptor.to_string(),
        }),
    ];
    enforce_preconditions(&checks, &store, &registry, output);

    let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;

    store.begin_transaction()?;
    let result = store
        .add_app_version(&descriptor)
        .and_then(|_| store.commit_transaction());

    if let Err(error) = result {
        if let Err(discard_error) = store.discard_transaction() {
            warn!("failed to discard cauldron transaction: {}", discard_error);
        }
        return Err(error.into());
    }

    println!(
        "{} Registered {} in the cauldron",
        emoji(output, "✅", "[OK]"),
        descriptor
    );
    Ok(())
}

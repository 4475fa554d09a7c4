//! # Miniapp Command Implementation
//!
//! This module implements the `miniapp` subcommand, which adds and removes
//! mini-app references in a target container.
//!
//! ## Functionality
//!
//! - **Add**: References a published mini-app package in the container of a
//!   complete descriptor. An unpinned reference is resolved to the latest
//!   published version first.
//! - **Remove**: Drops a mini-app reference by package name.
//!
//! Both operations run the precondition checks, then perform a
//! transactional state update: mutate the manifest, regenerate and publish
//! the container, and move the container version pointer, atomically.

use anyhow::Result;
use clap::{Args, Subcommand};
use semver::Version;
use std::path::PathBuf;

use crucible::cauldron::StateStore;
use crucible::config::Config;
use crucible::descriptor::NativeApplicationDescriptor;
use crucible::output::{emoji, OutputConfig};
use crucible::package::PackageRef;
use crucible::preconditions::{Check, Precondition};
use crucible::update::{perform_container_update, UpdateOptions};

use super::{enforce_preconditions, parse_package, resolve_pinned};

/// Manage mini-apps embedded in a container
#[derive(Args, Debug)]
pub struct MiniAppArgs {
    #[command(subcommand)]
    pub command: MiniAppCommand,

    /// Path to the .crucible.yaml configuration file.
    #[arg(short, long, value_name = "FILE", env = "CRUCIBLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum MiniAppCommand {
    /// Add a mini-app to a container
    Add {
        /// Mini-app package (name or name@version)
        #[arg(value_name = "MINIAPP")]
        miniapp: String,

        /// Target container descriptor (name:platform:version)
        #[arg(short, long, value_name = "DESCRIPTOR")]
        descriptor: String,

        /// Explicit container version for the regenerated container
        #[arg(long, value_name = "VERSION")]
        container_version: Option<String>,
    },

    /// Remove a mini-app from a container
    Remove {
        /// Mini-app package name
        #[arg(value_name = "MINIAPP")]
        miniapp: String,

        /// Target container descriptor (name:platform:version)
        #[arg(short, long, value_name = "DESCRIPTOR")]
        descriptor: String,

        /// Explicit container version for the regenerated container
        #[arg(long, value_name = "VERSION")]
        container_version: Option<String>,
    },
}

/// Execute the `miniapp` command.
pub fn execute(args: MiniAppArgs, output: &OutputConfig) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        MiniAppCommand::Add {
            miniapp,
            descriptor,
            container_version,
        } => add(&config, &miniapp, &descriptor, container_version, output),
        MiniAppCommand::Remove {
            miniapp,
            descriptor,
            container_version,
        } => remove(&config, &miniapp, &descriptor, container_version, output),
    }
}

fn add(
    config: &Config,
    raw_miniapp: &str,
    raw_descriptor: &str,
    container_version: Option<String>,
    output: &OutputConfig,
) -> Result<()> {
    let mut store = config.open_store()?;
    let registry = config.registry_client();

    let mut checks = vec![
        Check::new(Precondition::CauldronActive),
        Check::new(Precondition::CompleteDescriptor {
            descriptor: raw_descriptor.to_string(),
        }),
        Check::new(Precondition::NotRawPath {
            packages: vec![raw_miniapp.to_string()],
        }),
    ];

    let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;
    let miniapp: PackageRef = parse_package(raw_miniapp, &checks, &store, &registry, output)?;

    checks.extend([
        Check::with_context(
            Precondition::DescriptorExists {
                descriptor: descriptor.clone(),
            },
            "register it first with 'crucible apps add'",
        ),
        Check::new(Precondition::PackagesPublished {
            packages: vec![miniapp.clone()],
        }),
        Check::new(Precondition::MiniAppNotInContainer {
            descriptor: descriptor.clone(),
            package: miniapp.clone(),
        }),
    ]);
    if let Some(version) = &container_version {
        checks.push(Check::new(Precondition::ValidContainerVersion {
            version: version.clone(),
        }));
        checks.push(Check::new(Precondition::NewerContainerVersion {
            descriptor: descriptor.clone(),
            version: version.clone(),
        }));
    }
    enforce_preconditions(&checks, &store, &registry, output);

    // Pin unversioned references to the latest published version
    let miniapp = resolve_pinned(&registry, miniapp)?;

    let options = UpdateOptions {
        container_version: container_version.as_deref().map(Version::parse).transpose()?,
        container_name: None,
    };

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |store| store.add_miniapp(&descriptor, &miniapp),
    )?;

    println!(
        "{} Added mini-app {} to {} (container {})",
        emoji(output, "✅", "[OK]"),
        miniapp,
        descriptor,
        version
    );
    Ok(())
}

fn remove(
    config: &Config,
    raw_miniapp: &str,
    raw_descriptor: &str,
    container_version: Option<String>,
    output: &OutputConfig,
) -> Result<()> {
    let mut store = config.open_store()?;
    let registry = config.registry_client();

    let mut checks = vec![
        Check::new(Precondition::CauldronActive),
        Check::new(Precondition::CompleteDescriptor {
            descriptor: raw_descriptor.to_string(),
        }),
    ];

    let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;
    let miniapp: PackageRef = raw_miniapp.parse()?;

    checks.extend([
        Check::new(Precondition::DescriptorExists {
            descriptor: descriptor.clone(),
        }),
        Check::new(Precondition::MiniAppInContainer {
            descriptor: descriptor.clone(),
            package: miniapp.clone(),
        }),
    ]);
    if let Some(version) = &container_version {
        checks.push(Check::new(Precondition::ValidContainerVersion {
            version: version.clone(),
        }));
        checks.push(Check::new(Precondition::NewerContainerVersion {
            descriptor: descriptor.clone(),
            version: version.clone(),
        }));
    }
    enforce_preconditions(&checks, &store, &registry, output);

    let options = UpdateOptions {
        container_version: container_version.as_deref().map(Version::parse).transpose()?,
        container_name: None,
    };

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |store| store.remove_miniapp(&descriptor, miniapp.name()),
    )?;

    println!(
        "{} Removed mini-app {} from {} (container {})",
        emoji(output, "✅", "[OK]"),
        miniapp.name(),
        descriptor,
        version
    );
    Ok(())
}

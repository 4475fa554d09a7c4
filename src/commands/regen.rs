//! # Regen Command Implementation
//!
//! This module implements the `regen` subcommand, which regenerates and
//! republishes the container for a descriptor without changing its
//! manifest: the transactional update runs with a no-op mutation, so the
//! only committed change is the new container version pointer.
//!
//! Useful after generator upgrades or publish failures that left the
//! recorded pointer behind the actually available artifacts.

use anyhow::Result;
use clap::Args;
use semver::Version;
use std::path::PathBuf;

use crucible::config::Config;
use crucible::defaults::DEFAULT_CONTAINER_NAME;
use crucible::descriptor::NativeApplicationDescriptor;
use crucible::output::{emoji, OutputConfig};
use crucible::preconditions::{Check, Precondition};
use crucible::update::{perform_container_update, UpdateOptions};

use super::enforce_preconditions;

/// Regenerate and republish the container for a descriptor
#[derive(Args, Debug)]
pub struct RegenArgs {
    /// Target container descriptor (name:platform:version)
    #[arg(short, long, value_name = "DESCRIPTOR")]
    pub descriptor: String,

    /// Explicit container version for the regenerated container
    #[arg(long, value_name = "VERSION")]
    pub container_version: Option<String>,

    /// Container name to generate
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CONTAINER_NAME)]
    pub name: String,

    /// Path to the .crucible.yaml configuration file.
    #[arg(short, long, value_name = "FILE", env = "CRUCIBLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the `regen` command.
pub fn execute(args: RegenArgs, output: &OutputConfig) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let mut store = config.open_store()?;
    let registry = config.registry_client();

    let mut checks = vec![
        Check::new(Precondition::CauldronActive),
        Check::new(Precondition::CompleteDescriptor {
            descriptor: args.descriptor.clone(),
        }),
    ];

    let descriptor: NativeApplicationDescriptor = args.descriptor.parse()?;

    checks.push(Check::new(Precondition::DescriptorExists {
        descriptor: descriptor.clone(),
    }));
    if let Some(version) = &args.container_version {
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
        container_version: args
            .container_version
            .as_deref()
            .map(Version::parse)
            .transpose()?,
        container_name: Some(args.name.clone()),
    };

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |_store| Ok(()),
    )?;

    println!(
        "{} Regenerated container {}@{} for {}",
        emoji(output, "✅", "[OK]"),
        args.name,
        version,
        descriptor
    );
    Ok(())
}

//! # Dependency Command Implementation
//!
//! This module implements the `dependency` subcommand, which manages the
//! native dependencies embedded in a target container.
//!
//! ## Functionality
//!
//! - **Add**: References a published native dependency in the container of
//!   a complete descriptor.
//! - **Update**: Repins an already-referenced dependency to a different
//!   published version.
//! - **Remove**: Drops a dependency reference by package name.
//!
//! All three operations run the precondition checks, then perform a
//! transactional state update: mutate the manifest, regenerate and publish
//! the container, and move the container version pointer, atomically.

use anyhow::Result;
use clap::{Args, Subcommand};
use semver::Version;
use std::path::PathBuf;

use crucible::cauldron::StateStore;
use crucible::config::Config;
use crucible::descriptor::NativeApplicationDescriptor;
use crucible::error::Error;
use crucible::output::{emoji, OutputConfig};
use crucible::package::PackageRef;
use crucible::preconditions::{Check, Precondition};
use crucible::update::{perform_container_update, UpdateOptions};

use super::{enforce_preconditions, parse_package, resolve_pinned};

/// Manage native dependencies embedded in a container
#[derive(Args, Debug)]
pub struct DependencyArgs {
    #[command(subcommand)]
    pub command: DependencyCommand,

    /// Path to the .crucible.yaml configuration file.
    #[arg(short, long, value_name = "FILE", env = "CRUCIBLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum DependencyCommand {
    /// Add a native dependency to a container
    Add {
        /// Dependency package (name or name@version)
        #[arg(value_name = "DEPENDENCY")]
        dependency: String,

        /// Target container descriptor (name:platform:version)
        #[arg(short, long, value_name = "DESCRIPTOR")]
        descriptor: String,

        /// Explicit container version for the regenerated container
        #[arg(long, value_name = "VERSION")]
        container_version: Option<String>,
    },

    /// Repin a native dependency to a different version
    Update {
        /// Dependency package with its new version (name@version)
        #[arg(value_name = "DEPENDENCY")]
        dependency: String,

        /// Target container descriptor (name:platform:version)
        #[arg(short, long, value_name = "DESCRIPTOR")]
        descriptor: String,

        /// Explicit container version for the regenerated container
        #[arg(long, value_name = "VERSION")]
        container_version: Option<String>,
    },

    /// Remove a native dependency from a container
    Remove {
        /// Dependency package name
        #[arg(value_name = "DEPENDENCY")]
        dependency: String,

        /// Target container descriptor (name:platform:version)
        #[arg(short, long, value_name = "DESCRIPTOR")]
        descriptor: String,

        /// Explicit container version for the regenerated container
        #[arg(long, value_name = "VERSION")]
        container_version: Option<String>,
    },
}

/// Execute the `dependency` command.
pub fn execute(args: DependencyArgs, output: &OutputConfig) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        DependencyCommand::Add {
            dependency,
            descriptor,
            container_version,
        } => add(&config, &dependency, &descriptor, container_version, output),
        DependencyCommand::Update {
            dependency,
            descriptor,
            container_version,
        } => update(&config, &dependency, &descriptor, container_version, output),
        DependencyCommand::Remove {
            dependency,
            descriptor,
            container_version,
        } => remove(&config, &dependency, &descriptor, container_version, output),
    }
}

fn version_checks(
    descriptor: &NativeApplicationDescriptor,
    container_version: Option<&String>,
) -> Vec<Check> {
    match container_version {
        Some(version) => vec![
            Check::new(Precondition::ValidContainerVersion {
                version: version.clone(),
            }),
            Check::new(Precondition::NewerContainerVersion {
                descriptor: descriptor.clone(),
                version: version.clone(),
            }),
        ],
        None => Vec::new(),
    }
}

fn update_options(container_version: Option<&String>) -> Result<UpdateOptions> {
    Ok(UpdateOptions {
        container_version: container_version
            .map(|v| Version::parse(v))
            .transpose()?,
        container_name: None,
    })
}

fn add(
    config: &Config,
    raw_dependency: &str,
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
            packages: vec![raw_dependency.to_string()],
        }),
    ];

    let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;
    let dependency: PackageRef = parse_package(raw_dependency, &checks, &store, &registry, output)?;

    checks.extend([
        Check::with_context(
            Precondition::DescriptorExists {
                descriptor: descriptor.clone(),
            },
            "register it first with 'crucible apps add'",
        ),
        Check::new(Precondition::PackagesPublished {
            packages: vec![dependency.clone()],
        }),
        Check::new(Precondition::DependencyNotInContainer {
            descriptor: descriptor.clone(),
            package: dependency.clone(),
        }),
    ]);
    checks.extend(version_checks(&descriptor, container_version.as_ref()));
    enforce_preconditions(&checks, &store, &registry, output);

    let dependency = resolve_pinned(&registry, dependency)?;
    let options = update_options(container_version.as_ref())?;

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |store| store.add_dependency(&descriptor, &dependency),
    )?;

    println!(
        "{} Added dependency {} to {} (container {})",
        emoji(output, "✅", "[OK]"),
        dependency,
        descriptor,
        version
    );
    Ok(())
}

fn update(
    config: &Config,
    raw_dependency: &str,
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
            packages: vec![raw_dependency.to_string()],
        }),
    ];

    let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;
    let dependency: PackageRef = parse_package(raw_dependency, &checks, &store, &registry, output)?;

    // Repinning without a target version is a usage error, caught before
    // any state-mutating step
    if dependency.version().is_none() {
        return Err(Error::Usage {
            message: format!(
                "'{}' has no version; 'dependency update' requires name@version",
                dependency
            ),
        }
        .into());
    }

    checks.extend([
        Check::new(Precondition::DescriptorExists {
            descriptor: descriptor.clone(),
        }),
        Check::new(Precondition::PackagesPublished {
            packages: vec![dependency.clone()],
        }),
        Check::with_context(
            Precondition::DependencyInContainer {
                descriptor: descriptor.clone(),
                // Unpinned: present at any version is fine, the repin is the point
                package: dependency.name().parse()?,
            },
            "use 'dependency add' for dependencies not yet in the container",
        ),
    ]);
    checks.extend(version_checks(&descriptor, container_version.as_ref()));
    enforce_preconditions(&checks, &store, &registry, output);

    let options = update_options(container_version.as_ref())?;

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |store| store.update_dependency(&descriptor, &dependency),
    )?;

    println!(
        "{} Updated dependency {} in {} (container {})",
        emoji(output, "✅", "[OK]"),
        dependency,
        descriptor,
        version
    );
    Ok(())
}

fn remove(
    config: &Config,
    raw_dependency: &str,
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
    let dependency: PackageRef = raw_dependency.parse()?;

    checks.extend([
        Check::new(Precondition::DescriptorExists {
            descriptor: descriptor.clone(),
        }),
        Check::new(Precondition::DependencyInContainer {
            descriptor: descriptor.clone(),
            package: dependency.clone(),
        }),
    ]);
    checks.extend(version_checks(&descriptor, container_version.as_ref()));
    enforce_preconditions(&checks, &store, &registry, output);

    let options = update_options(container_version.as_ref())?;

    let generator = config.generator(output);
    let version = perform_container_update(
        &mut store,
        &generator,
        &descriptor,
        &options,
        |store| store.remove_dependency(&descriptor, dependency.name()),
    )?;

    println!(
        "{} Removed dependency {} from {} (container {})",
        emoji(output, "✅", "[OK]"),
        dependency.name(),
        descriptor,
        version
    );
    Ok(())
}

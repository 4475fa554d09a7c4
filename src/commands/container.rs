//! # Container Command Implementation
//!
//! This module implements the `container` subcommand, which generates a
//! container locally without touching the cauldron. Two mutually exclusive
//! input modes exist:
//!
//! - **Descriptor mode** (`--descriptor`): the manifest comes from the
//!   cauldron; extra dependency flags are rejected since the recorded
//!   manifest is authoritative.
//! - **Mini-app mode** (`--miniapp`, repeatable): an explicit mini-app
//!   list, optionally with extra native dependencies. More than one
//!   mini-app requires an explicit container name.
//!
//! Inconsistent input combinations are usage errors raised before any
//! state-reading or -mutating step. Local generation never publishes.

use anyhow::Result;
use clap::Args;
use semver::Version;
use std::path::PathBuf;

use crucible::config::Config;
use crucible::container::{ContainerGenerator, GenerateOptions};
use crucible::defaults::{DEFAULT_CONTAINER_NAME, DEFAULT_CONTAINER_VERSION};
use crucible::descriptor::NativeApplicationDescriptor;
use crucible::error::Error;
use crucible::output::{emoji, OutputConfig};
use crucible::package::PackageRef;
use crucible::preconditions::{Check, Precondition};

use super::enforce_preconditions;

/// Generate a container locally, without touching the cauldron
#[derive(Args, Debug)]
pub struct ContainerArgs {
    /// Descriptor whose recorded manifest to generate (name:platform:version)
    #[arg(short, long, value_name = "DESCRIPTOR", conflicts_with = "miniapp")]
    pub descriptor: Option<String>,

    /// Mini-app to embed (repeatable; name or name@version)
    #[arg(short, long, value_name = "MINIAPP")]
    pub miniapp: Vec<String>,

    /// Extra native dependency to embed (repeatable; mini-app mode only)
    #[arg(long, value_name = "DEPENDENCY")]
    pub dependency: Vec<String>,

    /// Container name
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Container version
    #[arg(long, value_name = "VERSION", default_value = DEFAULT_CONTAINER_VERSION)]
    pub version: String,

    /// Path to the .crucible.yaml configuration file.
    #[arg(short, long, value_name = "FILE", env = "CRUCIBLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the `container` command.
pub fn execute(args: ContainerArgs, output: &OutputConfig) -> Result<()> {
    // Usage validation comes first, before anything touches the store
    if args.descriptor.is_none() && args.miniapp.is_empty() {
        return Err(Error::Usage {
            message: "either --descriptor or at least one --miniapp is required".to_string(),
        }
        .into());
    }
    if args.descriptor.is_some() && !args.dependency.is_empty() {
        return Err(Error::Usage {
            message: "--dependency cannot be combined with --descriptor; \
                      the cauldron manifest is authoritative"
                .to_string(),
        }
        .into());
    }
    if args.miniapp.len() > 1 && args.name.is_none() {
        return Err(Error::Usage {
            message: "--name is required when embedding more than one mini-app".to_string(),
        }
        .into());
    }

    let config = Config::load(args.config.as_deref())?;
    let version = Version::parse(&args.version)?;
    let name = args.name.as_deref().unwrap_or(DEFAULT_CONTAINER_NAME);
    let generator = config.generator(output);

    match &args.descriptor {
        Some(raw_descriptor) => {
            let store = config.open_store()?;
            let registry = config.registry_client();

            let mut checks = vec![
                Check::new(Precondition::CauldronActive),
                Check::new(Precondition::CompleteDescriptor {
                    descriptor: raw_descriptor.clone(),
                }),
            ];
            let descriptor: NativeApplicationDescriptor = raw_descriptor.parse()?;
            checks.push(Check::new(Precondition::DescriptorExists {
                descriptor: descriptor.clone(),
            }));
            enforce_preconditions(&checks, &store, &registry, output);

            let options = GenerateOptions {
                publish: false,
                container_name: Some(name.to_string()),
            };
            generator.generate(&descriptor, &version, &options)?;

            println!(
                "{} Generated container {}@{} from {}",
                emoji(output, "✅", "[OK]"),
                name,
                version,
                descriptor
            );
        }
        None => {
            let raw_packages: Vec<String> = args
                .miniapp
                .iter()
                .chain(args.dependency.iter())
                .cloned()
                .collect();

            // Raw paths are rejected in mini-app mode too: the generator
            // resolves every package against the registry
            let store = config.open_store()?;
            let registry = config.registry_client();
            let checks = vec![Check::new(Precondition::NotRawPath {
                packages: raw_packages,
            })];
            enforce_preconditions(&checks, &store, &registry, output);

            let miniapps = args
                .miniapp
                .iter()
                .map(|m| m.parse())
                .collect::<crucible::error::Result<Vec<PackageRef>>>()?;
            let dependencies = args
                .dependency
                .iter()
                .map(|d| d.parse())
                .collect::<crucible::error::Result<Vec<PackageRef>>>()?;

            generator.generate_local(&miniapps, &dependencies, &version, name)?;

            println!(
                "{} Generated container {}@{} with {} mini-app(s)",
                emoji(output, "✅", "[OK]"),
                name,
                version,
                miniapps.len()
            );
        }
    }

    Ok(())
}

//! # Precondition Checker
//!
//! A declarative guard layer run by every state-changing command before the
//! transactional update begins. A command builds an ordered list of
//! [`Check`]s; [`check_all`] evaluates them sequentially, reporting one
//! status line per condition, and stops at the first failure.
//!
//! Preconditions are modeled as a tagged-variant enum rather than a bag of
//! optional parameters: the dispatcher folds over the ordered list, which
//! preserves fixed-order short-circuit semantics (a later check never runs
//! once an earlier one has failed).
//!
//! A failed check produces an [`Error::Precondition`] naming the condition
//! and why it failed, optionally extended with a caller-supplied context
//! message. The command layer turns that error into a hard process stop
//! with exit code 1; the checker itself stays in-process so it can be
//! exercised directly in tests.

use semver::Version;

use crate::cauldron::StateStore;
use crate::descriptor::NativeApplicationDescriptor;
use crate::error::{Error, Result};
use crate::output::{emoji, OutputConfig};
use crate::package::PackageRef;
use crate::registry::PackageRegistry;
use crate::version::is_strictly_newer;

/// One named condition that must hold before a state-changing operation.
#[derive(Debug, Clone)]
pub enum Precondition {
    /// A cauldron is configured and holds a document.
    CauldronActive,
    /// The raw descriptor string parses and carries all three segments.
    CompleteDescriptor { descriptor: String },
    /// The descriptor resolves in the cauldron.
    DescriptorExists {
        descriptor: NativeApplicationDescriptor,
    },
    /// None of the given strings is a raw filesystem or VCS path.
    NotRawPath { packages: Vec<String> },
    /// The string is a syntactically valid semantic version.
    ValidContainerVersion { version: String },
    /// The version is strictly newer than the descriptor's recorded
    /// container version.
    NewerContainerVersion {
        descriptor: NativeApplicationDescriptor,
        version: String,
    },
    /// Every package is published to the registry (at the pinned version,
    /// when one is given).
    PackagesPublished { packages: Vec<PackageRef> },
    /// The mini-app is present in the descriptor's container.
    MiniAppInContainer {
        descriptor: NativeApplicationDescriptor,
        package: PackageRef,
    },
    /// The mini-app is not yet present in the descriptor's container.
    MiniAppNotInContainer {
        descriptor: NativeApplicationDescriptor,
        package: PackageRef,
    },
    /// The dependency is present in the descriptor's container.
    DependencyInContainer {
        descriptor: NativeApplicationDescriptor,
        package: PackageRef,
    },
    /// The dependency is not yet present in the descriptor's container.
    /// A same-name entry at a different pinned version is reported as a
    /// version mismatch.
    DependencyNotInContainer {
        descriptor: NativeApplicationDescriptor,
        package: PackageRef,
    },
}

impl Precondition {
    /// Stable identifier used in failure reports.
    pub fn name(&self) -> &'static str {
        match self {
            Precondition::CauldronActive => "cauldron-active",
            Precondition::CompleteDescriptor { .. } => "complete-descriptor",
            Precondition::DescriptorExists { .. } => "descriptor-exists",
            Precondition::NotRawPath { .. } => "not-raw-path",
            Precondition::ValidContainerVersion { .. } => "valid-container-version",
            Precondition::NewerContainerVersion { .. } => "newer-container-version",
            Precondition::PackagesPublished { .. } => "packages-published",
            Precondition::MiniAppInContainer { .. } => "miniapp-in-container",
            Precondition::MiniAppNotInContainer { .. } => "miniapp-not-in-container",
            Precondition::DependencyInContainer { .. } => "dependency-in-container",
            Precondition::DependencyNotInContainer { .. } => "dependency-not-in-container",
        }
    }

    /// Human-readable description shown while the check runs.
    fn describe(&self) -> String {
        match self {
            Precondition::CauldronActive => "cauldron is active".to_string(),
            Precondition::CompleteDescriptor { descriptor } => {
                format!("'{}' is a complete descriptor", descriptor)
            }
            Precondition::DescriptorExists { descriptor } => {
                format!("'{}' exists in the cauldron", descriptor)
            }
            Precondition::NotRawPath { packages } => {
                format!("no raw path in [{}]", packages.join(", "))
            }
            Precondition::ValidContainerVersion { version } => {
                format!("'{}' is a valid container version", version)
            }
            Precondition::NewerContainerVersion { descriptor, version } => {
                format!(
                    "'{}' is newer than the container version of '{}'",
                    version, descriptor
                )
            }
            Precondition::PackagesPublished { packages } => {
                let names: Vec<String> = packages.iter().map(|p| p.to_string()).collect();
                format!("[{}] published to the registry", names.join(", "))
            }
            Precondition::MiniAppInContainer { descriptor, package } => {
                format!("mini-app '{}' is in '{}'", package, descriptor)
            }
            Precondition::MiniAppNotInContainer { descriptor, package } => {
                format!("mini-app '{}' is not already in '{}'", package, descriptor)
            }
            Precondition::DependencyInContainer { descriptor, package } => {
                format!("dependency '{}' is in '{}'", package, descriptor)
            }
            Precondition::DependencyNotInContainer { descriptor, package } => {
                format!("dependency '{}' is not already in '{}'", package, descriptor)
            }
        }
    }

    fn evaluate<S: StateStore, R: PackageRegistry>(
        &self,
        store: &S,
        registry: &R,
    ) -> std::result::Result<(), String> {
        match self {
            Precondition::CauldronActive => {
                if store.is_active() {
                    Ok(())
                } else {
                    Err("no active cauldron (run 'crucible init' first)".to_string())
                }
            }
            Precondition::CompleteDescriptor { descriptor } => {
                let parsed: NativeApplicationDescriptor =
                    descriptor.parse().map_err(|e: Error| e.to_string())?;
                if parsed.is_complete() {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' is missing its platform or version segment",
                        descriptor
                    ))
                }
            }
            Precondition::DescriptorExists { descriptor } => {
                if store.descriptor_exists(descriptor).map_err(|e| e.to_string())? {
                    Ok(())
                } else {
                    Err(format!("'{}' is not in the cauldron", descriptor))
                }
            }
            Precondition::NotRawPath { packages } => {
                match packages.iter().find(|p| PackageRef::is_raw_path(p)) {
                    Some(path) => Err(format!(
                        "'{}' is a filesystem or VCS path, not a registry package",
                        path
                    )),
                    None => Ok(()),
                }
            }
            Precondition::ValidContainerVersion { version } => {
                match Version::parse(version) {
                    Ok(_) => Ok(()),
                    Err(e) => Err(format!("'{}' is not a valid semver version: {}", version, e)),
                }
            }
            Precondition::NewerContainerVersion { descriptor, version } => {
                let candidate = Version::parse(version)
                    .map_err(|e| format!("'{}' is not a valid semver version: {}", version, e))?;
                let current = store
                    .top_level_container_version(descriptor)
                    .map_err(|e| e.to_string())?;
                match current {
                    Some(current) if !is_strictly_newer(&candidate, &current) => Err(format!(
                        "'{}' is not newer than the current container version '{}'",
                        candidate, current
                    )),
                    _ => Ok(()),
                }
            }
            Precondition::PackagesPublished { packages } => {
                for package in packages {
                    if !registry.is_published(package).map_err(|e| e.to_string())? {
                        return Err(format!(
                            "'{}' is not published to the registry",
                            package
                        ));
                    }
                }
                Ok(())
            }
            Precondition::MiniAppInContainer { descriptor, package } => {
                let miniapps = store.miniapps(descriptor).map_err(|e| e.to_string())?;
                require_present(&miniapps, package, "mini-app", descriptor)
            }
            Precondition::MiniAppNotInContainer { descriptor, package } => {
                let miniapps = store.miniapps(descriptor).map_err(|e| e.to_string())?;
                require_absent(&miniapps, package, "mini-app", descriptor)
            }
            Precondition::DependencyInContainer { descriptor, package } => {
                let deps = store.dependencies(descriptor).map_err(|e| e.to_string())?;
                require_present(&deps, package, "dependency", descriptor)
            }
            Precondition::DependencyNotInContainer { descriptor, package } => {
                let deps = store.dependencies(descriptor).map_err(|e| e.to_string())?;
                require_absent(&deps, package, "dependency", descriptor)
            }
        }
    }
}

fn require_present(
    recorded: &[PackageRef],
    package: &PackageRef,
    kind: &str,
    descriptor: &NativeApplicationDescriptor,
) -> std::result::Result<(), String> {
    match recorded.iter().find(|r| r.name() == package.name()) {
        None => Err(format!(
            "{} '{}' is not in the '{}' container",
            kind,
            package.name(),
            descriptor
        )),
        Some(found) => match (package.version(), found.version()) {
            (Some(wanted), Some(recorded)) if wanted != recorded => Err(format!(
                "{} '{}' is in the '{}' container at version {}, not {}",
                kind,
                package.name(),
                descriptor,
                recorded,
                wanted
            )),
            _ => Ok(()),
        },
    }
}

fn require_absent(
    recorded: &[PackageRef],
    package: &PackageRef,
    kind: &str,
    descriptor: &NativeApplicationDescriptor,
) -> std::result::Result<(), String> {
    match recorded.iter().find(|r| r.name() == package.name()) {
        None => Ok(()),
        Some(found) => match (package.version(), found.version()) {
            (Some(wanted), Some(recorded)) if wanted != recorded => Err(format!(
                "{} '{}' is already in the '{}' container at version {} (version mismatch with {})",
                kind,
                package.name(),
                descriptor,
                recorded,
                wanted
            )),
            _ => Err(format!(
                "{} '{}' is already in the '{}' container",
                kind,
                package.name(),
                descriptor
            )),
        },
    }
}

/// A precondition plus optional caller-supplied context appended to the
/// generated failure message.
#[derive(Debug, Clone)]
pub struct Check {
    pub condition: Precondition,
    pub context: Option<String>,
}

impl Check {
    pub fn new(condition: Precondition) -> Self {
        Self {
            condition,
            context: None,
        }
    }

    pub fn with_context(condition: Precondition, context: impl Into<String>) -> Self {
        Self {
            condition,
            context: Some(context.into()),
        }
    }
}

impl From<Precondition> for Check {
    fn from(condition: Precondition) -> Self {
        Check::new(condition)
    }
}

/// Evaluate `checks` in order, stopping at the first failure.
///
/// Prints one status line per condition checked and an overall success
/// line when every condition passes.
pub fn check_all<S: StateStore, R: PackageRegistry>(
    checks: &[Check],
    store: &S,
    registry: &R,
    output: &OutputConfig,
) -> Result<()> {
    for check in checks {
        println!(
            "{} Checking that {}",
            emoji(output, "🔍", "[CHECK]"),
            check.condition.describe()
        );

        if let Err(message) = check.condition.evaluate(store, registry) {
            let message = match &check.context {
                Some(context) => format!("{} ({})", message, context),
                None => message,
            };
            return Err(Error::Precondition {
                condition: check.condition.name().to_string(),
                message,
            });
        }
    }

    println!(
        "{} All preconditions satisfied",
        emoji(output, "✅", "[OK]")
    );
    Ok(())
}

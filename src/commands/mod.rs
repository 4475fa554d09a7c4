//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `crucible` command-line tool. Each subcommand is defined in its own file
//! to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! The `execute` function is the main entry point for the command and is
//! responsible for orchestrating the necessary operations, calling into the
//! `crucible` library to perform the core logic.
//!
//! State-changing commands share the precondition enforcement in
//! [`enforce_preconditions`]: a violated precondition is reported and the
//! process terminates with exit code 1 before any cauldron mutation starts.

pub mod apps;
pub mod completions;
pub mod container;
pub mod dependency;
pub mod init;
pub mod miniapp;
pub mod regen;

use anyhow::Context;

use crucible::cauldron::StateStore;
use crucible::output::{emoji, OutputConfig};
use crucible::package::PackageRef;
use crucible::preconditions::{check_all, Check};
use crucible::registry::PackageRegistry;

/// Evaluate `checks` and hard-stop the process on the first violation.
///
/// Precondition failures are not recoverable errors for a caller to handle:
/// the failed condition is reported and the process exits with status 1.
pub(crate) fn enforce_preconditions<S: StateStore, R: PackageRegistry>(
    checks: &[Check],
    store: &S,
    registry: &R,
    output: &OutputConfig,
) {
    if let Err(error) = check_all(checks, store, registry, output) {
        eprintln!("{} {}", emoji(output, "❌", "[FAIL]"), error);
        std::process::exit(1);
    }
}

/// Parse a package reference argument.
///
/// A raw filesystem/VCS path is handed to the precondition checker with the
/// checks gathered so far (which end in `NotRawPath`), so the failure is
/// reported with the same precedence and formatting as every other
/// precondition. Other parse failures surface as usage errors directly.
pub(crate) fn parse_package<S: StateStore, R: PackageRegistry>(
    raw: &str,
    checks_so_far: &[Check],
    store: &S,
    registry: &R,
    output: &OutputConfig,
) -> anyhow::Result<PackageRef> {
    match raw.parse::<PackageRef>() {
        Ok(package) => Ok(package),
        Err(error) => {
            if PackageRef::is_raw_path(raw) {
                // Exits the process at the not-raw-path check
                enforce_preconditions(checks_so_far, store, registry, output);
            }
            Err(error.into())
        }
    }
}

/// Pin an unversioned package reference to its latest published version.
pub(crate) fn resolve_pinned<R: PackageRegistry>(
    registry: &R,
    package: PackageRef,
) -> anyhow::Result<PackageRef> {
    if package.version().is_some() {
        return Ok(package);
    }

    let versions = registry
        .published_versions(package.name())
        .with_context(|| format!("failed to resolve latest version of '{}'", package.name()))?;
    let latest = versions
        .last()
        .ok_or_else(|| anyhow::anyhow!("no published versions for '{}'", package.name()))?;
    Ok(package.with_version(latest.as_str()))
}

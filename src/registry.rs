//! # Package Registry Queries
//!
//! Mini-apps and native dependencies referenced by a container must be
//! published to the package registry; local checkouts cannot be resolved by
//! consumers of the cauldron. This module defines the registry contract and
//! an implementation that queries the npm registry through the system `npm`
//! binary (`npm view <package> versions --json`), which transparently picks
//! up the user's registry configuration and auth tokens from `.npmrc`.

use std::process::Command;

use crate::error::{Error, Result};
use crate::package::PackageRef;

/// Contract consumed from the package registry collaborator.
pub trait PackageRegistry {
    /// All published versions of `name`, empty if the package is unknown.
    fn published_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Whether `package` is published: any version for an unpinned
    /// reference, the exact version for a pinned one.
    fn is_published(&self, package: &PackageRef) -> Result<bool> {
        let versions = self.published_versions(package.name())?;
        match package.version() {
            Some(version) => Ok(versions.iter().any(|v| v == version)),
            None => Ok(!versions.is_empty()),
        }
    }
}

/// Registry client backed by the system `npm` command.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    command: String,
}

impl NpmRegistry {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Parse `npm view <pkg> versions --json` output.
    ///
    /// npm prints a JSON array for packages with multiple versions and a
    /// bare JSON string for packages with exactly one.
    fn parse_versions(stdout: &str) -> Option<Vec<String>> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Some(Vec::new());
        }
        if let Ok(versions) = serde_json::from_str::<Vec<String>>(trimmed) {
            return Some(versions);
        }
        serde_json::from_str::<String>(trimmed).ok().map(|v| vec![v])
    }
}

impl PackageRegistry for NpmRegistry {
    fn published_versions(&self, name: &str) -> Result<Vec<String>> {
        let output = Command::new(&self.command)
            .args(["view", name, "versions", "--json"])
            .output()
            .map_err(|e| Error::Registry {
                package: name.to_string(),
                message: format!("failed to run '{}': {}", self.command, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // An unknown package is not a query failure
            if stderr.contains("E404") || stderr.contains("404 Not Found") {
                return Ok(Vec::new());
            }
            return Err(Error::Registry {
                package: name.to_string(),
                message: stderr.to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_versions(&stdout).ok_or_else(|| Error::Registry {
            package: name.to_string(),
            message: format!("unexpected registry response: {}", stdout.trim()),
        })
    }
}

//! # Package References
//!
//! This module defines `PackageRef`, a reference to a mini-app or native
//! dependency package in the form `name[@version]`, e.g.
//! `react-native@0.59.0` or `@walmart/mini-chat@1.2.0`. Scoped registry
//! names are supported.
//!
//! It also provides detection of raw filesystem and VCS path forms
//! (`file:`, relative/absolute paths, `git+...`, `.git` suffixes). Cauldron
//! containers must only reference packages published to the registry, so
//! descriptor-mutating commands reject raw paths through the corresponding
//! precondition before any state change happens.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn name_regex() -> &'static Regex {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE.get_or_init(|| {
        Regex::new(r"^(@[a-z0-9][a-z0-9-._]*/)?[a-z0-9][a-z0-9-._]*$")
            .expect("package name pattern is valid")
    })
}

/// Reference to a registry package, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    name: String,
    version: Option<String>,
}

impl PackageRef {
    /// Create a reference pinned to a specific version.
    pub fn versioned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// The registry package name, including any scope.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pinned version, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Return a copy of this reference pinned to `version`.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            version: Some(version.into()),
        }
    }

    /// Whether a raw user-supplied string denotes a filesystem or VCS path
    /// rather than a registry package.
    ///
    /// Containers must only reference published packages; local checkouts
    /// and git URLs cannot be resolved by consumers of the cauldron.
    pub fn is_raw_path(input: &str) -> bool {
        input.starts_with("file:")
            || input.starts_with("git+")
            || input.starts_with("git:")
            || input.starts_with("ssh:")
            || input.starts_with('/')
            || input.starts_with("./")
            || input.starts_with("../")
            || input.starts_with("~/")
            || input.ends_with(".git")
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for PackageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Package {
                package: s.to_string(),
                message: "empty package reference".to_string(),
            });
        }

        if Self::is_raw_path(s) {
            return Err(Error::Package {
                package: s.to_string(),
                message: "filesystem and VCS paths are not registry packages".to_string(),
            });
        }

        // Split name from version. The separator is the first '@' after the
        // leading character so that scoped names (@scope/name) parse.
        let (name, version) = match s[1..].find('@') {
            Some(idx) => {
                let (name, rest) = s.split_at(idx + 1);
                (name, Some(rest[1..].to_string()))
            }
            None => (s, None),
        };

        if !name_regex().is_match(name) {
            return Err(Error::Package {
                package: s.to_string(),
                message: format!("'{}' is not a valid registry package name", name),
            });
        }

        if let Some(version) = &version {
            if version.is_empty() {
                return Err(Error::Package {
                    package: s.to_string(),
                    message: "empty version after '@'".to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

// Containers store package references in their `name@version` string form.
impl Serialize for PackageRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PackageRef {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let package: PackageRef = "react-native".parse().unwrap();
        assert_eq!(package.name(), "react-native");
        assert_eq!(package.version(), None);
    }

    #[test]
    fn test_parse_name_and_version() {
        let package: PackageRef = "react-native@0.59.0".parse().unwrap();
        assert_eq!(package.name(), "react-native");
        assert_eq!(package.version(), Some("0.59.0"));
    }

    #[test]
    fn test_parse_scoped_name() {
        let package: PackageRef = "@walmart/mini-chat@1.2.0".parse().unwrap();
        assert_eq!(package.name(), "@walmart/mini-chat");
        assert_eq!(package.version(), Some("1.2.0"));
    }

    #[test]
    fn test_parse_scoped_name_without_version() {
        let package: PackageRef = "@walmart/mini-chat".parse().unwrap();
        assert_eq!(package.name(), "@walmart/mini-chat");
        assert_eq!(package.version(), None);
    }

    #[test]
    fn test_parse_rejects_empty_version() {
        assert!("react-native@".parse::<PackageRef>().is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_name() {
        assert!("Not A Package".parse::<PackageRef>().is_err());
        assert!("UPPERCASE".parse::<PackageRef>().is_err());
    }

    #[test]
    fn test_parse_rejects_raw_paths() {
        for input in [
            "file:../mini-chat",
            "/home/dev/mini-chat",
            "./mini-chat",
            "../mini-chat",
            "~/mini-chat",
            "git+ssh://git@github.com/org/mini-chat.git",
            "git://github.com/org/mini-chat",
            "https://github.com/org/mini-chat.git",
        ] {
            assert!(PackageRef::is_raw_path(input), "expected raw path: {}", input);
            assert!(input.parse::<PackageRef>().is_err(), "expected parse error: {}", input);
        }
    }

    #[test]
    fn test_registry_names_are_not_raw_paths() {
        assert!(!PackageRef::is_raw_path("react-native@0.59.0"));
        assert!(!PackageRef::is_raw_path("@walmart/mini-chat"));
    }

    #[test]
    fn test_display_round_trip() {
        for input in ["react-native", "react-native@0.59.0", "@walmart/mini-chat@1.2.0"] {
            let package: PackageRef = input.parse().unwrap();
            assert_eq!(package.to_string(), input);
        }
    }

    #[test]
    fn test_with_version() {
        let package: PackageRef = "react-native".parse().unwrap();
        let pinned = package.with_version("0.60.0");
        assert_eq!(pinned.to_string(), "react-native@0.60.0");
        // Original is unchanged
        assert_eq!(package.version(), None);
    }
}

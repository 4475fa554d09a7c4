//! # Native Application Descriptors
//!
//! This module defines the `NativeApplicationDescriptor` value type, the
//! canonical identifier for one version of one native application tracked in
//! the cauldron. A descriptor is parsed from and serialized to the string
//! form `name:platform:version`, e.g. `MyApp:android:1.2.3`.
//!
//! ## Partial Descriptors
//!
//! The platform and version segments are optional at parse time: `MyApp` and
//! `MyApp:android` are valid *partial* descriptors used by commands that
//! operate at the application or platform level. Commands that mutate a
//! specific container require a *complete* descriptor, enforced through the
//! [`NativeApplicationDescriptor::is_complete`] predicate (and the
//! corresponding precondition).
//!
//! Descriptors are immutable values with equality by value, and round-trip
//! through their `Display`/`FromStr` implementations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mobile platform a native application targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    /// The canonical lowercase name used in descriptor strings and the
    /// cauldron document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(Error::Descriptor {
                descriptor: other.to_string(),
                message: format!("unknown platform '{}' (expected 'android' or 'ios')", other),
            }),
        }
    }
}

/// Identifier for a (application name, platform, version) triple.
///
/// The platform and version are optional so that partial descriptors can be
/// represented; see the module documentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeApplicationDescriptor {
    name: String,
    platform: Option<Platform>,
    version: Option<String>,
}

impl NativeApplicationDescriptor {
    /// Create a complete descriptor from its three components.
    pub fn new(
        name: impl Into<String>,
        platform: Platform,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            platform: Some(platform),
            version: Some(version.into()),
        }
    }

    /// The application name segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The platform segment, if present.
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// The application version segment, if present.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether all three segments are present.
    ///
    /// Container-mutating operations require a complete descriptor; partial
    /// descriptors only identify an application or an application/platform
    /// pair.
    pub fn is_complete(&self) -> bool {
        self.platform.is_some() && self.version.is_some()
    }
}

impl fmt::Display for NativeApplicationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(platform) = self.platform {
            write!(f, ":{}", platform)?;
        }
        if let Some(version) = &self.version {
            write!(f, ":{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for NativeApplicationDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split(':').collect();

        if segments.len() > 3 {
            return Err(Error::Descriptor {
                descriptor: s.to_string(),
                message: "too many segments (expected name:platform:version)".to_string(),
            });
        }

        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::Descriptor {
                descriptor: s.to_string(),
                message: "empty segment (expected name:platform:version)".to_string(),
            });
        }

        let name = segments[0];
        if name.contains(char::is_whitespace) {
            return Err(Error::Descriptor {
                descriptor: s.to_string(),
                message: "application name must not contain whitespace".to_string(),
            });
        }

        let platform = match segments.get(1) {
            Some(p) => Some(p.parse::<Platform>().map_err(|_| Error::Descriptor {
                descriptor: s.to_string(),
                message: format!("unknown platform '{}' (expected 'android' or 'ios')", p),
            })?),
            None => None,
        };

        let version = segments.get(2).map(|v| v.to_string());

        Ok(Self {
            name: name.to_string(),
            platform,
            version,
        })
    }
}

// The cauldron document and command arguments both carry descriptors in
// their canonical string form.
impl Serialize for NativeApplicationDescriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NativeApplicationDescriptor {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

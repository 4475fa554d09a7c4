//! # Cauldron State Store
//!
//! The cauldron is the system of record tracking native applications, their
//! platforms and versions, each version's container version, and the
//! mini-app and native dependency manifests embedded in each container.
//!
//! ## Design
//!
//! The module is built around a trait-based design that separates the
//! state-store contract consumed by the rest of the application from the
//! concrete storage implementation:
//!
//! - **`StateStore`**: the transaction primitives (`begin`, `commit`,
//!   `discard`), versioned reads and writes, and descriptor queries that
//!   the update orchestrator and the precondition checker consume.
//!
//! - **`FileStore`** (in [`store`]): the production implementation backed
//!   by a `cauldron.json` document on disk, optionally synchronized with a
//!   remote Git repository (see [`git`]).
//!
//! This design allows the underlying implementation to be swapped out,
//! which is particularly useful for testing: the orchestrator and checker
//! tests run against in-memory mock stores without touching the
//! filesystem.
//!
//! ## Transaction Model
//!
//! At most one transaction may be open per store handle. All reads and
//! writes performed between `begin` and `commit` operate on a staging copy
//! that is invisible to other readers until commit, and fully dropped on
//! discard. Mutations outside a transaction are rejected.

pub mod git;
pub mod store;

pub use store::FileStore;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::descriptor::{NativeApplicationDescriptor, Platform};
use crate::error::{Error, Result};
use crate::package::PackageRef;

/// Current schema version written into freshly initialized documents.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Root of the cauldron document.
///
/// Field names are camelCase on disk; the document is shared with non-Rust
/// tooling that reads the same JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauldronDocument {
    pub schema_version: String,
    pub native_apps: Vec<NativeApp>,
}

/// One tracked native application with its per-platform version lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeApp {
    pub name: String,
    pub platforms: Vec<PlatformEntry>,
}

/// One platform of a native application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEntry {
    pub name: Platform,
    pub versions: Vec<VersionEntry>,
}

/// One version of a native application on one platform: the unit a
/// complete descriptor addresses, and the owner of a container manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub name: String,
    pub is_released: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_version: Option<String>,
    #[serde(default)]
    pub mini_apps: Vec<PackageRef>,
    #[serde(default)]
    pub native_deps: Vec<PackageRef>,
}

impl VersionEntry {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_released: false,
            container_version: None,
            mini_apps: Vec::new(),
            native_deps: Vec::new(),
        }
    }
}

impl Default for CauldronDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            native_apps: Vec::new(),
        }
    }
}

fn incomplete_descriptor_error(descriptor: &NativeApplicationDescriptor) -> Error {
    Error::Cauldron {
        message: format!(
            "'{}' is not a complete descriptor (expected name:platform:version)",
            descriptor
        ),
    }
}

impl CauldronDocument {
    /// Whether `descriptor` resolves in this document.
    ///
    /// Partial descriptors resolve at their own depth: a bare name matches
    /// any tracked application with that name, `name:platform` additionally
    /// requires the platform entry.
    pub fn contains(&self, descriptor: &NativeApplicationDescriptor) -> bool {
        let Some(app) = self
            .native_apps
            .iter()
            .find(|app| app.name == descriptor.name())
        else {
            return false;
        };

        let Some(platform) = descriptor.platform() else {
            return true;
        };
        let Some(entry) = app.platforms.iter().find(|p| p.name == platform) else {
            return false;
        };

        match descriptor.version() {
            Some(version) => entry.versions.iter().any(|v| v.name == version),
            None => true,
        }
    }

    /// Resolve the version entry addressed by a complete descriptor.
    pub fn version_entry(&self, descriptor: &NativeApplicationDescriptor) -> Result<&VersionEntry> {
        let (Some(platform), Some(version)) = (descriptor.platform(), descriptor.version()) else {
            return Err(incomplete_descriptor_error(descriptor));
        };

        self.native_apps
            .iter()
            .find(|app| app.name == descriptor.name())
            .and_then(|app| app.platforms.iter().find(|p| p.name == platform))
            .and_then(|p| p.versions.iter().find(|v| v.name == version))
            .ok_or_else(|| Error::DescriptorNotFound {
                descriptor: descriptor.to_string(),
            })
    }

    /// Mutable access to the version entry addressed by a complete
    /// descriptor.
    pub fn version_entry_mut(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
    ) -> Result<&mut VersionEntry> {
        let (Some(platform), Some(version)) = (descriptor.platform(), descriptor.version()) else {
            return Err(incomplete_descriptor_error(descriptor));
        };

        self.native_apps
            .iter_mut()
            .find(|app| app.name == descriptor.name())
            .and_then(|app| app.platforms.iter_mut().find(|p| p.name == platform))
            .and_then(|p| p.versions.iter_mut().find(|v| v.name == version))
            .ok_or_else(|| Error::DescriptorNotFound {
                descriptor: descriptor.to_string(),
            })
    }

    /// Register a new native application version, creating the application
    /// and platform entries as needed.
    pub fn add_version(&mut self, descriptor: &NativeApplicationDescriptor) -> Result<()> {
        let (Some(platform), Some(version)) = (descriptor.platform(), descriptor.version()) else {
            return Err(incomplete_descriptor_error(descriptor));
        };

        if self.contains(descriptor) {
            return Err(Error::Cauldron {
                message: format!("'{}' is already in the cauldron", descriptor),
            });
        }

        let app = match self
            .native_apps
            .iter_mut()
            .find(|app| app.name == descriptor.name())
        {
            Some(app) => app,
            None => {
                self.native_apps.push(NativeApp {
                    name: descriptor.name().to_string(),
                    platforms: Vec::new(),
                });
                self.native_apps.last_mut().expect("app was just pushed")
            }
        };

        let entry = match app.platforms.iter_mut().find(|p| p.name == platform) {
            Some(entry) => entry,
            None => {
                app.platforms.push(PlatformEntry {
                    name: platform,
                    versions: Vec::new(),
                });
                app.platforms.last_mut().expect("platform was just pushed")
            }
        };

        entry.versions.push(VersionEntry::new(version));
        Ok(())
    }
}

/// Contract consumed from the cauldron state store.
///
/// `FileStore` is the production implementation; tests substitute
/// in-memory mocks.
pub trait StateStore {
    /// Whether the store is reachable and holds a cauldron document.
    fn is_active(&self) -> bool;

    /// Open a transaction. Fails if one is already open or the store is
    /// unreachable.
    fn begin_transaction(&mut self) -> Result<()>;

    /// Commit the open transaction, making all changes performed since
    /// `begin_transaction` atomically visible to other readers.
    fn commit_transaction(&mut self) -> Result<()>;

    /// Drop the open transaction, if any.
    ///
    /// Best-effort cleanup: callers treat a failure as a warning, never as
    /// an error to propagate.
    fn discard_transaction(&mut self) -> Result<()>;

    /// All tracked native applications.
    fn native_apps(&self) -> Result<Vec<NativeApp>>;

    /// Whether a (possibly partial) descriptor resolves in the store.
    fn descriptor_exists(&self, descriptor: &NativeApplicationDescriptor) -> Result<bool>;

    /// The recorded top-level container version for a descriptor, if any.
    fn top_level_container_version(
        &self,
        descriptor: &NativeApplicationDescriptor,
    ) -> Result<Option<Version>>;

    /// Record `version` as the descriptor's top-level container version.
    fn update_container_version(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        version: &Version,
    ) -> Result<()>;

    /// Register a new native application version.
    fn add_app_version(&mut self, descriptor: &NativeApplicationDescriptor) -> Result<()>;

    /// Mini-apps embedded in the descriptor's container.
    fn miniapps(&self, descriptor: &NativeApplicationDescriptor) -> Result<Vec<PackageRef>>;

    /// Native dependencies embedded in the descriptor's container.
    fn dependencies(&self, descriptor: &NativeApplicationDescriptor) -> Result<Vec<PackageRef>>;

    /// Add a mini-app reference to the descriptor's container.
    fn add_miniapp(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()>;

    /// Remove a mini-app reference by package name.
    fn remove_miniapp(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        name: &str,
    ) -> Result<()>;

    /// Add a native dependency to the descriptor's container.
    fn add_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()>;

    /// Remove a native dependency by package name.
    fn remove_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        name: &str,
    ) -> Result<()>;

    /// Replace the pinned version of a native dependency already in the
    /// descriptor's container.
    fn update_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(s: &str) -> NativeApplicationDescriptor {
        s.parse().unwrap()
    }

    fn document_with_app() -> CauldronDocument {
        let mut doc = CauldronDocument::default();
        doc.add_version(&descriptor("MyApp:android:1.0.0")).unwrap();
        doc
    }

    #[test]
    fn test_add_version_creates_app_platform_version() {
        let doc = document_with_app();
        assert_eq!(doc.native_apps.len(), 1);
        assert_eq!(doc.native_apps[0].name, "MyApp");
        assert_eq!(doc.native_apps[0].platforms.len(), 1);
        assert_eq!(doc.native_apps[0].platforms[0].versions[0].name, "1.0.0");
    }

    #[test]
    fn test_add_version_rejects_duplicate() {
        let mut doc = document_with_app();
        let result = doc.add_version(&descriptor("MyApp:android:1.0.0"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already in the cauldron"));
    }

    #[test]
    fn test_add_version_requires_complete_descriptor() {
        let mut doc = CauldronDocument::default();
        assert!(doc.add_version(&descriptor("MyApp:android")).is_err());
    }

    #[test]
    fn test_add_second_platform_reuses_app() {
        let mut doc = document_with_app();
        doc.add_version(&descriptor("MyApp:ios:1.0.0")).unwrap();
        assert_eq!(doc.native_apps.len(), 1);
        assert_eq!(doc.native_apps[0].platforms.len(), 2);
    }

    #[test]
    fn test_contains_partial_descriptors() {
        let doc = document_with_app();
        assert!(doc.contains(&descriptor("MyApp")));
        assert!(doc.contains(&descriptor("MyApp:android")));
        assert!(doc.contains(&descriptor("MyApp:android:1.0.0")));
        assert!(!doc.contains(&descriptor("MyApp:ios")));
        assert!(!doc.contains(&descriptor("MyApp:android:2.0.0")));
        assert!(!doc.contains(&descriptor("OtherApp")));
    }

    #[test]
    fn test_version_entry_not_found() {
        let doc = document_with_app();
        let result = doc.version_entry(&descriptor("MyApp:ios:1.0.0"));
        assert!(matches!(result, Err(Error::DescriptorNotFound { .. })));
    }

    #[test]
    fn test_document_json_shape() {
        let mut doc = document_with_app();
        {
            let entry = doc
                .version_entry_mut(&descriptor("MyApp:android:1.0.0"))
                .unwrap();
            entry.container_version = Some("2.1.0".to_string());
            entry.mini_apps.push("mini-chat@1.2.0".parse().unwrap());
        }

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["schemaVersion"], "1.0.0");
        assert_eq!(json["nativeApps"][0]["name"], "MyApp");
        assert_eq!(json["nativeApps"][0]["platforms"][0]["name"], "android");
        let version = &json["nativeApps"][0]["platforms"][0]["versions"][0];
        assert_eq!(version["isReleased"], false);
        assert_eq!(version["containerVersion"], "2.1.0");
        assert_eq!(version["miniApps"][0], "mini-chat@1.2.0");
    }

    #[test]
    fn test_document_round_trip() {
        let doc = document_with_app();
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: CauldronDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}

//! Default values for crucible configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the crucible configuration file, looked up in the current
/// directory by every command.
pub const DEFAULT_CONFIG_FILENAME: &str = ".crucible.yaml";

/// File name of the cauldron document inside a cauldron directory.
pub const CAULDRON_DOCUMENT_FILENAME: &str = "cauldron.json";

/// Container name used for generated containers when the caller does not
/// supply one.
pub const DEFAULT_CONTAINER_NAME: &str = "runner";

/// Container version selected for a native application version that has no
/// previously recorded container version.
pub const DEFAULT_CONTAINER_VERSION: &str = "1.0.0";

/// Returns the default cauldron root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/crucible` (XDG Base Directory)
/// - macOS: `~/Library/Caches/crucible`
/// - Windows: `{FOLDERID_LocalAppData}\crucible`
///
/// Falls back to `.crucible-cauldron` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `cauldron.path` configuration key or the
/// `CRUCIBLE_CAULDRON` environment variable.
pub fn default_cauldron_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".crucible-cauldron"))
        .join("crucible")
        .join("cauldron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cauldron_root_returns_path() {
        let root = default_cauldron_root();
        // Should end with "cauldron"
        assert!(root.ends_with("cauldron"));
    }

    #[test]
    fn test_default_cauldron_root_is_absolute_or_fallback() {
        let root = default_cauldron_root();
        // Either absolute (normal case) or relative fallback
        assert!(
            root.is_absolute() || root.starts_with(".crucible-cauldron"),
            "Expected absolute path or fallback, got: {:?}",
            root
        );
    }

    #[test]
    fn test_default_container_version_is_valid_semver() {
        assert!(semver::Version::parse(DEFAULT_CONTAINER_VERSION).is_ok());
    }
}

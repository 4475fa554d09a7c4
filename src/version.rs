//! # Container Version Selection
//!
//! Helpers for choosing and comparing container versions. A container
//! version is a semantic version attached to a complete native application
//! descriptor, tracking the generated native bundle independently from the
//! application's own version.
//!
//! ## Selection Rules
//!
//! When a state update is performed without an explicit container version:
//!
//! 1. If the descriptor has no previously recorded container version, the
//!    default `1.0.0` is selected.
//! 2. Otherwise the current version's patch component is incremented per
//!    standard semantic-versioning rules (`1.2.3` becomes `1.2.4`).
//!
//! An explicitly supplied version is always used verbatim; callers that
//! want monotonicity enforce it through the newer-version precondition.

use semver::{BuildMetadata, Prerelease, Version};

use crate::defaults::DEFAULT_CONTAINER_VERSION;

/// Increment the patch component of a version.
///
/// Pre-release and build metadata are dropped: the successor of
/// `1.2.3-beta.1` is `1.2.4`.
pub fn bump_patch(version: &Version) -> Version {
    Version {
        major: version.major,
        minor: version.minor,
        patch: version.patch + 1,
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    }
}

/// Whether `candidate` is strictly greater than `current` under semver
/// precedence rules.
pub fn is_strictly_newer(candidate: &Version, current: &Version) -> bool {
    candidate > current
}

/// Select the container version for an update.
///
/// `explicit` is a caller-supplied override used verbatim when present;
/// `current` is the version currently recorded in the state store for the
/// target descriptor, if any.
pub fn select_container_version(
    explicit: Option<&Version>,
    current: Option<&Version>,
) -> Version {
    if let Some(version) = explicit {
        return version.clone();
    }

    match current {
        Some(current) => bump_patch(current),
        None => Version::parse(DEFAULT_CONTAINER_VERSION)
            .expect("default container version is valid semver"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_bump_patch() {
        assert_eq!(bump_patch(&v("1.2.3")), v("1.2.4"));
        assert_eq!(bump_patch(&v("0.0.0")), v("0.0.1"));
    }

    #[test]
    fn test_bump_patch_drops_prerelease_and_build() {
        assert_eq!(bump_patch(&v("1.2.3-beta.1")), v("1.2.4"));
        assert_eq!(bump_patch(&v("1.2.3+build.5")), v("1.2.4"));
    }

    #[test]
    fn test_is_strictly_newer() {
        assert!(is_strictly_newer(&v("1.2.4"), &v("1.2.3")));
        assert!(is_strictly_newer(&v("2.0.0"), &v("1.9.9")));
        assert!(!is_strictly_newer(&v("1.2.3"), &v("1.2.3")));
        assert!(!is_strictly_newer(&v("1.2.2"), &v("1.2.3")));
    }

    #[test]
    fn test_prerelease_is_older_than_release() {
        assert!(!is_strictly_newer(&v("1.2.3-rc.1"), &v("1.2.3")));
    }

    #[test]
    fn test_select_defaults_to_1_0_0_without_prior_version() {
        assert_eq!(select_container_version(None, None), v("1.0.0"));
    }

    #[test]
    fn test_select_bumps_patch_of_prior_version() {
        assert_eq!(select_container_version(None, Some(&v("1.2.3"))), v("1.2.4"));
        assert_eq!(select_container_version(None, Some(&v("2.1.0"))), v("2.1.1"));
    }

    #[test]
    fn test_select_uses_explicit_version_verbatim() {
        // Explicit versions win even when older than the recorded one; the
        // newer-version precondition guards monotonicity separately.
        assert_eq!(
            select_container_version(Some(&v("0.5.0")), Some(&v("2.1.0"))),
            v("0.5.0")
        );
    }
}

//! Property-based tests for descriptor and package reference parsing.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::descriptor::NativeApplicationDescriptor;
    use crate::package::PackageRef;
    use proptest::prelude::*;

    // ============================================================================
    // NativeApplicationDescriptor property tests
    // ============================================================================

    proptest! {
        /// Property: a parsed descriptor always serializes back to its input
        #[test]
        fn descriptor_display_round_trips(
            name in "[A-Za-z][A-Za-z0-9_-]{0,20}",
            platform in prop::sample::select(vec!["android", "ios"]),
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let input = format!("{}:{}:{}", name, platform, version);
            let descriptor: NativeApplicationDescriptor = input.parse().unwrap();
            prop_assert!(descriptor.is_complete());
            prop_assert_eq!(descriptor.to_string(), input);
        }

        /// Property: parsing never panics, whatever the input
        #[test]
        fn descriptor_parse_never_panics(input in ".*") {
            let _ = input.parse::<NativeApplicationDescriptor>();
        }

        /// Property: descriptors with more than three segments never parse
        #[test]
        fn descriptor_rejects_extra_segments(
            name in "[A-Za-z]{1,10}",
            extra in "[a-z]{1,10}",
        ) {
            let input = format!("{}:android:1.0.0:{}", name, extra);
            prop_assert!(input.parse::<NativeApplicationDescriptor>().is_err());
        }

        /// Property: partial descriptors are never complete
        #[test]
        fn descriptor_name_only_is_incomplete(name in "[A-Za-z][A-Za-z0-9_-]{0,20}") {
            let descriptor: NativeApplicationDescriptor = name.parse().unwrap();
            prop_assert!(!descriptor.is_complete());
            prop_assert_eq!(descriptor.version(), None);
        }
    }

    // ============================================================================
    // PackageRef property tests
    // ============================================================================

    proptest! {
        /// Property: a parsed package reference round-trips through Display
        #[test]
        fn package_display_round_trips(
            name in "[a-z][a-z0-9-]{0,20}",
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        ) {
            let input = format!("{}@{}", name, version);
            let package: PackageRef = input.parse().unwrap();
            prop_assert_eq!(package.name(), name.as_str());
            prop_assert_eq!(package.to_string(), input);
        }

        /// Property: parsing never panics, whatever the input
        #[test]
        fn package_parse_never_panics(input in ".*") {
            let _ = input.parse::<PackageRef>();
        }

        /// Property: path-like inputs are classified as raw paths and rejected
        #[test]
        fn package_rejects_path_prefixes(
            prefix in prop::sample::select(vec!["file:", "./", "../", "/", "git+"]),
            rest in "[a-z][a-z0-9/-]{0,20}",
        ) {
            let input = format!("{}{}", prefix, rest);
            prop_assert!(PackageRef::is_raw_path(&input));
            prop_assert!(input.parse::<PackageRef>().is_err());
        }
    }
}

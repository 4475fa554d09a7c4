//! End-to-end tests for the `dependency` command
//!
//! These run against a local cauldron with stubbed generator and registry
//! commands.

mod common;
use common::prelude::*;

fn add_dependency(fixture: &TestFixture, dependency: &str) {
    fixture
        .cmd()
        .arg("dependency")
        .arg("add")
        .arg(dependency)
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .success();
}

/// Adding a dependency commits the manifest entry.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_add() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("add")
        .arg("react-native@1.0.0")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added dependency react-native@1.0.0"));

    assert!(fixture.cauldron_document().contains("react-native@1.0.0"));
}

/// Re-adding a dependency at another version reports a version mismatch.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_add_version_mismatch() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");
    add_dependency(&fixture, "react-native@1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("add")
        .arg("react-native@1.2.0")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("version mismatch"));
}

/// Updating repins the dependency to the new version.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_update() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");
    add_dependency(&fixture, "react-native@1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("update")
        .arg("react-native@1.2.0")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated dependency react-native@1.2.0"));

    let document = fixture.cauldron_document();
    assert!(document.contains("react-native@1.2.0"));
    assert!(!document.contains("react-native@1.0.0"));
}

/// Updating without a pinned version is a usage error.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_update_requires_version() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");
    add_dependency(&fixture, "react-native@1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("update")
        .arg("react-native")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid usage"));
}

/// Removing drops the dependency from the manifest.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_remove() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");
    add_dependency(&fixture, "react-native@1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("remove")
        .arg("react-native")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .success();

    assert!(!fixture.cauldron_document().contains("react-native"));
}

/// Removing a dependency that is not in the container fails.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_remove_missing_fails_precondition() {
    let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");

    fixture
        .cmd()
        .arg("dependency")
        .arg("remove")
        .arg("react-native")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("dependency-in-container"));
}

/// A target descriptor that is not in the cauldron fails with a hint.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_dependency_add_unknown_descriptor_fails() {
    let fixture = TestFixture::new();

    fixture
        .cmd()
        .arg("dependency")
        .arg("add")
        .arg("react-native@1.0.0")
        .arg("--descriptor")
        .arg("MyApp:android:1.0.0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("descriptor-exists"))
        .stderr(predicate::str::contains("crucible apps add"));
}

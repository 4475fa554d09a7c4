//! Shared test utilities for E2E tests.
//!
//! This module provides a common fixture and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_app("MyApp:android:1.0.0");
//!     fixture.cmd().arg("apps").assert().success();
//! }
//! ```

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::PathBuf;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// A temp directory with a crucible configuration, a local cauldron, and
/// stub collaborator commands.
///
/// The generator defaults to `/bin/true` (always succeeds, publishes
/// nothing) and the registry to a stub that reports versions 1.0.0 and
/// 1.2.0 for every package. Both can be replaced per test.
pub struct TestFixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// A fixture with an initialized, empty cauldron.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let fixture = Self { temp };

        fixture
            .cmd()
            .arg("init")
            .arg("--yes")
            .arg("--cauldron-path")
            .arg(fixture.cauldron_dir())
            .assert()
            .success();

        // Replace the generated configuration with one pointing at the stub
        // collaborators, so no test ever reaches a real generator or npm
        let registry_stub = fixture.write_stub(
            "registry-stub",
            "#!/bin/sh\necho '[\"1.0.0\", \"1.2.0\"]'\n",
        );
        fixture.write_config("true", registry_stub.to_str().unwrap());

        fixture
    }

    /// A fixture without any cauldron or configuration.
    pub fn empty() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    /// Register a native application version in the cauldron.
    pub fn with_app(self, descriptor: &str) -> Self {
        self.cmd()
            .arg("apps")
            .arg("add")
            .arg(descriptor)
            .assert()
            .success();
        self
    }

    /// Directory holding the cauldron document.
    pub fn cauldron_dir(&self) -> PathBuf {
        self.temp.path().join("cauldron")
    }

    /// Current content of the cauldron document.
    pub fn cauldron_document(&self) -> String {
        std::fs::read_to_string(self.cauldron_dir().join("cauldron.json")).unwrap()
    }

    /// Write `.crucible.yaml` pointing at the fixture cauldron, with the
    /// given generator and registry commands.
    pub fn write_config(&self, generator_command: &str, registry_command: &str) {
        let config = format!(
            "cauldron:\n  path: {}\ngenerator:\n  command: {}\nregistry:\n  command: {}\n",
            self.cauldron_dir().display(),
            generator_command,
            registry_command,
        );
        self.temp.child(".crucible.yaml").write_str(&config).unwrap();
    }

    /// Replace the generator command, keeping the stub registry.
    pub fn set_generator(&self, generator_command: &str) {
        let registry_stub = self.temp.path().join("registry-stub");
        self.write_config(generator_command, registry_stub.to_str().unwrap());
    }

    /// Write an executable stub script into the fixture directory.
    pub fn write_stub(&self, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.temp.path().join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A `crucible` command running inside the fixture directory.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("crucible");
        cmd.current_dir(self.temp.path());
        cmd
    }
}

//! # Container Generation
//!
//! This module defines the contract for the container generator collaborator
//! and its production implementation. Given a complete native application
//! descriptor and a container version, the generator produces (and
//! optionally publishes) a new container artifact embedding the mini-apps
//! and native dependencies recorded in the cauldron.
//!
//! The binary-generation pipeline itself is an external system: crucible
//! only sequences it. `CommandGenerator` shells out to a configured
//! generator command, passing the generation context through both argument
//! placeholders and `CRUCIBLE_*` environment variables. This is the
//! longest-running, most failure-prone step of a state update (network I/O,
//! native build tooling), so a spinner is shown while the child runs.

use std::process::Command;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use semver::Version;

use crate::defaults::DEFAULT_CONTAINER_NAME;
use crate::descriptor::NativeApplicationDescriptor;
use crate::error::{Error, Result};
use crate::output::OutputConfig;
use crate::package::PackageRef;

/// Options for one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Publish the generated artifact to its distribution channel.
    pub publish: bool,
    /// Container name; defaults to [`DEFAULT_CONTAINER_NAME`].
    pub container_name: Option<String>,
}

impl GenerateOptions {
    /// The effective container name for this run.
    pub fn container_name(&self) -> &str {
        self.container_name.as_deref().unwrap_or(DEFAULT_CONTAINER_NAME)
    }
}

/// Reference to a generated container artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub container_name: String,
    pub version: Version,
}

/// Contract consumed from the container generator collaborator.
pub trait ContainerGenerator {
    /// Generate a container for `descriptor` at `version`.
    ///
    /// Succeeds with a reference to the produced artifact, or fails with a
    /// build or publish error.
    fn generate(
        &self,
        descriptor: &NativeApplicationDescriptor,
        version: &Version,
        options: &GenerateOptions,
    ) -> Result<ArtifactRef>;
}

/// Production generator that invokes an external generator command.
///
/// The configured argument list may contain `{descriptor}`, `{version}` and
/// `{name}` placeholders; the same context is also exported as
/// `CRUCIBLE_DESCRIPTOR`, `CRUCIBLE_CONTAINER_VERSION`,
/// `CRUCIBLE_CONTAINER_NAME` and `CRUCIBLE_PUBLISH` environment variables
/// so wrapper scripts need no argument parsing.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
    output: OutputConfig,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>, output: OutputConfig) -> Self {
        Self {
            command: command.into(),
            args,
            output,
        }
    }

    fn substitute(
        template: &str,
        descriptor: &NativeApplicationDescriptor,
        version: &Version,
        name: &str,
    ) -> String {
        template
            .replace("{descriptor}", &descriptor.to_string())
            .replace("{version}", &version.to_string())
            .replace("{name}", name)
    }

    /// Run the generator command with the given arguments and environment,
    /// showing a spinner while the child runs.
    fn run(&self, args: Vec<String>, envs: Vec<(&'static str, String)>, message: String) -> Result<()> {
        let spinner = if self.output.use_color {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner());
            spinner.set_message(message);
            spinner.enable_steady_tick(Duration::from_millis(100));
            Some(spinner)
        } else {
            None
        };

        let result = Command::new(&self.command).args(args).envs(envs).output();

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let output = result.map_err(|e| Error::Generator {
            command: self.command.clone(),
            status: "failed to start".to_string(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(Error::Generator {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }

    /// Generate a container locally from an explicit mini-app list, without
    /// a cauldron descriptor. Never publishes.
    ///
    /// The mini-app and extra dependency lists are exported as
    /// comma-separated `CRUCIBLE_MINIAPPS` / `CRUCIBLE_DEPENDENCIES`
    /// variables for the generator command.
    pub fn generate_local(
        &self,
        miniapps: &[PackageRef],
        dependencies: &[PackageRef],
        version: &Version,
        container_name: &str,
    ) -> Result<ArtifactRef> {
        let join = |packages: &[PackageRef]| {
            packages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        self.run(
            self.args
                .iter()
                .map(|arg| {
                    arg.replace("{version}", &version.to_string())
                        .replace("{name}", container_name)
                })
                .collect(),
            vec![
                ("CRUCIBLE_MINIAPPS", join(miniapps)),
                ("CRUCIBLE_DEPENDENCIES", join(dependencies)),
                ("CRUCIBLE_CONTAINER_VERSION", version.to_string()),
                ("CRUCIBLE_CONTAINER_NAME", container_name.to_string()),
                ("CRUCIBLE_PUBLISH", "false".to_string()),
            ],
            format!("Generating local container {}@{}", container_name, version),
        )?;

        Ok(ArtifactRef {
            container_name: container_name.to_string(),
            version: version.clone(),
        })
    }
}

impl ContainerGenerator for CommandGenerator {
    fn generate(
        &self,
        descriptor: &NativeApplicationDescriptor,
        version: &Version,
        options: &GenerateOptions,
    ) -> Result<ArtifactRef> {
        let name = options.container_name();

        self.run(
            self.args
                .iter()
                .map(|arg| Self::substitute(arg, descriptor, version, name))
                .collect(),
            vec![
                ("CRUCIBLE_DESCRIPTOR", descriptor.to_string()),
                ("CRUCIBLE_CONTAINER_VERSION", version.to_string()),
                ("CRUCIBLE_CONTAINER_NAME", name.to_string()),
                (
                    "CRUCIBLE_PUBLISH",
                    if options.publish { "true" } else { "false" }.to_string(),
                ),
            ],
            format!("Generating container {}@{} for {}", name, version, descriptor),
        )?;

        Ok(ArtifactRef {
            container_name: name.to_string(),
            version: version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Platform;

    fn descriptor() -> NativeApplicationDescriptor {
        NativeApplicationDescriptor::new("MyApp", Platform::Android, "1.0.0")
    }

    #[test]
    fn test_substitute_placeholders() {
        let result = CommandGenerator::substitute(
            "--target={descriptor}/{name}@{version}",
            &descriptor(),
            &Version::new(2, 1, 1),
            "runner",
        );
        assert_eq!(result, "--target=MyApp:android:1.0.0/runner@2.1.1");
    }

    #[test]
    fn test_default_container_name() {
        let options = GenerateOptions::default();
        assert_eq!(options.container_name(), "runner");

        let options = GenerateOptions {
            container_name: Some("custom".to_string()),
            ..Default::default()
        };
        assert_eq!(options.container_name(), "custom");
    }

    #[test]
    fn test_successful_command_returns_artifact() {
        let generator =
            CommandGenerator::new("true", Vec::new(), OutputConfig::without_color());
        let artifact = generator
            .generate(&descriptor(), &Version::new(1, 0, 0), &GenerateOptions::default())
            .unwrap();
        assert_eq!(artifact.container_name, "runner");
        assert_eq!(artifact.version, Version::new(1, 0, 0));
    }

    #[test]
    fn test_failing_command_reports_generator_error() {
        let generator =
            CommandGenerator::new("false", Vec::new(), OutputConfig::without_color());
        let result = generator.generate(
            &descriptor(),
            &Version::new(1, 0, 0),
            &GenerateOptions::default(),
        );
        assert!(matches!(result, Err(Error::Generator { .. })));
    }

    #[test]
    fn test_generate_local_returns_artifact() {
        let generator =
            CommandGenerator::new("true", Vec::new(), OutputConfig::without_color());
        let artifact = generator
            .generate_local(
                &["mini-chat@1.2.0".parse().unwrap()],
                &[],
                &Version::new(1, 0, 0),
                "demo",
            )
            .unwrap();
        assert_eq!(artifact.container_name, "demo");
    }

    #[test]
    fn test_missing_command_reports_generator_error() {
        let generator = CommandGenerator::new(
            "crucible-no-such-generator",
            Vec::new(),
            OutputConfig::without_color(),
        );
        let result = generator.generate(
            &descriptor(),
            &Version::new(1, 0, 0),
            &GenerateOptions::default(),
        );
        assert!(matches!(result, Err(Error::Generator { .. })));
    }
}

//! # Tool Configuration
//!
//! This module defines the schema of the `.crucible.yaml` configuration
//! file and the resolution rules for values that can come from multiple
//! places (file, environment, built-in defaults).
//!
//! ## File Format
//!
//! ```yaml
//! cauldron:
//!   # Directory holding cauldron.json; defaults to the platform cache dir
//!   path: /home/dev/.cache/crucible/cauldron
//!   # Optional git remote the cauldron is synchronized with
//!   repository: git@github.com:org/myapp-cauldron.git
//!
//! generator:
//!   command: crucible-container-gen
//!   args: ["--descriptor", "{descriptor}", "--version", "{version}"]
//!
//! registry:
//!   command: npm
//! ```
//!
//! Every section is optional; a missing configuration file yields a fully
//! defaulted configuration operating on a local cauldron.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cauldron::FileStore;
use crate::container::CommandGenerator;
use crate::defaults;
use crate::error::{Error, Result};
use crate::output::OutputConfig;
use crate::registry::NpmRegistry;

/// Top-level `.crucible.yaml` schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cauldron: CauldronConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Location of the cauldron state store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CauldronConfig {
    /// Directory holding the cauldron document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Git remote the cauldron directory is a clone of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// External container generator command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(default = "GeneratorConfig::default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl GeneratorConfig {
    fn default_command() -> String {
        "crucible-container-gen".to_string()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            args: Vec::new(),
        }
    }
}

/// Package registry client command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default = "RegistryConfig::default_command")]
    pub command: String,
}

impl RegistryConfig {
    fn default_command() -> String {
        "npm".to_string()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
        }
    }
}

impl Config {
    /// Parse a configuration from YAML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
            hint: Some("see '.crucible.yaml' in the documentation for the schema".to_string()),
        })?;

        // scp-style remotes (git@host:path) are not URLs; only the URL forms
        // are validated
        if let Some(repository) = &config.cauldron.repository {
            if repository.starts_with("http://")
                || repository.starts_with("https://")
                || repository.starts_with("ssh://")
            {
                url::Url::parse(repository)?;
            }
        }

        Ok(config)
    }

    /// Load the configuration.
    ///
    /// An explicitly given path must exist. Otherwise
    /// [`defaults::DEFAULT_CONFIG_FILENAME`] in the current directory is
    /// used when present, and a fully defaulted configuration when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config {
                        message: format!("configuration file not found: {}", path.display()),
                        hint: None,
                    });
                }
                path.to_path_buf()
            }
            None => {
                let default = PathBuf::from(defaults::DEFAULT_CONFIG_FILENAME);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        Self::parse(&fs::read_to_string(path)?)
    }

    /// Serialize to the on-disk YAML form.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The cauldron directory this configuration points at.
    ///
    /// Resolution order: `cauldron.path` from the file, the
    /// `CRUCIBLE_CAULDRON` environment variable, the platform default.
    pub fn cauldron_root(&self) -> PathBuf {
        if let Some(path) = &self.cauldron.path {
            return path.clone();
        }
        if let Some(path) = std::env::var_os("CRUCIBLE_CAULDRON") {
            return PathBuf::from(path);
        }
        defaults::default_cauldron_root()
    }

    /// Open the configured cauldron store, synchronizing with the remote
    /// when one is configured.
    pub fn open_store(&self) -> Result<FileStore> {
        FileStore::open(self.cauldron_root(), self.cauldron.repository.clone())
    }

    /// Build the configured container generator client.
    pub fn generator(&self, output: &OutputConfig) -> CommandGenerator {
        CommandGenerator::new(
            self.generator.command.clone(),
            self.generator.args.clone(),
            output.clone(),
        )
    }

    /// Build the configured package registry client.
    pub fn registry_client(&self) -> NpmRegistry {
        NpmRegistry::new(self.registry.command.clone())
    }
}

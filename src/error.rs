//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `crucible` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur within the application. Each variant corresponds to a specific
//!   type of error and includes contextual information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the application to simplify function signatures and ensure
//!   type safety.
//!
//! The `Error` enum is designed to be exhaustive and cover all possible
//! failure scenarios, including:
//!
//! - Descriptor and package reference parsing errors.
//! - Cauldron document access and lookup errors.
//! - Transaction lifecycle violations (store locked, no open transaction).
//! - Precondition violations.
//! - Container generator and publish failures.
//! - Package registry query errors.
//! - Git synchronization failures for remote-backed cauldrons.
//! - Inconsistent caller input (usage errors).
//! - I/O, JSON, YAML, semver, and URL parsing errors.
//!
//! Each error variant includes a `message` field and potentially other
//! contextual information (e.g., `descriptor`, `condition`, `command`,
//! `stderr`, `hint`).
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions, making it easy to handle errors and propagate them up the
//! call stack.

use thiserror::Error;

/// Main error type for crucible operations
#[derive(Error, Debug)]
pub enum Error {
    /// A native application descriptor string could not be parsed.
    ///
    /// Includes the offending string and the specific parsing issue.
    #[error("Invalid native application descriptor '{descriptor}': {message}")]
    Descriptor { descriptor: String, message: String },

    /// A mini-app or dependency package reference could not be parsed.
    #[error("Invalid package reference '{package}': {message}")]
    Package { package: String, message: String },

    /// An error occurred while loading or parsing the `.crucible.yaml`
    /// configuration file.
    ///
    /// This error includes the specific issue and optionally a hint about
    /// how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The cauldron state store could not be reached or opened.
    #[error("Cauldron unavailable: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    StoreUnavailable {
        message: String,
        /// Optional hint for how to restore access to the store
        hint: Option<String>,
    },

    /// A transaction primitive was used out of order, e.g. `begin` while a
    /// transaction is already open, or `commit` without one.
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// An error occurred while reading or mutating the cauldron document.
    #[error("Cauldron operation error: {message}")]
    Cauldron { message: String },

    /// The requested descriptor does not exist in the cauldron.
    #[error("Native application '{descriptor}' was not found in the cauldron")]
    DescriptorNotFound { descriptor: String },

    /// A named precondition evaluated to false.
    ///
    /// The `condition` identifies which check failed; the message explains
    /// why, optionally extended with caller-supplied context.
    #[error("Precondition failed [{condition}]: {message}")]
    Precondition { condition: String, message: String },

    /// The container generator command failed to build or publish.
    #[error("Container generation failed: {command} - {status}\n{stderr}")]
    Generator {
        command: String,
        status: String,
        stderr: String,
    },

    /// A package registry query failed.
    #[error("Registry query error for {package}: {message}")]
    Registry { package: String, message: String },

    /// An error occurred while executing a Git command against the cauldron
    /// repository.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An error occurred while synchronizing the cauldron repository.
    ///
    /// Includes the repository URL, error message, and an optional hint for
    /// resolution.
    #[error("Cauldron sync error for {url}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitSync {
        url: String,
        message: String,
        /// Optional hint for how to resolve the sync issue
        hint: Option<String>,
    },

    /// The caller supplied an inconsistent combination of inputs.
    ///
    /// Raised before any state-mutating step begins.
    #[error("Invalid usage: {message}")]
    Usage { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

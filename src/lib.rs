//! # Crucible Library
//!
//! This library provides the core functionality for managing versioned
//! native application containers against a cauldron state store. It is
//! designed to be used by the `crucible` command-line tool but can also be
//! integrated into other applications that drive container updates
//! programmatically.
//!
//! ## Quick Example
//!
//! ```
//! use crucible::cauldron::CauldronDocument;
//! use crucible::descriptor::NativeApplicationDescriptor;
//!
//! // Parse a native application descriptor
//! let descriptor: NativeApplicationDescriptor = "MyApp:android:1.0.0".parse().unwrap();
//! assert!(descriptor.is_complete());
//!
//! // Track it in a cauldron document
//! let mut document = CauldronDocument::default();
//! document.add_version(&descriptor).unwrap();
//! assert!(document.contains(&descriptor));
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Descriptors (`descriptor`)**: canonical `name:platform:version`
//!   identifiers for one version of one native application.
//! - **The Cauldron (`cauldron`)**: the state store tracking applications,
//!   container versions, and each container's mini-app and dependency
//!   manifests, behind the `StateStore` trait with a file/git-backed
//!   production implementation.
//! - **Transactional Updates (`update`)**: the orchestrator that applies a
//!   manifest mutation, regenerates the container artifact, and moves the
//!   container version pointer with all-or-nothing visibility.
//! - **Preconditions (`preconditions`)**: an ordered, short-circuiting
//!   guard layer validated before any state-changing operation.
//! - **Collaborators (`container`, `registry`)**: the external container
//!   generator and package registry, behind traits with subprocess-backed
//!   implementations.
//!
//! ## Execution Flow
//!
//! A state-changing command executes the following high-level steps:
//!
//! 1.  **Configuration**: load `.crucible.yaml` and open the cauldron
//!     (cloning or fast-forwarding the remote when one is configured).
//! 2.  **Preconditions**: evaluate the command's ordered check list,
//!     aborting the process on the first violation.
//! 3.  **Version selection**: pick the next container version (explicit,
//!     patch-increment, or the `1.0.0` default).
//! 4.  **Transaction**: open a cauldron transaction, apply the mutation,
//!     regenerate and publish the container, persist the version pointer,
//!     and commit; any failure discards the transaction.
//!
//! By separating the logic into these distinct modules, the library keeps
//! every state transition atomic from the perspective of other cauldron
//! readers.

pub mod cauldron;
pub mod config;
pub mod container;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod output;
pub mod package;
pub mod preconditions;
pub mod registry;
pub mod update;
pub mod version;

#[cfg(test)]
mod descriptor_proptest;

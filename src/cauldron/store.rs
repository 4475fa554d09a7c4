//! # File-Backed Cauldron Store
//!
//! `FileStore` is the production [`StateStore`] implementation. The
//! cauldron lives in a directory holding a single `cauldron.json` document,
//! optionally a Git clone of a remote cauldron repository.
//!
//! ## Transaction Mechanics
//!
//! - `begin` takes an exclusive lock (a `.cauldron.lock` file created with
//!   `create_new`, so concurrent crucible processes contend on the
//!   filesystem) and loads the document into an in-memory staging copy.
//! - Reads and writes inside the transaction operate on the staging copy;
//!   the on-disk document stays untouched, so concurrent readers never
//!   observe intermediate state.
//! - `commit` serializes the staging copy to a temporary file and renames
//!   it over the document (atomic on POSIX filesystems), then pushes to the
//!   remote when one is configured. A failed push restores the previous
//!   document bytes so the local clone never diverges from what readers
//!   already saw.
//! - `discard` drops the staging copy and releases the lock.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use semver::Version;

use crate::cauldron::{git, CauldronDocument, NativeApp, StateStore};
use crate::defaults::CAULDRON_DOCUMENT_FILENAME;
use crate::descriptor::NativeApplicationDescriptor;
use crate::error::{Error, Result};
use crate::package::PackageRef;

const LOCK_FILENAME: &str = ".cauldron.lock";
const STAGING_FILENAME: &str = "cauldron.json.tmp";

/// File-backed cauldron store, optionally synchronized with a Git remote.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    remote: Option<String>,
    staging: Option<CauldronDocument>,
}

impl FileStore {
    /// Open an existing cauldron directory.
    ///
    /// When a remote URL is configured, the local clone is created on first
    /// use and fast-forwarded to the remote state on every subsequent open.
    pub fn open(root: impl Into<PathBuf>, remote: Option<String>) -> Result<Self> {
        let root = root.into();

        if let Some(url) = &remote {
            if root.join(".git").exists() {
                git::pull(url, &root)?;
            } else {
                git::clone(url, &root)?;
            }
        }

        Ok(Self {
            root,
            remote,
            staging: None,
        })
    }

    /// Create a fresh cauldron directory seeded with an empty document.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let store = Self {
            root,
            remote: None,
            staging: None,
        };
        store.write_document(&CauldronDocument::default())?;
        Ok(store)
    }

    /// Directory this store operates on.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self) -> PathBuf {
        self.root.join(CAULDRON_DOCUMENT_FILENAME)
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILENAME)
    }

    fn load_document(&self) -> Result<CauldronDocument> {
        let path = self.document_path();
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::StoreUnavailable {
                    message: format!("no cauldron document at {}", path.display()),
                    hint: Some("run 'crucible init' to create one".to_string()),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomically replace the on-disk document.
    fn write_document(&self, document: &CauldronDocument) -> Result<()> {
        let staging_path = self.root.join(STAGING_FILENAME);
        let mut content = serde_json::to_string_pretty(document)?;
        content.push('\n');
        fs::write(&staging_path, content)?;
        fs::rename(&staging_path, self.document_path())?;
        Ok(())
    }

    fn with_document<T>(&self, read: impl FnOnce(&CauldronDocument) -> Result<T>) -> Result<T> {
        match &self.staging {
            Some(document) => read(document),
            None => read(&self.load_document()?),
        }
    }

    fn staging_mut(&mut self) -> Result<&mut CauldronDocument> {
        self.staging.as_mut().ok_or_else(|| Error::Transaction {
            message: "cauldron writes require an open transaction".to_string(),
        })
    }

    fn release_lock(&self) -> Result<()> {
        match fs::remove_file(self.lock_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl StateStore for FileStore {
    fn is_active(&self) -> bool {
        self.document_path().is_file()
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.staging.is_some() {
            return Err(Error::Transaction {
                message: "a transaction is already open".to_string(),
            });
        }

        if !self.is_active() {
            return Err(Error::StoreUnavailable {
                message: format!("no cauldron document at {}", self.document_path().display()),
                hint: Some("run 'crucible init' to create one".to_string()),
            });
        }

        let lock_path = self.lock_path();
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::StoreUnavailable {
                    message: "the cauldron is locked by another transaction".to_string(),
                    hint: Some(format!(
                        "if no other crucible process is running, delete {}",
                        lock_path.display()
                    )),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        }

        match self.load_document() {
            Ok(document) => {
                self.staging = Some(document);
                Ok(())
            }
            Err(e) => {
                // Do not leave a stale lock behind when begin fails.
                if let Err(unlock_err) = self.release_lock() {
                    warn!("failed to release cauldron lock: {}", unlock_err);
                }
                Err(e)
            }
        }
    }

    fn commit_transaction(&mut self) -> Result<()> {
        let document = self.staging.clone().ok_or_else(|| Error::Transaction {
            message: "no transaction to commit".to_string(),
        })?;

        // Pre-image for rollback when the remote rejects the commit.
        let previous = fs::read(self.document_path())?;

        self.write_document(&document)?;

        if let Some(url) = &self.remote {
            if let Err(push_err) = git::commit_and_push(url, &self.root, "crucible: cauldron update")
            {
                if let Err(restore_err) = fs::write(self.document_path(), &previous) {
                    warn!(
                        "failed to restore cauldron document after rejected push: {}",
                        restore_err
                    );
                }
                return Err(push_err);
            }
        }

        self.staging = None;
        self.release_lock()
    }

    fn discard_transaction(&mut self) -> Result<()> {
        self.staging = None;
        self.release_lock()
    }

    fn native_apps(&self) -> Result<Vec<NativeApp>> {
        self.with_document(|doc| Ok(doc.native_apps.clone()))
    }

    fn descriptor_exists(&self, descriptor: &NativeApplicationDescriptor) -> Result<bool> {
        self.with_document(|doc| Ok(doc.contains(descriptor)))
    }

    fn top_level_container_version(
        &self,
        descriptor: &NativeApplicationDescriptor,
    ) -> Result<Option<Version>> {
        self.with_document(|doc| {
            let entry = doc.version_entry(descriptor)?;
            match &entry.container_version {
                Some(raw) => Ok(Some(Version::parse(raw)?)),
                None => Ok(None),
            }
        })
    }

    fn update_container_version(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        version: &Version,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        entry.container_version = Some(version.to_string());
        Ok(())
    }

    fn add_app_version(&mut self, descriptor: &NativeApplicationDescriptor) -> Result<()> {
        self.staging_mut()?.add_version(descriptor)
    }

    fn miniapps(&self, descriptor: &NativeApplicationDescriptor) -> Result<Vec<PackageRef>> {
        self.with_document(|doc| Ok(doc.version_entry(descriptor)?.mini_apps.clone()))
    }

    fn dependencies(&self, descriptor: &NativeApplicationDescriptor) -> Result<Vec<PackageRef>> {
        self.with_document(|doc| Ok(doc.version_entry(descriptor)?.native_deps.clone()))
    }

    fn add_miniapp(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        if entry.mini_apps.iter().any(|m| m.name() == package.name()) {
            return Err(Error::Cauldron {
                message: format!(
                    "mini-app '{}' is already in the '{}' container",
                    package.name(),
                    descriptor
                ),
            });
        }
        entry.mini_apps.push(package.clone());
        Ok(())
    }

    fn remove_miniapp(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        name: &str,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        let before = entry.mini_apps.len();
        entry.mini_apps.retain(|m| m.name() != name);
        if entry.mini_apps.len() == before {
            return Err(Error::Cauldron {
                message: format!(
                    "mini-app '{}' is not in the '{}' container",
                    name, descriptor
                ),
            });
        }
        Ok(())
    }

    fn add_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        if entry.native_deps.iter().any(|d| d.name() == package.name()) {
            return Err(Error::Cauldron {
                message: format!(
                    "dependency '{}' is already in the '{}' container",
                    package.name(),
                    descriptor
                ),
            });
        }
        entry.native_deps.push(package.clone());
        Ok(())
    }

    fn remove_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        name: &str,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        let before = entry.native_deps.len();
        entry.native_deps.retain(|d| d.name() != name);
        if entry.native_deps.len() == before {
            return Err(Error::Cauldron {
                message: format!(
                    "dependency '{}' is not in the '{}' container",
                    name, descriptor
                ),
            });
        }
        Ok(())
    }

    fn update_dependency(
        &mut self,
        descriptor: &NativeApplicationDescriptor,
        package: &PackageRef,
    ) -> Result<()> {
        let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
        match entry
            .native_deps
            .iter_mut()
            .find(|d| d.name() == package.name())
        {
            Some(existing) => {
                *existing = package.clone();
                Ok(())
            }
            None => Err(Error::Cauldron {
                message: format!(
                    "dependency '{}' is not in the '{}' container",
                    package.name(),
                    descriptor
                ),
            }),
        }
    }
}

//! # Transactional Container State Updates
//!
//! This module implements the one protocol with real atomicity invariants
//! in crucible: applying a semantic change to a container's manifest,
//! regenerating the container artifact, and moving the descriptor's
//! container version pointer, all with all-or-nothing visibility to other
//! readers of the cauldron.
//!
//! ## Protocol
//!
//! 1. **Version selection**: an explicit caller-supplied container version
//!    is used verbatim; otherwise the recorded version's patch component is
//!    incremented, falling back to `1.0.0` for descriptors with no recorded
//!    version.
//! 2. **Open transaction** against the state store; nothing else runs if
//!    this fails.
//! 3. **Apply mutation**: the caller-supplied closure performs the semantic
//!    change (add/remove a mini-app or dependency reference) against the
//!    in-transaction state.
//! 4. **Regenerate artifact**: generate and publish the container at the
//!    selected version. This runs *before* the version pointer moves, so a
//!    concurrent reader can never observe a pointer referencing a container
//!    that does not exist yet.
//! 5. **Persist version pointer** inside the transaction.
//! 6. **Commit**, making steps 3-5 atomically visible.
//!
//! Any failure in steps 2-6 discards the transaction (best-effort; a
//! discard failure is logged as a warning, not escalated) and re-raises the
//! original error after logging it. Only one update per descriptor may be
//! in flight from a given process; cross-process isolation is the store's
//! responsibility.

use log::{debug, error, warn};
use semver::Version;

use crate::cauldron::StateStore;
use crate::container::{ContainerGenerator, GenerateOptions};
use crate::descriptor::NativeApplicationDescriptor;
use crate::error::Result;
use crate::version::select_container_version;

/// Options for one transactional update.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Explicit container version, used verbatim when present.
    pub container_version: Option<Version>,
    /// Container name passed through to the generator.
    pub container_name: Option<String>,
}

/// Perform a single logical state transition against the cauldron.
///
/// `mutation` runs inside the transaction and performs the semantic change;
/// the generated container is published. Returns the container version that
/// was committed.
pub fn perform_container_update<S, G, M>(
    store: &mut S,
    generator: &G,
    descriptor: &NativeApplicationDescriptor,
    options: &UpdateOptions,
    mutation: M,
) -> Result<Version>
where
    S: StateStore,
    G: ContainerGenerator,
    M: FnOnce(&mut S) -> Result<()>,
{
    let current = store.top_level_container_version(descriptor)?;
    let version = select_container_version(options.container_version.as_ref(), current.as_ref());
    debug!("selected container version {} for {}", version, descriptor);

    let generate_options = GenerateOptions {
        publish: true,
        container_name: options.container_name.clone(),
    };

    let result = (|| -> Result<()> {
        store.begin_transaction()?;
        mutation(store)?;
        generator.generate(descriptor, &version, &generate_options)?;
        store.update_container_version(descriptor, &version)?;
        store.commit_transaction()
    })();

    match result {
        Ok(()) => Ok(version),
        Err(err) => {
            error!("container state update for {} failed: {}", descriptor, err);
            if let Err(discard_err) = store.discard_transaction() {
                warn!("failed to discard cauldron transaction: {}", discard_err);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::cauldron::{CauldronDocument, NativeApp};
    use crate::container::ArtifactRef;
    use crate::error::Error;
    use crate::package::PackageRef;

    type EventLog = Rc<RefCell<Vec<&'static str>>>;

    /// In-memory state store recording the transaction protocol.
    struct MemoryStore {
        committed: CauldronDocument,
        staging: Option<CauldronDocument>,
        fail_begin: bool,
        fail_commit: bool,
        commits: usize,
        discards: usize,
        events: EventLog,
    }

    impl MemoryStore {
        fn with_app(events: EventLog) -> Self {
            let mut committed = CauldronDocument::default();
            committed
                .add_version(&"MyApp:android:1.0.0".parse().unwrap())
                .unwrap();
            Self {
                committed,
                staging: None,
                fail_begin: false,
                fail_commit: false,
                commits: 0,
                discards: 0,
                events,
            }
        }

        fn set_committed_container_version(&mut self, version: &str) {
            let descriptor = "MyApp:android:1.0.0".parse().unwrap();
            self.staging = Some(self.committed.clone());
            self.update_container_version(&descriptor, &Version::parse(version).unwrap())
                .unwrap();
            self.committed = self.staging.take().unwrap();
        }

        fn committed_container_version(&self) -> Option<String> {
            self.committed
                .version_entry(&"MyApp:android:1.0.0".parse().unwrap())
                .unwrap()
                .container_version
                .clone()
        }

        fn document(&self) -> &CauldronDocument {
            self.staging.as_ref().unwrap_or(&self.committed)
        }

        fn staging_mut(&mut self) -> Result<&mut CauldronDocument> {
            self.staging.as_mut().ok_or_else(|| Error::Transaction {
                message: "no open transaction".to_string(),
            })
        }
    }

    impl StateStore for MemoryStore {
        fn is_active(&self) -> bool {
            true
        }

        fn begin_transaction(&mut self) -> Result<()> {
            self.events.borrow_mut().push("begin");
            if self.fail_begin {
                return Err(Error::StoreUnavailable {
                    message: "store offline".to_string(),
                    hint: None,
                });
            }
            assert!(self.staging.is_none(), "transaction already open");
            self.staging = Some(self.committed.clone());
            Ok(())
        }

        fn commit_transaction(&mut self) -> Result<()> {
            self.events.borrow_mut().push("commit");
            if self.fail_commit {
                return Err(Error::Transaction {
                    message: "commit rejected".to_string(),
                });
            }
            self.committed = self.staging.take().expect("transaction open");
            self.commits += 1;
            Ok(())
        }

        fn discard_transaction(&mut self) -> Result<()> {
            self.events.borrow_mut().push("discard");
            self.staging = None;
            self.discards += 1;
            Ok(())
        }

        fn native_apps(&self) -> Result<Vec<NativeApp>> {
            Ok(self.document().native_apps.clone())
        }

        fn descriptor_exists(&self, descriptor: &NativeApplicationDescriptor) -> Result<bool> {
            Ok(self.document().contains(descriptor))
        }

        fn top_level_container_version(
            &self,
            descriptor: &NativeApplicationDescriptor,
        ) -> Result<Option<Version>> {
            match &self.document().version_entry(descriptor)?.container_version {
                Some(raw) => Ok(Some(Version::parse(raw)?)),
                None => Ok(None),
            }
        }

        fn update_container_version(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            version: &Version,
        ) -> Result<()> {
            self.events.borrow_mut().push("update_pointer");
            let version = version.to_string();
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            entry.container_version = Some(version);
            Ok(())
        }

        fn add_app_version(&mut self, descriptor: &NativeApplicationDescriptor) -> Result<()> {
            self.staging_mut()?.add_version(descriptor)
        }

        fn miniapps(&self, descriptor: &NativeApplicationDescriptor) -> Result<Vec<PackageRef>> {
            Ok(self.document().version_entry(descriptor)?.mini_apps.clone())
        }

        fn dependencies(
            &self,
            descriptor: &NativeApplicationDescriptor,
        ) -> Result<Vec<PackageRef>> {
            Ok(self.document().version_entry(descriptor)?.native_deps.clone())
        }

        fn add_miniapp(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            package: &PackageRef,
        ) -> Result<()> {
            self.events.borrow_mut().push("mutation");
            let package = package.clone();
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            entry.mini_apps.push(package);
            Ok(())
        }

        fn remove_miniapp(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            name: &str,
        ) -> Result<()> {
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            entry.mini_apps.retain(|m| m.name() != name);
            Ok(())
        }

        fn add_dependency(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            package: &PackageRef,
        ) -> Result<()> {
            let package = package.clone();
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            entry.native_deps.push(package);
            Ok(())
        }

        fn remove_dependency(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            name: &str,
        ) -> Result<()> {
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            entry.native_deps.retain(|d| d.name() != name);
            Ok(())
        }

        fn update_dependency(
            &mut self,
            descriptor: &NativeApplicationDescriptor,
            package: &PackageRef,
        ) -> Result<()> {
            let package = package.clone();
            let entry = self.staging_mut()?.version_entry_mut(descriptor)?;
            if let Some(existing) = entry
                .native_deps
                .iter_mut()
                .find(|d| d.name() == package.name())
            {
                *existing = package;
            }
            Ok(())
        }
    }

    /// Generator stub recording its invocations.
    struct MockGenerator {
        fail: bool,
        calls: RefCell<Vec<(String, Version, bool)>>,
        events: EventLog,
    }

    impl MockGenerator {
        fn new(events: EventLog) -> Self {
            Self {
                fail: false,
                calls: RefCell::new(Vec::new()),
                events,
            }
        }

        fn failing(events: EventLog) -> Self {
            Self {
                fail: true,
                ..Self::new(events)
            }
        }
    }

    impl ContainerGenerator for MockGenerator {
        fn generate(
            &self,
            descriptor: &NativeApplicationDescriptor,
            version: &Version,
            options: &GenerateOptions,
        ) -> Result<ArtifactRef> {
            self.events.borrow_mut().push("generate");
            self.calls.borrow_mut().push((
                descriptor.to_string(),
                version.clone(),
                options.publish,
            ));
            if self.fail {
                return Err(Error::Generator {
                    command: "mock".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                });
            }
            Ok(ArtifactRef {
                container_name: options.container_name().to_string(),
                version: version.clone(),
            })
        }
    }

    fn descriptor() -> NativeApplicationDescriptor {
        "MyApp:android:1.0.0".parse().unwrap()
    }

    fn add_miniapp_mutation(store: &mut MemoryStore) -> Result<()> {
        store.add_miniapp(&descriptor(), &"mini-chat@1.2.0".parse().unwrap())
    }

    #[test]
    fn test_first_update_selects_default_version() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        let generator = MockGenerator::new(events);

        let version = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        )
        .unwrap();

        assert_eq!(version, Version::new(1, 0, 0));
        assert_eq!(store.committed_container_version().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_update_bumps_patch_of_recorded_version() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.set_committed_container_version("2.1.0");
        let generator = MockGenerator::new(events);

        let version = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        )
        .unwrap();

        assert_eq!(version, Version::new(2, 1, 1));
        assert_eq!(store.committed_container_version().as_deref(), Some("2.1.1"));
        assert_eq!(store.commits, 1);
        assert_eq!(store.discards, 0);
    }

    #[test]
    fn test_explicit_version_is_used_verbatim() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.set_committed_container_version("2.1.0");
        let generator = MockGenerator::new(events);

        let version = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions {
                container_version: Some(Version::new(5, 0, 0)),
                container_name: None,
            },
            add_miniapp_mutation,
        )
        .unwrap();

        assert_eq!(version, Version::new(5, 0, 0));
        assert_eq!(store.committed_container_version().as_deref(), Some("5.0.0"));
    }

    #[test]
    fn test_generation_is_published_and_ordered_before_pointer_write() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        let generator = MockGenerator::new(events.clone());

        perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        )
        .unwrap();

        assert_eq!(
            *events.borrow(),
            vec!["begin", "mutation", "generate", "update_pointer", "commit"]
        );

        let calls = generator.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (called_descriptor, called_version, published) = &calls[0];
        assert_eq!(called_descriptor, "MyApp:android:1.0.0");
        assert_eq!(*called_version, Version::new(1, 0, 0));
        assert!(*published);
    }

    #[test]
    fn test_failing_mutation_discards_and_preserves_pointer() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.set_committed_container_version("2.1.0");
        let generator = MockGenerator::new(events);

        let result = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            |_store| {
                Err(Error::Cauldron {
                    message: "mutation rejected".to_string(),
                })
            },
        );

        assert!(result.is_err());
        assert_eq!(store.discards, 1);
        assert_eq!(store.commits, 0);
        assert_eq!(store.committed_container_version().as_deref(), Some("2.1.0"));
        // The artifact is never generated for a failed mutation
        assert!(generator.calls.borrow().is_empty());
    }

    #[test]
    fn test_failing_generation_discards_and_reraises() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.set_committed_container_version("2.1.0");
        let generator = MockGenerator::failing(events);

        let result = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        );

        assert!(matches!(result, Err(Error::Generator { .. })));
        assert_eq!(store.discards, 1);
        assert_eq!(store.commits, 0);
        assert_eq!(store.committed_container_version().as_deref(), Some("2.1.0"));
        // The staged mini-app never became visible
        assert!(store.miniapps(&descriptor()).unwrap().is_empty());
    }

    #[test]
    fn test_failed_begin_runs_nothing_else() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.fail_begin = true;
        let generator = MockGenerator::new(events.clone());

        let result = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        );

        assert!(matches!(result, Err(Error::StoreUnavailable { .. })));
        assert!(generator.calls.borrow().is_empty());
        // begin, then the discard of the failed protocol run
        assert_eq!(*events.borrow(), vec!["begin", "discard"]);
    }

    #[test]
    fn test_failed_commit_discards() {
        let events: EventLog = Rc::default();
        let mut store = MemoryStore::with_app(events.clone());
        store.fail_commit = true;
        let generator = MockGenerator::new(events);

        let result = perform_container_update(
            &mut store,
            &generator,
            &descriptor(),
            &UpdateOptions::default(),
            add_miniapp_mutation,
        );

        assert!(result.is_err());
        assert_eq!(store.discards, 1);
        assert_eq!(store.committed_container_version(), None);
    }
}

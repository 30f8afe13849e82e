//! The guarded registry instance dispatchers trust.
//!
//! A [`Resolver`] owns one [`ModuleRegistry`], one [`ConfigurationRegistry`]
//! and one [`Blacklist`] behind a single lock. Every mutation:
//!
//! 1. checks the caller's capability and the suspension state,
//! 2. validates completely and applies inside one write-lock section,
//! 3. releases the lock, then logs and notifies observers.
//!
//! A mutation that returns an error has changed nothing.

use super::{
    blacklist::Blacklist,
    configurations::{
        BatchOutcome, ConfigurationRegistry, ConfigurationSnapshot, ConfiguredModule,
        Implementation,
    },
    modules::ModuleRegistry,
};
use crate::{
    collaborators::{AllowAll, NeverSuspended},
    config::ResolverConfig,
    observer::{Observer, RegistryEvent, notify},
};
use parking_lot::RwLock;
use pivot_core::{
    AccessControl, AccessError, CallerId, Capability, ConfigurationId, ConfigurationVersion,
    GlobalVersion, ModuleHandle, ModuleKey, OperationId, Page, PivotError, StateError, Suspension,
    ValidationError, VersionStatus,
};
use std::{fmt, sync::Arc};

#[derive(Debug, Default)]
struct ResolverState {
    modules: ModuleRegistry,
    configurations: ConfigurationRegistry,
    blacklist: Blacklist,
}

/// Module registry, configuration registry and blacklist behind one lock.
///
/// Created through [`Resolver::builder`]; usually shared as `Arc<Resolver>`.
pub struct Resolver {
    state: RwLock<ResolverState>,
    access: Arc<dyn AccessControl>,
    suspension: Arc<dyn Suspension>,
    config: ResolverConfig,
    observers: Vec<Arc<dyn Observer>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Resolver")
            .field("latest_version", &state.modules.latest_version())
            .field("modules", &state.modules.count_modules())
            .field("configurations", &state.configurations.count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Resolver {
    /// Start building a resolver.
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// The configuration this resolver was built with.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn guard(&self, caller: &CallerId, capability: Capability) -> Result<(), AccessError> {
        if !self.access.has_capability(caller, capability) {
            return Err(AccessError::NotAuthorized {
                caller: caller.clone(),
                capability,
            });
        }
        if self.suspension.is_suspended() {
            return Err(AccessError::Suspended);
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), ValidationError> {
        if len > self.config.max_batch_len {
            return Err(ValidationError::BatchTooLarge {
                len,
                max: self.config.max_batch_len,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Module registry
    // ------------------------------------------------------------------

    /// Register a batch of implementations as the next global version.
    ///
    /// The batch must re-declare every key of the latest version; see
    /// [`ModuleRegistry::validate`].
    pub fn register_modules(
        &self,
        caller: &CallerId,
        batch: Vec<(ModuleKey, ModuleHandle)>,
    ) -> Result<GlobalVersion, PivotError> {
        let result = self
            .guard(caller, Capability::REGISTRY_ADMIN)
            .map_err(PivotError::from)
            .and_then(|()| Ok(self.check_len(batch.len())?))
            .and_then(|()| Ok(self.state.write().modules.register(&batch)?));

        match result {
            Ok(version) => {
                emit!(info, %caller, version, modules = batch.len(), "modules registered");
                notify(
                    &self.observers,
                    RegistryEvent::ModulesRegistered {
                        caller: caller.clone(),
                        version,
                        batch,
                    },
                );
                Ok(version)
            }
            Err(err) => Err(rejected("register_modules", caller, err)),
        }
    }

    /// Soft-disable a global version.
    ///
    /// Historical resolution is unaffected; new configuration entries can no
    /// longer select the version. Deactivating twice is a no-op.
    pub fn deactivate_version(
        &self,
        caller: &CallerId,
        version: GlobalVersion,
    ) -> Result<(), PivotError> {
        let result = self
            .guard(caller, Capability::REGISTRY_ADMIN)
            .map_err(PivotError::from)
            .and_then(|()| Ok(self.state.write().modules.deactivate(version)?));

        match result {
            Ok(changed) => {
                if changed {
                    emit!(info, %caller, version, "global version deactivated");
                    notify(
                        &self.observers,
                        RegistryEvent::VersionDeactivated {
                            caller: caller.clone(),
                            version,
                        },
                    );
                }
                Ok(())
            }
            Err(err) => Err(rejected("deactivate_version", caller, err)),
        }
    }

    /// Implementation of `key` at `version`.
    ///
    /// Fails with `VersionDoesNotExist` for version `0` or a version never
    /// created; a key absent from the version yields the sentinel handle.
    pub fn resolve(&self, key: &ModuleKey, version: GlobalVersion) -> Result<ModuleHandle, PivotError> {
        Ok(self.state.read().modules.resolve(key, version)?)
    }

    /// Implementation of `key` at the latest version, or the sentinel.
    pub fn resolve_latest(&self, key: &ModuleKey) -> ModuleHandle {
        self.state.read().modules.resolve_latest(key)
    }

    /// The latest global version; `0` while empty.
    pub fn latest_version(&self) -> GlobalVersion {
        self.state.read().modules.latest_version()
    }

    /// Status of a global version.
    pub fn version_status(&self, version: GlobalVersion) -> VersionStatus {
        self.state.read().modules.version_status(version)
    }

    /// Number of distinct module keys.
    pub fn count_modules(&self) -> usize {
        self.state.read().modules.count_modules()
    }

    /// Module keys in first-registration order.
    pub fn list_module_keys(&self, page: Page) -> Vec<ModuleKey> {
        self.state.read().modules.module_keys(page)
    }

    /// Every implementation ever registered under `key`, oldest first.
    pub fn module_implementations(&self, key: &ModuleKey, page: Page) -> Vec<ModuleHandle> {
        self.state
            .read()
            .modules
            .record(key)
            .map(|record| page.slice(record.implementations()).to_vec())
            .unwrap_or_default()
    }

    /// Number of implementations registered under `key`.
    pub fn count_implementations(&self, key: &ModuleKey) -> usize {
        self.state
            .read()
            .modules
            .record(key)
            .map_or(0, |record| record.len())
    }

    // ------------------------------------------------------------------
    // Configuration registry
    // ------------------------------------------------------------------

    /// Append entries to `id`'s next version and optionally commit it.
    ///
    /// Returns the new configuration version when `finalize` is set, `None`
    /// for intermediate calls. See [`ConfigurationRegistry::append`].
    pub fn create_configuration_batch(
        &self,
        caller: &CallerId,
        id: &ConfigurationId,
        entries: Vec<(ModuleKey, GlobalVersion)>,
        finalize: bool,
    ) -> Result<Option<ConfigurationVersion>, PivotError> {
        let result = self
            .guard(caller, Capability::CONFIGURATION_AUTHOR)
            .map_err(PivotError::from)
            .and_then(|()| Ok(self.check_len(entries.len())?))
            .and_then(|()| {
                let mut state = self.state.write();
                let ResolverState {
                    modules,
                    configurations,
                    ..
                } = &mut *state;
                configurations.append(modules, caller, id, &entries, finalize)
            });

        match result {
            Ok(BatchOutcome::Pending { accumulated }) => {
                emit!(debug, %caller, %id, entries = entries.len(), accumulated, "configuration batch appended");
                notify(
                    &self.observers,
                    RegistryEvent::ConfigurationBatchAppended {
                        caller: caller.clone(),
                        id: id.clone(),
                        entries,
                        accumulated,
                    },
                );
                Ok(None)
            }
            Ok(BatchOutcome::Finalized { version, modules }) => {
                emit!(info, %caller, %id, version, modules, "configuration finalized");
                notify(
                    &self.observers,
                    RegistryEvent::ConfigurationFinalized {
                        caller: caller.clone(),
                        id: id.clone(),
                        version,
                        modules,
                    },
                );
                Ok(Some(version))
            }
            Err(err) => Err(rejected("create_configuration_batch", caller, err)),
        }
    }

    /// Drop `id`'s in-progress batch. Returns whether one existed.
    pub fn abandon_configuration_batch(
        &self,
        caller: &CallerId,
        id: &ConfigurationId,
    ) -> Result<bool, PivotError> {
        let result = self
            .guard(caller, Capability::CONFIGURATION_AUTHOR)
            .and_then(|()| self.state.write().configurations.abandon(caller, id))
            .map_err(PivotError::from);

        match result {
            Ok(0) => Ok(false),
            Ok(discarded) => {
                emit!(info, %caller, %id, discarded, "configuration batch abandoned");
                notify(
                    &self.observers,
                    RegistryEvent::ConfigurationBatchAbandoned {
                        caller: caller.clone(),
                        id: id.clone(),
                        discarded,
                    },
                );
                Ok(true)
            }
            Err(err) => Err(rejected("abandon_configuration_batch", caller, err)),
        }
    }

    /// Drop `id`'s in-progress batch whoever opened it. Returns whether one
    /// existed.
    ///
    /// Requires [`Capability::REGISTRY_ADMIN`]; releases a batch left behind
    /// by an author who can no longer finish or abandon it.
    pub fn force_abandon_configuration_batch(
        &self,
        caller: &CallerId,
        id: &ConfigurationId,
    ) -> Result<bool, PivotError> {
        if let Err(err) = self.guard(caller, Capability::REGISTRY_ADMIN) {
            return Err(rejected("force_abandon_configuration_batch", caller, err.into()));
        }

        let discarded = self.state.write().configurations.force_abandon(id);
        if discarded == 0 {
            return Ok(false);
        }
        emit!(info, %caller, %id, discarded, "configuration batch force-abandoned");
        notify(
            &self.observers,
            RegistryEvent::ConfigurationBatchAbandoned {
                caller: caller.clone(),
                id: id.clone(),
                discarded,
            },
        );
        Ok(true)
    }

    /// Latest finalized version of `id`; `0` if none.
    pub fn latest_version_by_configuration(&self, id: &ConfigurationId) -> ConfigurationVersion {
        self.state.read().configurations.latest_version(id)
    }

    /// Whether `(id, version)` is a finalized configuration version.
    pub fn is_configuration_version(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
    ) -> bool {
        self.state.read().configurations.contains(id, version)
    }

    /// A finalized configuration version.
    pub fn configuration(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
    ) -> Option<Arc<ConfigurationSnapshot>> {
        self.state.read().configurations.get(id, version).cloned()
    }

    /// Number of configurations with at least one finalized version.
    pub fn count_configurations(&self) -> usize {
        self.state.read().configurations.count()
    }

    /// Configuration ids in first-finalized order.
    pub fn list_configuration_ids(&self, page: Page) -> Vec<ConfigurationId> {
        self.state.read().configurations.ids(page)
    }

    /// Modules selected by a finalized configuration version.
    pub fn configuration_modules(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
        page: Page,
    ) -> Vec<ConfiguredModule> {
        self.configuration(id, version)
            .map(|snapshot| page.slice(snapshot.modules()).to_vec())
            .unwrap_or_default()
    }

    /// Entries accumulated for `id`'s next version.
    pub fn pending_batch_len(&self, id: &ConfigurationId) -> usize {
        self.state.read().configurations.pending_len(id)
    }

    // ------------------------------------------------------------------
    // Blacklist
    // ------------------------------------------------------------------

    /// Suppress `operations` for every dispatcher pinned to `id`.
    ///
    /// Entries already present are skipped without error.
    pub fn add_to_blacklist(
        &self,
        caller: &CallerId,
        id: &ConfigurationId,
        operations: Vec<OperationId>,
    ) -> Result<(), PivotError> {
        let result = self
            .guard(caller, Capability::BLACKLIST_OPERATOR)
            .map_err(PivotError::from)
            .and_then(|()| Ok(self.check_len(operations.len())?))
            .and_then(|()| Ok(self.state.write().blacklist.add(id, &operations)?));

        match result {
            Ok(added) => {
                if !added.is_empty() {
                    emit!(warn, %caller, %id, operations = ?added, "operations blacklisted");
                    notify(
                        &self.observers,
                        RegistryEvent::OperationsBlacklisted {
                            caller: caller.clone(),
                            id: id.clone(),
                            operations: added,
                        },
                    );
                }
                Ok(())
            }
            Err(err) => Err(rejected("add_to_blacklist", caller, err)),
        }
    }

    /// Lift the suppression of `operations` for `id`.
    ///
    /// Entries that are not blacklisted are skipped without error.
    pub fn remove_from_blacklist(
        &self,
        caller: &CallerId,
        id: &ConfigurationId,
        operations: Vec<OperationId>,
    ) -> Result<(), PivotError> {
        let result = self
            .guard(caller, Capability::BLACKLIST_OPERATOR)
            .map_err(PivotError::from)
            .and_then(|()| Ok(self.check_len(operations.len())?))
            .and_then(|()| Ok(self.state.write().blacklist.remove(id, &operations)?));

        match result {
            Ok(removed) => {
                if !removed.is_empty() {
                    emit!(info, %caller, %id, operations = ?removed, "operations removed from blacklist");
                    notify(
                        &self.observers,
                        RegistryEvent::OperationsUnblacklisted {
                            caller: caller.clone(),
                            id: id.clone(),
                            operations: removed,
                        },
                    );
                }
                Ok(())
            }
            Err(err) => Err(rejected("remove_from_blacklist", caller, err)),
        }
    }

    /// Blacklisted operations of `id`, in insertion order.
    pub fn list_blacklist(&self, id: &ConfigurationId, page: Page) -> Vec<OperationId> {
        self.state.read().blacklist.list(id, page)
    }

    /// Whether `operation` is blacklisted for `id`.
    pub fn is_blacklisted(&self, id: &ConfigurationId, operation: &OperationId) -> bool {
        self.state.read().blacklist.contains(id, operation)
    }

    /// Number of blacklisted operations of `id`.
    pub fn count_blacklist(&self, id: &ConfigurationId) -> usize {
        self.state.read().blacklist.count(id)
    }

    // ------------------------------------------------------------------
    // Dispatch support
    // ------------------------------------------------------------------

    /// Find the implementation serving `operation` under `(id, version)`.
    ///
    /// The blacklist is consulted first, so a blacklisted operation fails
    /// even when no module implements it.
    pub fn route(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
        operation: &OperationId,
    ) -> Result<Implementation, StateError> {
        let state = self.state.read();
        if state.blacklist.contains(id, operation) {
            return Err(StateError::OperationBlacklisted(operation.clone()));
        }
        state
            .configurations
            .snapshot(id, version)?
            .owner(operation)
            .map(Implementation::from)
            .ok_or_else(|| StateError::OperationNotSupported(operation.clone()))
    }
}

fn rejected(operation: &'static str, caller: &CallerId, err: PivotError) -> PivotError {
    emit!(warn, operation, %caller, error = %err, "mutation rejected");
    #[cfg(not(feature = "tracing"))]
    let _ = (operation, caller);
    err
}

/// Builder for constructing a [`Resolver`].
///
/// Defaults: every caller holds every capability, the resolver is never
/// suspended, [`ResolverConfig::default`], no observers.
///
/// # Example
/// ```ignore
/// let resolver = Resolver::builder()
///     .access_control(roles)
///     .suspension(switch.clone())
///     .observer(|event: &RegistryEvent| println!("{event:?}"))
///     .build();
/// ```
pub struct ResolverBuilder {
    access: Arc<dyn AccessControl>,
    suspension: Arc<dyn Suspension>,
    config: ResolverConfig,
    observers: Vec<Arc<dyn Observer>>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    /// Create a builder with the defaults.
    pub fn new() -> Self {
        Self {
            access: Arc::new(AllowAll),
            suspension: Arc::new(NeverSuspended),
            config: ResolverConfig::default(),
            observers: Vec::new(),
        }
    }

    /// Use `access` for capability checks.
    pub fn access_control<A: AccessControl + 'static>(mut self, access: A) -> Self {
        self.access = Arc::new(access);
        self
    }

    /// Use an already shared access-control collaborator.
    pub fn shared_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    /// Use `suspension` for suspension checks.
    pub fn suspension<S: Suspension + 'static>(mut self, suspension: S) -> Self {
        self.suspension = Arc::new(suspension);
        self
    }

    /// Use the given configuration.
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an observer. Observers run in registration order.
    pub fn observer<O: Observer>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Build the resolver.
    pub fn build(self) -> Resolver {
        Resolver {
            state: RwLock::new(ResolverState::default()),
            access: self.access,
            suspension: self.suspension,
            config: self.config,
            observers: self.observers,
        }
    }
}

//! Named, versioned configurations.
//!
//! A configuration selects, for each module key, the implementation a given
//! global version pointed at. Configurations are assembled across one or more
//! batched calls into a per-id accumulator and only become visible when the
//! final call commits the whole working set as the next version.

use super::modules::ModuleRegistry;
use indexmap::IndexMap;
use pivot_core::{
    AccessError, CallerId, ConfigurationId, ConfigurationVersion, GlobalVersion, ModuleHandle,
    ModuleKey, OperationId, Page, PivotError, StateError, ValidationError, VersionStatus,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// One module selected by a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredModule {
    /// The module key.
    pub key: ModuleKey,
    /// The global version the author selected.
    pub global_version: GlobalVersion,
    /// Implementation index that version pointed at.
    pub index: usize,
    /// The implementation itself.
    pub handle: ModuleHandle,
}

/// The implementation serving an operation, or the "none" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Implementation {
    /// Owning module key; zero for the sentinel.
    pub key: ModuleKey,
    /// Implementation index; `0` for the sentinel.
    pub index: usize,
    /// Implementation handle; the sentinel handle when absent.
    pub handle: ModuleHandle,
}

impl Implementation {
    /// The "no implementation" sentinel.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this is the sentinel.
    pub fn is_none(&self) -> bool {
        self.handle.is_none()
    }
}

impl From<&ConfiguredModule> for Implementation {
    fn from(module: &ConfiguredModule) -> Self {
        Self {
            key: module.key.clone(),
            index: module.index,
            handle: module.handle.clone(),
        }
    }
}

/// An immutable, finalized configuration version with its operation table.
#[derive(Debug)]
pub struct ConfigurationSnapshot {
    id: ConfigurationId,
    version: ConfigurationVersion,
    modules: Vec<ConfiguredModule>,
    // Operation -> position in `modules`, in first-declared order.
    operations: IndexMap<OperationId, usize>,
}

impl ConfigurationSnapshot {
    /// Build the operation table, rejecting operations claimed twice.
    fn build(
        id: ConfigurationId,
        version: ConfigurationVersion,
        modules: Vec<ConfiguredModule>,
    ) -> Result<Self, ValidationError> {
        let mut operations: IndexMap<OperationId, usize> = IndexMap::new();
        for (position, module) in modules.iter().enumerate() {
            for operation in module.handle.operations() {
                if let Some(&owner) = operations.get(operation) {
                    // A module listing the same operation twice is not a conflict.
                    if owner == position {
                        continue;
                    }
                    return Err(ValidationError::OperationConflict {
                        operation: operation.clone(),
                        first: modules[owner].key.clone(),
                        second: module.key.clone(),
                    });
                }
                operations.insert(operation.clone(), position);
            }
        }

        Ok(Self {
            id,
            version,
            modules,
            operations,
        })
    }

    /// Configuration name.
    pub fn id(&self) -> &ConfigurationId {
        &self.id
    }

    /// Configuration version.
    pub fn version(&self) -> ConfigurationVersion {
        self.version
    }

    /// Selected modules, in declaration order.
    pub fn modules(&self) -> &[ConfiguredModule] {
        &self.modules
    }

    /// The module owning `operation`.
    pub fn owner(&self, operation: &OperationId) -> Option<&ConfiguredModule> {
        self.operations
            .get(operation)
            .map(|&position| &self.modules[position])
    }

    /// Every resolvable operation, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationId> {
        self.operations.keys()
    }

    /// Number of resolvable operations.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Operations served by `handle` in this configuration.
    pub fn operations_of(&self, handle: &ModuleHandle) -> Vec<OperationId> {
        if handle.is_none() {
            return Vec::new();
        }
        self.operations
            .iter()
            .filter(|&(_, &position)| self.modules[position].handle == *handle)
            .map(|(operation, _)| operation.clone())
            .collect()
    }
}

#[derive(Debug)]
struct PendingBatch {
    owner: CallerId,
    modules: Vec<ConfiguredModule>,
}

/// Outcome of a successful batch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Entries were accumulated; nothing is addressable yet.
    Pending {
        /// Working-set size after the call.
        accumulated: usize,
    },
    /// The working set was committed as this version.
    Finalized {
        /// The new configuration version.
        version: ConfigurationVersion,
        /// Modules in the committed version.
        modules: usize,
    },
}

impl BatchOutcome {
    /// The committed version, if the call finalized.
    pub fn version(&self) -> Option<ConfigurationVersion> {
        match self {
            BatchOutcome::Pending { .. } => None,
            BatchOutcome::Finalized { version, .. } => Some(*version),
        }
    }
}

/// All configurations and their in-progress batches.
///
/// This type holds no lock and performs no capability checks; see
/// [`Resolver`](super::Resolver) for the guarded entry point.
#[derive(Debug, Default)]
pub struct ConfigurationRegistry {
    // committed[id][v - 1] is version v of configuration id.
    committed: IndexMap<ConfigurationId, Vec<Arc<ConfigurationSnapshot>>>,
    pending: HashMap<ConfigurationId, PendingBatch>,
}

impl ConfigurationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries to `id`'s working set and optionally commit it.
    ///
    /// Each entry selects a module key at a global version. The whole call
    /// is validated before anything is appended; on error nothing changes,
    /// including any previously accumulated entries.
    pub fn append(
        &mut self,
        modules: &ModuleRegistry,
        caller: &CallerId,
        id: &ConfigurationId,
        entries: &[(ModuleKey, GlobalVersion)],
        finalize: bool,
    ) -> Result<BatchOutcome, PivotError> {
        if id.is_zero() {
            return Err(ValidationError::ZeroKeyInvalid.into());
        }

        let pending = self.pending.get(id);
        if let Some(batch) = pending {
            if &batch.owner != caller {
                return Err(AccessError::BatchOwnedByOtherCaller {
                    id: id.clone(),
                    owner: batch.owner.clone(),
                }
                .into());
            }
        }

        if entries.is_empty() && !finalize {
            return Err(ValidationError::EmptyBatch.into());
        }

        let accumulated: &[ConfiguredModule] = pending
            .map(|batch| batch.modules.as_slice())
            .unwrap_or_default();
        let resolved = resolve_entries(modules, accumulated, entries)?;

        if !finalize {
            let batch = self
                .pending
                .entry(id.clone())
                .or_insert_with(|| PendingBatch {
                    owner: caller.clone(),
                    modules: Vec::new(),
                });
            batch.modules.extend(resolved);
            return Ok(BatchOutcome::Pending {
                accumulated: batch.modules.len(),
            });
        }

        // Staged entries were checked when appended; their versions may have
        // been deactivated since.
        for module in accumulated {
            ensure_selectable(modules, module.global_version)?;
        }

        let mut working: Vec<ConfiguredModule> = accumulated.to_vec();
        working.extend(resolved);
        if working.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let version = self.latest_version(id) + 1;
        let snapshot = ConfigurationSnapshot::build(id.clone(), version, working)?;
        let module_count = snapshot.modules.len();

        // Commit point: everything below is infallible.
        self.pending.remove(id);
        self.committed
            .entry(id.clone())
            .or_default()
            .push(Arc::new(snapshot));

        Ok(BatchOutcome::Finalized {
            version,
            modules: module_count,
        })
    }

    /// Drop `id`'s working set without touching committed versions.
    ///
    /// Returns the number of discarded entries, `0` if nothing was pending.
    pub fn abandon(&mut self, caller: &CallerId, id: &ConfigurationId) -> Result<usize, AccessError> {
        if let Some(batch) = self.pending.get(id) {
            if &batch.owner != caller {
                return Err(AccessError::BatchOwnedByOtherCaller {
                    id: id.clone(),
                    owner: batch.owner.clone(),
                });
            }
        }
        Ok(self
            .pending
            .remove(id)
            .map_or(0, |batch| batch.modules.len()))
    }

    /// Drop `id`'s working set regardless of who opened it.
    ///
    /// Returns the number of discarded entries, `0` if nothing was pending.
    pub fn force_abandon(&mut self, id: &ConfigurationId) -> usize {
        self.pending.remove(id).map_or(0, |batch| batch.modules.len())
    }

    /// Latest finalized version of `id`; `0` if none.
    pub fn latest_version(&self, id: &ConfigurationId) -> ConfigurationVersion {
        self.committed
            .get(id)
            .map_or(0, |versions| versions.len() as ConfigurationVersion)
    }

    /// A finalized version, if it exists.
    pub fn get(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
    ) -> Option<&Arc<ConfigurationSnapshot>> {
        let slot = usize::try_from(version.checked_sub(1)?).ok()?;
        self.committed.get(id)?.get(slot)
    }

    /// A finalized version, or `ConfigurationVersionDoesNotExist`.
    pub fn snapshot(
        &self,
        id: &ConfigurationId,
        version: ConfigurationVersion,
    ) -> Result<&Arc<ConfigurationSnapshot>, StateError> {
        self.get(id, version)
            .ok_or_else(|| StateError::ConfigurationVersionDoesNotExist {
                id: id.clone(),
                version,
            })
    }

    /// Whether `(id, version)` is a finalized configuration version.
    pub fn contains(&self, id: &ConfigurationId, version: ConfigurationVersion) -> bool {
        self.get(id, version).is_some()
    }

    /// Number of configurations with at least one finalized version.
    pub fn count(&self) -> usize {
        self.committed.len()
    }

    /// Configuration ids in first-finalized order.
    pub fn ids(&self, page: Page) -> Vec<ConfigurationId> {
        page.collect(self.committed.keys().cloned())
    }

    /// Entries accumulated for `id`'s next version.
    pub fn pending_len(&self, id: &ConfigurationId) -> usize {
        self.pending.get(id).map_or(0, |batch| batch.modules.len())
    }
}

/// A global version can be selected only while it exists and is activated.
fn ensure_selectable(modules: &ModuleRegistry, version: GlobalVersion) -> Result<(), StateError> {
    match modules.version_status(version) {
        VersionStatus::None => Err(StateError::VersionDoesNotExist(version)),
        VersionStatus::Deactivated => Err(StateError::VersionDeactivated(version)),
        VersionStatus::Activated => Ok(()),
    }
}

/// Validate one call's entries against the registry and the working set.
fn resolve_entries(
    modules: &ModuleRegistry,
    accumulated: &[ConfiguredModule],
    entries: &[(ModuleKey, GlobalVersion)],
) -> Result<Vec<ConfiguredModule>, PivotError> {
    let mut seen: HashSet<&ModuleKey> = accumulated.iter().map(|module| &module.key).collect();
    let mut resolved = Vec::with_capacity(entries.len());

    for (key, global_version) in entries {
        if key.is_zero() {
            return Err(ValidationError::ZeroKeyInvalid.into());
        }
        if !seen.insert(key) {
            return Err(ValidationError::DuplicateKeyInBatch(key.clone()).into());
        }

        ensure_selectable(modules, *global_version)?;

        let not_in_version = || ValidationError::ModuleNotInVersion {
            key: key.clone(),
            version: *global_version,
        };
        let index = modules
            .index_at(key, *global_version)?
            .ok_or_else(not_in_version)?;
        let handle = modules
            .implementation(key, index)
            .cloned()
            .ok_or_else(not_in_version)?;

        resolved.push(ConfiguredModule {
            key: key.clone(),
            global_version: *global_version,
            index,
            handle,
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoModule;

    fn key(name: &str) -> ModuleKey {
        ModuleKey::new(name)
    }

    fn equity() -> ConfigurationId {
        ConfigurationId::new("Equity")
    }

    fn author() -> CallerId {
        CallerId::new("author")
    }

    /// k1 serves `transfer`, k2 serves `issue`; both registered in version 1.
    fn registry() -> ModuleRegistry {
        let mut modules = ModuleRegistry::new();
        modules
            .register(&[
                (key("k1"), ModuleHandle::new(EchoModule::new("k1", ["transfer"]))),
                (key("k2"), ModuleHandle::new(EchoModule::new("k2", ["issue"]))),
            ])
            .unwrap();
        modules
    }

    #[test]
    fn test_batched_creation_is_invisible_until_finalized() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();

        let outcome = configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap();
        assert_eq!(outcome, BatchOutcome::Pending { accumulated: 1 });
        assert_eq!(outcome.version(), None);
        assert_eq!(configs.latest_version(&equity()), 0);
        assert!(configs.get(&equity(), 1).is_none());

        let outcome = configs
            .append(&modules, &author(), &equity(), &[(key("k2"), 1)], true)
            .unwrap();
        assert_eq!(outcome.version(), Some(1));
        assert_eq!(configs.latest_version(&equity()), 1);
        assert_eq!(configs.pending_len(&equity()), 0);

        let snapshot = configs.snapshot(&equity(), 1).unwrap();
        assert_eq!(snapshot.modules().len(), 2);
        assert_eq!(snapshot.owner(&OperationId::new("issue")).unwrap().key, key("k2"));
    }

    #[test]
    fn test_abandoned_batch_leaves_latest_version_unchanged() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], true)
            .unwrap();

        configs
            .append(&modules, &author(), &equity(), &[(key("k2"), 1)], false)
            .unwrap();
        assert_eq!(configs.abandon(&author(), &equity()), Ok(1));
        assert_eq!(configs.abandon(&author(), &equity()), Ok(0));

        assert_eq!(configs.latest_version(&equity()), 1);
        assert_eq!(configs.snapshot(&equity(), 1).unwrap().modules().len(), 1);
    }

    #[test]
    fn test_versions_increase_by_one() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();

        for expected in 1..=3 {
            let outcome = configs
                .append(&modules, &author(), &equity(), &[(key("k1"), 1)], true)
                .unwrap();
            assert_eq!(outcome.version(), Some(expected));
        }
        assert!(configs.contains(&equity(), 3));
        assert!(!configs.contains(&equity(), 0));
        assert!(!configs.contains(&equity(), 4));
    }

    #[test]
    fn test_invalid_entries_leave_working_set_untouched() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap();

        let err = configs
            .append(
                &modules,
                &author(),
                &equity(),
                &[(key("k2"), 1), (key("missing"), 1)],
                false,
            )
            .unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::ModuleNotInVersion {
                key: key("missing"),
                version: 1
            })
        );

        let err = configs
            .append(&modules, &author(), &equity(), &[(key("k2"), 7)], false)
            .unwrap_err();
        assert_eq!(err.as_state(), Some(&StateError::VersionDoesNotExist(7)));

        let err = configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::DuplicateKeyInBatch(key("k1")))
        );

        assert_eq!(configs.pending_len(&equity()), 1);
    }

    #[test]
    fn test_empty_batches_are_rejected() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();

        let err = configs
            .append(&modules, &author(), &equity(), &[], false)
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyBatch));

        let err = configs
            .append(&modules, &author(), &equity(), &[], true)
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyBatch));

        let err = configs
            .append(&modules, &author(), &ConfigurationId::zero(), &[(key("k1"), 1)], true)
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::ZeroKeyInvalid));
    }

    #[test]
    fn test_finalize_only_call_commits_accumulated_entries() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap();

        let outcome = configs
            .append(&modules, &author(), &equity(), &[], true)
            .unwrap();
        assert_eq!(
            outcome,
            BatchOutcome::Finalized {
                version: 1,
                modules: 1
            }
        );
    }

    #[test]
    fn test_batch_belongs_to_its_opener() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap();

        let intruder = CallerId::new("intruder");
        let err = configs
            .append(&modules, &intruder, &equity(), &[(key("k2"), 1)], true)
            .unwrap_err();
        assert!(matches!(
            err.as_access(),
            Some(AccessError::BatchOwnedByOtherCaller { .. })
        ));
        assert!(configs.abandon(&intruder, &equity()).is_err());

        // Independent ids do not interfere.
        let bond = ConfigurationId::new("Bond");
        let outcome = configs
            .append(&modules, &intruder, &bond, &[(key("k2"), 1)], true)
            .unwrap();
        assert_eq!(outcome.version(), Some(1));
        assert_eq!(configs.pending_len(&equity()), 1);
    }

    #[test]
    fn test_conflicting_operations_fail_at_finalize() {
        let mut modules = ModuleRegistry::new();
        modules
            .register(&[
                (key("k1"), ModuleHandle::new(EchoModule::new("k1", ["transfer"]))),
                (key("k2"), ModuleHandle::new(EchoModule::new("k2", ["transfer"]))),
            ])
            .unwrap();
        let mut configs = ConfigurationRegistry::new();

        let err = configs
            .append(
                &modules,
                &author(),
                &equity(),
                &[(key("k1"), 1), (key("k2"), 1)],
                true,
            )
            .unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::OperationConflict {
                operation: OperationId::new("transfer"),
                first: key("k1"),
                second: key("k2"),
            })
        );
        assert_eq!(configs.latest_version(&equity()), 0);
    }

    #[test]
    fn test_deactivated_version_cannot_be_selected() {
        let mut modules = registry();
        modules.deactivate(1).unwrap();
        let mut configs = ConfigurationRegistry::new();

        let err = configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], true)
            .unwrap_err();
        assert_eq!(err.as_state(), Some(&StateError::VersionDeactivated(1)));
    }

    #[test]
    fn test_staged_entries_are_rechecked_at_finalize() {
        let mut modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], false)
            .unwrap();
        modules.deactivate(1).unwrap();

        let err = configs
            .append(&modules, &author(), &equity(), &[], true)
            .unwrap_err();
        assert_eq!(err.as_state(), Some(&StateError::VersionDeactivated(1)));
        assert_eq!(configs.latest_version(&equity()), 0);
        assert_eq!(configs.pending_len(&equity()), 1);
    }

    #[test]
    fn test_force_abandon_ignores_the_opener() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1), (key("k2"), 1)], false)
            .unwrap();

        assert_eq!(configs.force_abandon(&equity()), 2);
        assert_eq!(configs.force_abandon(&equity()), 0);

        let outcome = configs
            .append(&modules, &CallerId::new("admin"), &equity(), &[(key("k1"), 1)], true)
            .unwrap();
        assert_eq!(outcome.version(), Some(1));
    }

    #[test]
    fn test_entries_pin_the_selected_global_version() {
        let mut modules = registry();
        let old = modules.resolve(&key("k1"), 1).unwrap();
        let k2 = modules.resolve_latest(&key("k2"));
        modules
            .register(&[
                (key("k1"), ModuleHandle::new(EchoModule::new("k1-v2", ["transfer"]))),
                (key("k2"), k2),
            ])
            .unwrap();

        let mut configs = ConfigurationRegistry::new();
        configs
            .append(&modules, &author(), &equity(), &[(key("k1"), 1)], true)
            .unwrap();

        let snapshot = configs.snapshot(&equity(), 1).unwrap();
        let owner = snapshot.owner(&OperationId::new("transfer")).unwrap();
        assert_eq!(owner.handle, old);
        assert_eq!(owner.index, 1);
        assert_eq!(snapshot.operations_of(&old), vec![OperationId::new("transfer")]);
    }

    #[test]
    fn test_configuration_ids_page() {
        let modules = registry();
        let mut configs = ConfigurationRegistry::new();
        for name in ["Equity", "Bond", "Fund"] {
            configs
                .append(&modules, &author(), &ConfigurationId::new(name), &[(key("k1"), 1)], true)
                .unwrap();
        }

        assert_eq!(configs.count(), 3);
        assert_eq!(
            configs.ids(Page::new(1, 2)),
            vec![ConfigurationId::new("Fund")]
        );
        assert!(configs.ids(Page::new(5, 2)).is_empty());
    }
}

//! Append-only registry of module implementations.
//!
//! Implementations live in a per-key arena (index `1..=N`, `0` reserved for
//! "does not exist"). A global version is a generation marker recording, for
//! every key, which arena index was current when the version was created.
//! Nothing is ever removed, so resolving `(key, version)` is stable forever.

use indexmap::IndexMap;
use pivot_core::{
    GlobalVersion, ModuleHandle, ModuleKey, Page, StateError, ValidationError, VersionStatus,
};
use std::collections::{BTreeMap, HashSet};

/// All implementations ever registered under one key.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    key: ModuleKey,
    implementations: Vec<ModuleHandle>,
}

impl ModuleRecord {
    fn new(key: ModuleKey) -> Self {
        Self {
            key,
            implementations: Vec::new(),
        }
    }

    /// The module key.
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    /// Number of implementations (also the highest valid index).
    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    /// Whether no implementation was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }

    /// Implementation at a 1-based index. Index `0` never exists.
    pub fn get(&self, index: usize) -> Option<&ModuleHandle> {
        index
            .checked_sub(1)
            .and_then(|slot| self.implementations.get(slot))
    }

    /// All implementations, oldest first.
    pub fn implementations(&self) -> &[ModuleHandle] {
        &self.implementations
    }

    /// Append `handle` unless it already is the latest implementation, and
    /// return its index.
    fn push(&mut self, handle: ModuleHandle) -> usize {
        if self.implementations.last() != Some(&handle) {
            self.implementations.push(handle);
        }
        self.implementations.len()
    }
}

#[derive(Debug, Clone)]
struct VersionEntry {
    status: VersionStatus,
    snapshot: BTreeMap<ModuleKey, usize>,
}

/// The global, append-only module registry.
///
/// This type holds no lock and performs no access checks; see
/// [`Resolver`](super::Resolver) for the guarded entry point.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: IndexMap<ModuleKey, ModuleRecord>,
    // versions[v - 1] describes global version v.
    versions: Vec<VersionEntry>,
}

impl ModuleRegistry {
    /// Create an empty registry (global version 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest global version; `0` while nothing is registered.
    pub fn latest_version(&self) -> GlobalVersion {
        self.versions.len() as GlobalVersion
    }

    /// Check a registration batch without applying it.
    ///
    /// The batch must be non-empty, free of zero keys, sentinel handles and
    /// duplicates, and must re-declare every key of the latest version.
    pub fn validate(&self, batch: &[(ModuleKey, ModuleHandle)]) -> Result<(), ValidationError> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        let mut seen = HashSet::with_capacity(batch.len());
        for (key, handle) in batch {
            if key.is_zero() {
                return Err(ValidationError::ZeroKeyInvalid);
            }
            if !seen.insert(key) {
                return Err(ValidationError::DuplicateKeyInBatch(key.clone()));
            }
            if handle.is_none() {
                return Err(ValidationError::MissingImplementation(key.clone()));
            }
        }

        if let Some(latest) = self.versions.last() {
            let missing: Vec<ModuleKey> = latest
                .snapshot
                .keys()
                .filter(|key| !seen.contains(key))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::IncompleteKeySet { missing });
            }
        }

        Ok(())
    }

    /// Validate and apply a registration batch, creating the next global
    /// version.
    ///
    /// On error nothing is changed.
    pub fn register(
        &mut self,
        batch: &[(ModuleKey, ModuleHandle)],
    ) -> Result<GlobalVersion, ValidationError> {
        self.validate(batch)?;

        let mut snapshot = BTreeMap::new();
        for (key, handle) in batch {
            let record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| ModuleRecord::new(key.clone()));
            let index = record.push(handle.clone());
            snapshot.insert(key.clone(), index);
        }

        self.versions.push(VersionEntry {
            status: VersionStatus::Activated,
            snapshot,
        });
        Ok(self.latest_version())
    }

    fn entry(&self, version: GlobalVersion) -> Result<&VersionEntry, StateError> {
        version
            .checked_sub(1)
            .and_then(|slot| usize::try_from(slot).ok())
            .and_then(|slot| self.versions.get(slot))
            .ok_or(StateError::VersionDoesNotExist(version))
    }

    fn entry_mut(&mut self, version: GlobalVersion) -> Result<&mut VersionEntry, StateError> {
        version
            .checked_sub(1)
            .and_then(|slot| usize::try_from(slot).ok())
            .and_then(|slot| self.versions.get_mut(slot))
            .ok_or(StateError::VersionDoesNotExist(version))
    }

    /// The implementation index `key` had in `version`.
    ///
    /// `Ok(None)` means the version exists but did not contain the key.
    pub fn index_at(
        &self,
        key: &ModuleKey,
        version: GlobalVersion,
    ) -> Result<Option<usize>, StateError> {
        Ok(self.entry(version)?.snapshot.get(key).copied())
    }

    /// The implementation `key` had in `version`.
    ///
    /// Fails only when the version does not exist; a key absent from the
    /// version yields the sentinel handle.
    pub fn resolve(&self, key: &ModuleKey, version: GlobalVersion) -> Result<ModuleHandle, StateError> {
        Ok(self
            .index_at(key, version)?
            .and_then(|index| self.implementation(key, index))
            .cloned()
            .unwrap_or_default())
    }

    /// The implementation `key` has in the latest version, or the sentinel.
    pub fn resolve_latest(&self, key: &ModuleKey) -> ModuleHandle {
        self.versions
            .last()
            .and_then(|latest| latest.snapshot.get(key))
            .and_then(|&index| self.implementation(key, index))
            .cloned()
            .unwrap_or_default()
    }

    /// Implementation at `(key, index)`.
    pub fn implementation(&self, key: &ModuleKey, index: usize) -> Option<&ModuleHandle> {
        self.records.get(key).and_then(|record| record.get(index))
    }

    /// Status of a version; [`VersionStatus::None`] if it was never created.
    pub fn version_status(&self, version: GlobalVersion) -> VersionStatus {
        self.entry(version)
            .map(|entry| entry.status)
            .unwrap_or(VersionStatus::None)
    }

    /// Soft-disable a version. Returns `false` if it already was deactivated.
    pub fn deactivate(&mut self, version: GlobalVersion) -> Result<bool, StateError> {
        let entry = self.entry_mut(version)?;
        let changed = entry.status != VersionStatus::Deactivated;
        entry.status = VersionStatus::Deactivated;
        Ok(changed)
    }

    /// Number of distinct module keys ever registered.
    pub fn count_modules(&self) -> usize {
        self.records.len()
    }

    /// Module keys in first-registration order.
    pub fn module_keys(&self, page: Page) -> Vec<ModuleKey> {
        page.collect(self.records.keys().cloned())
    }

    /// The record of one key.
    pub fn record(&self, key: &ModuleKey) -> Option<&ModuleRecord> {
        self.records.get(key)
    }
}

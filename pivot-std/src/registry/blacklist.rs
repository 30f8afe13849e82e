//! Live, unversioned operation blacklists.
//!
//! A blacklist entry suppresses an operation for every dispatcher pinned to
//! the configuration, whatever version it is pinned to, until it is removed.

use indexmap::{IndexMap, IndexSet};
use pivot_core::{ConfigurationId, OperationId, Page, ValidationError};

/// Per-configuration sets of suppressed operations, in insertion order.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: IndexMap<ConfigurationId, IndexSet<OperationId>>,
}

impl Blacklist {
    /// Create an empty blacklist.
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(id: &ConfigurationId, operations: &[OperationId]) -> Result<(), ValidationError> {
        if id.is_zero() || operations.iter().any(OperationId::is_zero) {
            return Err(ValidationError::ZeroKeyInvalid);
        }
        Ok(())
    }

    /// Blacklist `operations` for `id`.
    ///
    /// Returns the operations that were not blacklisted before; entries
    /// already present are skipped silently.
    pub fn add(
        &mut self,
        id: &ConfigurationId,
        operations: &[OperationId],
    ) -> Result<Vec<OperationId>, ValidationError> {
        Self::validate(id, operations)?;
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let set = self.entries.entry(id.clone()).or_default();
        Ok(operations
            .iter()
            .filter(|&operation| set.insert(operation.clone()))
            .cloned()
            .collect())
    }

    /// Remove `operations` from `id`'s blacklist.
    ///
    /// Returns the operations that actually were blacklisted; absent entries
    /// are skipped silently.
    pub fn remove(
        &mut self,
        id: &ConfigurationId,
        operations: &[OperationId],
    ) -> Result<Vec<OperationId>, ValidationError> {
        Self::validate(id, operations)?;
        let Some(set) = self.entries.get_mut(id) else {
            return Ok(Vec::new());
        };

        let removed = operations
            .iter()
            .filter(|&operation| set.shift_remove(operation))
            .cloned()
            .collect();
        if set.is_empty() {
            self.entries.shift_remove(id);
        }
        Ok(removed)
    }

    /// Whether `operation` is blacklisted for `id`.
    pub fn contains(&self, id: &ConfigurationId, operation: &OperationId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|set| set.contains(operation))
    }

    /// Blacklisted operations of `id`, in insertion order.
    pub fn list(&self, id: &ConfigurationId, page: Page) -> Vec<OperationId> {
        self.entries
            .get(id)
            .map(|set| page.collect(set.iter().cloned()))
            .unwrap_or_default()
    }

    /// Number of blacklisted operations of `id`.
    pub fn count(&self, id: &ConfigurationId) -> usize {
        self.entries.get(id).map_or(0, IndexSet::len)
    }
}

//! In-memory entity storage.

use parking_lot::RwLock;
use pivot_core::Storage;
use std::collections::BTreeMap;

/// A [`Storage`] backed by an ordered in-memory map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Copy of every slot, in key order.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.slots.read().clone()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, slot: &str) -> Option<Vec<u8>> {
        self.slots.read().get(slot).cloned()
    }

    fn store(&self, slot: &str, value: Vec<u8>) {
        self.slots.write().insert(slot.to_owned(), value);
    }

    fn remove(&self, slot: &str) -> Option<Vec<u8>> {
        self.slots.write().remove(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_store_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.store("balance", vec![1, 2]);
        assert_eq!(storage.load("balance"), Some(vec![1, 2]));
        assert_eq!(storage.len(), 1);

        assert_eq!(storage.remove("balance"), Some(vec![1, 2]));
        assert_eq!(storage.load("balance"), None);
    }
}

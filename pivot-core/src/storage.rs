//! Entity storage seen by modules.

use std::sync::Arc;

/// The persistent slot store owned by a stateful entity.
///
/// Modules receive a `&dyn Storage` on every invocation and keep all durable
/// state here. Because the store belongs to the entity and not to the module,
/// swapping the module implementation behind a dispatcher never requires a
/// data migration.
pub trait Storage: Send + Sync {
    /// Read a slot.
    fn load(&self, slot: &str) -> Option<Vec<u8>>;

    /// Write a slot, replacing any previous value.
    fn store(&self, slot: &str, value: Vec<u8>);

    /// Clear a slot, returning the previous value.
    fn remove(&self, slot: &str) -> Option<Vec<u8>>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn load(&self, slot: &str) -> Option<Vec<u8>> {
        (**self).load(slot)
    }

    fn store(&self, slot: &str, value: Vec<u8>) {
        (**self).store(slot, value);
    }

    fn remove(&self, slot: &str) -> Option<Vec<u8>> {
        (**self).remove(slot)
    }
}

//! Standard access-control and suspension collaborators.

use parking_lot::RwLock;
use pivot_core::{AccessControl, CallerId, Capability, Suspension};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Grants every capability to every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn has_capability(&self, _caller: &CallerId, _capability: Capability) -> bool {
        true
    }
}

/// Refuses every capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessControl for DenyAll {
    fn has_capability(&self, _caller: &CallerId, _capability: Capability) -> bool {
        false
    }
}

/// Caller → capability table, editable at runtime.
///
/// # Example
/// ```ignore
/// let roles = RoleTable::new()
///     .with_grant("admin", Capability::all())
///     .with_grant("ops", Capability::BLACKLIST_OPERATOR);
/// roles.revoke(&CallerId::new("ops"), Capability::BLACKLIST_OPERATOR);
/// ```
#[derive(Debug, Default)]
pub struct RoleTable {
    grants: RwLock<HashMap<CallerId, Capability>>,
}

impl RoleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant capabilities (builder version).
    pub fn with_grant(self, caller: impl Into<CallerId>, capability: Capability) -> Self {
        self.grant(caller.into(), capability);
        self
    }

    /// Add `capability` to the caller's grants.
    pub fn grant(&self, caller: CallerId, capability: Capability) {
        *self.grants.write().entry(caller).or_insert(Capability::empty()) |= capability;
    }

    /// Remove `capability` from the caller's grants.
    pub fn revoke(&self, caller: &CallerId, capability: Capability) {
        let mut grants = self.grants.write();
        if let Some(held) = grants.get_mut(caller) {
            held.remove(capability);
            if held.is_empty() {
                grants.remove(caller);
            }
        }
    }

    /// Everything the caller currently holds.
    pub fn capabilities(&self, caller: &CallerId) -> Capability {
        self.grants
            .read()
            .get(caller)
            .copied()
            .unwrap_or(Capability::empty())
    }
}

impl AccessControl for RoleTable {
    fn has_capability(&self, caller: &CallerId, capability: Capability) -> bool {
        self.capabilities(caller).contains(capability)
    }
}

/// Never suspended.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSuspended;

impl Suspension for NeverSuspended {
    fn is_suspended(&self) -> bool {
        false
    }
}

/// A shared switch for suspending and resuming at runtime.
///
/// Clones share the same state, so one clone can be handed to a resolver
/// while another stays with the operator.
#[derive(Debug, Clone, Default)]
pub struct SuspensionSwitch(Arc<AtomicBool>);

impl SuspensionSwitch {
    /// Create a switch with the given initial state.
    pub fn new(suspended: bool) -> Self {
        Self(Arc::new(AtomicBool::new(suspended)))
    }

    /// Start refusing mutations.
    pub fn suspend(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Accept mutations again.
    pub fn resume(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Set the state explicitly.
    pub fn set(&self, suspended: bool) {
        self.0.store(suspended, Ordering::Release);
    }
}

impl Suspension for SuspensionSwitch {
    fn is_suspended(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

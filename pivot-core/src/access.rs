//! Access-control and suspension collaborators.
//!
//! Both are implemented outside this crate; the registry and dispatcher only
//! consult them before every mutation.

use crate::id::CallerId;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Capabilities checked before privileged operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capability: u8 {
        /// Register module implementations and (de)activate global versions.
        const REGISTRY_ADMIN = 1;
        /// Create, extend and finalize configurations.
        const CONFIGURATION_AUTHOR = 1 << 1;
        /// Add or remove blacklisted operations.
        const BLACKLIST_OPERATOR = 1 << 2;
        /// Repoint a dispatcher to another resolver, configuration or version.
        const DISPATCHER_OPERATOR = 1 << 3;
        /// Every capability.
        const ALL = Self::REGISTRY_ADMIN.bits()
            | Self::CONFIGURATION_AUTHOR.bits()
            | Self::BLACKLIST_OPERATOR.bits()
            | Self::DISPATCHER_OPERATOR.bits();
    }
}

/// Answers whether a caller holds a capability.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as an access-control collaborator",
    label = "missing `AccessControl` implementation"
)]
pub trait AccessControl: Send + Sync {
    /// Whether `caller` holds every flag in `capability`.
    fn has_capability(&self, caller: &CallerId, capability: Capability) -> bool;
}

/// Reports whether the subsystem is currently suspended.
pub trait Suspension: Send + Sync {
    /// `true` while mutations must be refused.
    fn is_suspended(&self) -> bool;
}

impl<T: AccessControl + ?Sized> AccessControl for Arc<T> {
    fn has_capability(&self, caller: &CallerId, capability: Capability) -> bool {
        (**self).has_capability(caller, capability)
    }
}

impl<T: Suspension + ?Sized> Suspension for Arc<T> {
    fn is_suspended(&self) -> bool {
        (**self).is_suspended()
    }
}

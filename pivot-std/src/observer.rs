//! Change notifications.
//!
//! Every successful mutation produces one [`RegistryEvent`]. Events are
//! delivered after the change is committed and after the write lock has been
//! released, to every [`Observer`] in registration order. Rejected mutations
//! produce no event.

use crate::dispatcher::ConfigInfo;
use pivot_core::{
    CallerId, ConfigurationId, ConfigurationVersion, GlobalVersion, ModuleHandle, ModuleKey,
    OperationId,
};
use std::sync::Arc;

/// A committed change.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A registration batch produced a new global version.
    ModulesRegistered {
        /// Who registered.
        caller: CallerId,
        /// The new global version.
        version: GlobalVersion,
        /// The full batch, in submission order.
        batch: Vec<(ModuleKey, ModuleHandle)>,
    },
    /// A global version was soft-disabled.
    VersionDeactivated {
        /// Who deactivated it.
        caller: CallerId,
        /// The deactivated version.
        version: GlobalVersion,
    },
    /// Entries were appended to an in-progress configuration batch.
    ConfigurationBatchAppended {
        /// Batch owner.
        caller: CallerId,
        /// Configuration name.
        id: ConfigurationId,
        /// Entries of this call.
        entries: Vec<(ModuleKey, GlobalVersion)>,
        /// Size of the working set after this call.
        accumulated: usize,
    },
    /// A configuration batch was committed as a new version.
    ConfigurationFinalized {
        /// Batch owner.
        caller: CallerId,
        /// Configuration name.
        id: ConfigurationId,
        /// The new configuration version.
        version: ConfigurationVersion,
        /// Number of modules in the committed version.
        modules: usize,
    },
    /// An in-progress configuration batch was dropped.
    ConfigurationBatchAbandoned {
        /// Who abandoned it.
        caller: CallerId,
        /// Configuration name.
        id: ConfigurationId,
        /// Entries that were discarded.
        discarded: usize,
    },
    /// Operations were added to a configuration's blacklist.
    OperationsBlacklisted {
        /// Operator.
        caller: CallerId,
        /// Configuration name.
        id: ConfigurationId,
        /// Operations that were not blacklisted before.
        operations: Vec<OperationId>,
    },
    /// Operations were removed from a configuration's blacklist.
    OperationsUnblacklisted {
        /// Operator.
        caller: CallerId,
        /// Configuration name.
        id: ConfigurationId,
        /// Operations that were blacklisted before.
        operations: Vec<OperationId>,
    },
    /// A dispatcher was repointed.
    DispatcherRepointed {
        /// Operator.
        caller: CallerId,
        /// State before the change; `None` on initialization.
        before: Option<ConfigInfo>,
        /// State after the change.
        after: ConfigInfo,
    },
}

/// Receives [`RegistryEvent`]s.
///
/// Closures of type `Fn(&RegistryEvent)` are observers too.
pub trait Observer: Send + Sync + 'static {
    /// Called once per committed change.
    fn on_event(&self, event: &RegistryEvent);
}

impl<F> Observer for F
where
    F: Fn(&RegistryEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &RegistryEvent) {
        (self)(event)
    }
}

/// Deliver `event` to every observer, in order.
pub(crate) fn notify(observers: &[Arc<dyn Observer>], event: RegistryEvent) {
    for observer in observers {
        observer.on_event(&event);
    }
}

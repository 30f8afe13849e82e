//! Per-entity dispatch.
//!
//! A [`Dispatcher`] is the thin front of one entity. It owns the entity's
//! [`Storage`] and a pointer to `(resolver, configuration id, configuration
//! version)`, and forwards every call to whichever module the pinned
//! configuration version assigns the operation to.
//!
//! Upgrading an entity means repointing its dispatcher; storage is never
//! touched or migrated by a repoint.

mod introspection;

use crate::{
    collaborators::{AllowAll, NeverSuspended},
    observer::{Observer, RegistryEvent, notify},
    registry::Resolver,
    storage::MemoryStorage,
};
use parking_lot::RwLock;
use pivot_core::{
    AccessControl, AccessError, Calldata, CallerId, Capability, ConfigurationId,
    ConfigurationVersion, OperationId, PivotError, StateError, Storage, Suspension,
};
use std::{fmt, sync::Arc};

/// What a dispatcher is pinned to.
#[derive(Clone)]
pub struct ConfigInfo {
    /// The resolver the dispatcher trusts.
    pub resolver: Arc<Resolver>,
    /// Pinned configuration.
    pub configuration_id: ConfigurationId,
    /// Pinned configuration version.
    pub configuration_version: ConfigurationVersion,
}

impl ConfigInfo {
    /// Pin to `(resolver, id, version)`.
    pub fn new(
        resolver: Arc<Resolver>,
        configuration_id: impl Into<ConfigurationId>,
        configuration_version: ConfigurationVersion,
    ) -> Self {
        Self {
            resolver,
            configuration_id: configuration_id.into(),
            configuration_version,
        }
    }

    fn ensure_exists(&self) -> Result<(), StateError> {
        if self
            .resolver
            .is_configuration_version(&self.configuration_id, self.configuration_version)
        {
            Ok(())
        } else {
            Err(StateError::ConfigurationVersionDoesNotExist {
                id: self.configuration_id.clone(),
                version: self.configuration_version,
            })
        }
    }
}

// Resolvers compare by identity.
impl PartialEq for ConfigInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resolver, &other.resolver)
            && self.configuration_id == other.configuration_id
            && self.configuration_version == other.configuration_version
    }
}

impl Eq for ConfigInfo {}

impl fmt::Debug for ConfigInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigInfo")
            .field("resolver", &Arc::as_ptr(&self.resolver))
            .field("configuration_id", &self.configuration_id)
            .field("configuration_version", &self.configuration_version)
            .finish()
    }
}

enum Repoint {
    Initialize(ConfigInfo),
    Version(ConfigurationVersion),
    Config(ConfigurationId, ConfigurationVersion),
    Resolver(ConfigInfo),
}

impl Repoint {
    fn label(&self) -> &'static str {
        match self {
            Repoint::Initialize(_) => "initialize",
            Repoint::Version(_) => "update_config_version",
            Repoint::Config(..) => "update_config",
            Repoint::Resolver(_) => "update_resolver",
        }
    }
}

/// The dispatch front of one entity.
///
/// Starts uninitialized; the first repoint pins resolver, configuration id
/// and version together.
///
/// # Example
/// ```ignore
/// let dispatcher = Dispatcher::builder().build();
/// dispatcher.initialize(&operator, resolver.clone(), "Equity", 1)?;
/// let reply = dispatcher.dispatch(&"transfer".into(), args).await?;
/// ```
pub struct Dispatcher<S: Storage = MemoryStorage> {
    state: RwLock<Option<ConfigInfo>>,
    storage: S,
    access: Arc<dyn AccessControl>,
    suspension: Arc<dyn Suspension>,
    observers: Vec<Arc<dyn Observer>>,
}

impl Dispatcher<MemoryStorage> {
    /// Start building a dispatcher backed by [`MemoryStorage`].
    pub fn builder() -> DispatcherBuilder<MemoryStorage> {
        DispatcherBuilder::new()
    }
}

impl Default for Dispatcher<MemoryStorage> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<S: Storage + fmt::Debug> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &*self.state.read())
            .field("storage", &self.storage)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<S: Storage> Dispatcher<S> {
    /// The entity's own storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Current pin, or `None` while uninitialized.
    pub fn config_info(&self) -> Option<ConfigInfo> {
        self.state.read().clone()
    }

    /// Whether the dispatcher has been pinned.
    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// First repoint: pin `(resolver, id, version)`.
    ///
    /// Fails with `AlreadyInitialized` once pinned.
    pub fn initialize(
        &self,
        caller: &CallerId,
        resolver: Arc<Resolver>,
        configuration_id: impl Into<ConfigurationId>,
        configuration_version: ConfigurationVersion,
    ) -> Result<(), PivotError> {
        let target = ConfigInfo::new(resolver, configuration_id, configuration_version);
        self.repoint(caller, Repoint::Initialize(target))
    }

    /// Move to another version of the pinned configuration.
    pub fn update_config_version(
        &self,
        caller: &CallerId,
        configuration_version: ConfigurationVersion,
    ) -> Result<(), PivotError> {
        self.repoint(caller, Repoint::Version(configuration_version))
    }

    /// Move to another configuration of the pinned resolver.
    pub fn update_config(
        &self,
        caller: &CallerId,
        configuration_id: impl Into<ConfigurationId>,
        configuration_version: ConfigurationVersion,
    ) -> Result<(), PivotError> {
        self.repoint(
            caller,
            Repoint::Config(configuration_id.into(), configuration_version),
        )
    }

    /// Move to another resolver. Also initializes an unpinned dispatcher.
    pub fn update_resolver(
        &self,
        caller: &CallerId,
        resolver: Arc<Resolver>,
        configuration_id: impl Into<ConfigurationId>,
        configuration_version: ConfigurationVersion,
    ) -> Result<(), PivotError> {
        let target = ConfigInfo::new(resolver, configuration_id, configuration_version);
        self.repoint(caller, Repoint::Resolver(target))
    }

    fn guard(&self, caller: &CallerId) -> Result<(), AccessError> {
        if !self
            .access
            .has_capability(caller, Capability::DISPATCHER_OPERATOR)
        {
            return Err(AccessError::NotAuthorized {
                caller: caller.clone(),
                capability: Capability::DISPATCHER_OPERATOR,
            });
        }
        if self.suspension.is_suspended() {
            return Err(AccessError::Suspended);
        }
        Ok(())
    }

    fn repoint(&self, caller: &CallerId, repoint: Repoint) -> Result<(), PivotError> {
        let label = repoint.label();
        let result = self
            .guard(caller)
            .map_err(PivotError::from)
            .and_then(|()| {
                let mut state = self.state.write();
                let after = match (&*state, repoint) {
                    (Some(_), Repoint::Initialize(_)) => {
                        return Err(AccessError::AlreadyInitialized.into());
                    }
                    (None, Repoint::Version(_) | Repoint::Config(..)) => {
                        return Err(StateError::NotConfigured.into());
                    }
                    (None, Repoint::Initialize(target)) | (_, Repoint::Resolver(target)) => target,
                    (Some(current), Repoint::Version(version)) => ConfigInfo {
                        resolver: current.resolver.clone(),
                        configuration_id: current.configuration_id.clone(),
                        configuration_version: version,
                    },
                    (Some(current), Repoint::Config(id, version)) => ConfigInfo {
                        resolver: current.resolver.clone(),
                        configuration_id: id,
                        configuration_version: version,
                    },
                };
                after.ensure_exists()?;
                let before = state.replace(after.clone());
                Ok((before, after))
            });

        match result {
            Ok((before, after)) => {
                emit!(info, %caller, operation = label, ?before, ?after, "dispatcher repointed");
                notify(
                    &self.observers,
                    RegistryEvent::DispatcherRepointed {
                        caller: caller.clone(),
                        before,
                        after,
                    },
                );
                Ok(())
            }
            Err(err) => {
                emit!(warn, %caller, operation = label, error = %err, "repoint rejected");
                #[cfg(not(feature = "tracing"))]
                let _ = label;
                Err(err)
            }
        }
    }

    /// Forward `operation` to the module the pinned configuration assigns it.
    ///
    /// The module runs against this dispatcher's storage; its reply or error
    /// is returned unchanged. No lock is held while the module runs.
    pub async fn dispatch(
        &self,
        operation: &OperationId,
        args: Calldata,
    ) -> Result<Calldata, PivotError> {
        let info = self.config_info().ok_or(StateError::NotConfigured)?;
        let target = info.resolver.route(
            &info.configuration_id,
            info.configuration_version,
            operation,
        )?;

        emit!(
            debug,
            %operation,
            configuration = %info.configuration_id,
            version = info.configuration_version,
            key = %target.key,
            index = target.index,
            "dispatching"
        );

        let module = target
            .handle
            .module()
            .ok_or_else(|| StateError::OperationNotSupported(operation.clone()))?;
        module
            .invoke_dyn(&self.storage, operation, args)
            .await
            .map_err(PivotError::Module)
    }
}

/// Builder for constructing a [`Dispatcher`].
///
/// Defaults: [`MemoryStorage`], every caller holds every capability, never
/// suspended, no observers.
pub struct DispatcherBuilder<S: Storage = MemoryStorage> {
    storage: S,
    access: Arc<dyn AccessControl>,
    suspension: Arc<dyn Suspension>,
    observers: Vec<Arc<dyn Observer>>,
}

impl Default for DispatcherBuilder<MemoryStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder<MemoryStorage> {
    /// Create a builder with the defaults.
    pub fn new() -> Self {
        Self {
            storage: MemoryStorage::new(),
            access: Arc::new(AllowAll),
            suspension: Arc::new(NeverSuspended),
            observers: Vec::new(),
        }
    }
}

impl<S: Storage> DispatcherBuilder<S> {
    /// Use `storage` as the entity's store.
    pub fn storage<T: Storage>(self, storage: T) -> DispatcherBuilder<T> {
        DispatcherBuilder {
            storage,
            access: self.access,
            suspension: self.suspension,
            observers: self.observers,
        }
    }

    /// Use `access` for repoint authorization.
    pub fn access_control<A: AccessControl + 'static>(mut self, access: A) -> Self {
        self.access = Arc::new(access);
        self
    }

    /// Use an already shared access-control collaborator.
    pub fn shared_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    /// Use `suspension` for repoint suspension checks.
    pub fn suspension<T: Suspension + 'static>(mut self, suspension: T) -> Self {
        self.suspension = Arc::new(suspension);
        self
    }

    /// Register an observer for repoint events.
    pub fn observer<O: Observer>(mut self, observer: O) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Build the dispatcher, uninitialized.
    pub fn build(self) -> Dispatcher<S> {
        Dispatcher {
            state: RwLock::new(None),
            storage: self.storage,
            access: self.access,
            suspension: self.suspension,
            observers: self.observers,
        }
    }
}

//! # Logic modules
//!
//! A module implements a fixed, enumerable set of operations. It is invoked
//! with the entity's storage, the operation being called and its arguments,
//! and must not keep private mutable state between calls.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Module`] uses native `async fn` for zero-cost static dispatch. Registries
//! store implementations behind the object-safe [`DynModule`], which every
//! `Module` implements automatically.

use crate::{calldata::Calldata, error::BoxError, id::OperationId, storage::Storage};
use futures::future::BoxFuture;
use std::{
    fmt,
    future::Future,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A stateless implementation of a set of operations.
///
/// # Example
///
/// ```rust,ignore
/// struct Greeter;
///
/// impl Module for Greeter {
///     fn name(&self) -> &str {
///         "greeter"
///     }
///
///     fn operations(&self) -> Vec<OperationId> {
///         vec![OperationId::new("greet")]
///     }
///
///     async fn invoke(
///         &self,
///         _storage: &dyn Storage,
///         _operation: &OperationId,
///         args: Calldata,
///     ) -> Result<Calldata, BoxError> {
///         Ok(args)
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a logic module",
    label = "missing `Module` implementation",
    note = "Implement `Module` or annotate an impl block with `#[pivot::logic_module]`."
)]
pub trait Module: Send + Sync + 'static {
    /// Human-readable name used in logs and introspection.
    fn name(&self) -> &str;

    /// The operations this module implements.
    ///
    /// Must return the same set on every call.
    fn operations(&self) -> Vec<OperationId>;

    /// Execute `operation` against the entity's storage.
    fn invoke(
        &self,
        storage: &dyn Storage,
        operation: &OperationId,
        args: Calldata,
    ) -> impl Future<Output = Result<Calldata, BoxError>> + Send;
}

/// Object-safe version of [`Module`].
pub trait DynModule: Send + Sync + 'static {
    /// See [`Module::name`].
    fn name_dyn(&self) -> &str;

    /// See [`Module::operations`].
    fn operations_dyn(&self) -> Vec<OperationId>;

    /// See [`Module::invoke`] (dynamic dispatch version).
    fn invoke_dyn<'a>(
        &'a self,
        storage: &'a dyn Storage,
        operation: &'a OperationId,
        args: Calldata,
    ) -> BoxFuture<'a, Result<Calldata, BoxError>>;
}

impl<T: Module> DynModule for T {
    fn name_dyn(&self) -> &str {
        Module::name(self)
    }

    fn operations_dyn(&self) -> Vec<OperationId> {
        Module::operations(self)
    }

    fn invoke_dyn<'a>(
        &'a self,
        storage: &'a dyn Storage,
        operation: &'a OperationId,
        args: Calldata,
    ) -> BoxFuture<'a, Result<Calldata, BoxError>> {
        Box::pin(Module::invoke(self, storage, operation, args))
    }
}

/// Opaque reference to one deployed module implementation.
///
/// Handles compare by identity: two handles are equal only if they point at
/// the same deployed instance. The default handle is the "no implementation"
/// sentinel returned by lookups that find nothing.
///
/// The operation list is read once, when the handle is created; registries
/// only ever consult that recorded list.
#[derive(Clone, Default)]
pub struct ModuleHandle(Option<Deployed>);

#[derive(Clone)]
struct Deployed {
    module: Arc<dyn DynModule>,
    operations: Arc<[OperationId]>,
}

impl Deployed {
    fn new(module: Arc<dyn DynModule>) -> Self {
        let operations = module.operations_dyn().into();
        Self { module, operations }
    }
}

impl ModuleHandle {
    /// Deploy a module and return a handle to it.
    pub fn new<M: Module>(module: M) -> Self {
        let module: Arc<dyn DynModule> = Arc::new(module);
        Self::from_arc(module)
    }

    /// Wrap an already shared implementation.
    pub fn from_arc(module: Arc<dyn DynModule>) -> Self {
        Self(Some(Deployed::new(module)))
    }

    /// The "no implementation" sentinel.
    pub const fn none() -> Self {
        Self(None)
    }

    /// Whether this is the sentinel.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Whether this points at an implementation.
    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// The implementation, if any.
    pub fn module(&self) -> Option<&Arc<dyn DynModule>> {
        self.0.as_ref().map(|deployed| &deployed.module)
    }

    /// Module name, or `"<none>"` for the sentinel.
    pub fn name(&self) -> &str {
        self.0
            .as_ref()
            .map_or("<none>", |deployed| deployed.module.name_dyn())
    }

    /// Operations recorded when the handle was created; empty for the sentinel.
    pub fn operations(&self) -> &[OperationId] {
        match &self.0 {
            Some(deployed) => &deployed.operations[..],
            None => &[],
        }
    }

    /// Identity of the deployed instance; `0` for the sentinel.
    pub fn address(&self) -> usize {
        match &self.0 {
            Some(deployed) => Arc::as_ptr(&deployed.module) as *const () as usize,
            None => 0,
        }
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ModuleHandle {}

impl Hash for ModuleHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "ModuleHandle({}@{:#x})", self.name(), self.address()),
            None => f.write_str("ModuleHandle(<none>)"),
        }
    }
}

impl<M: Module> From<Arc<M>> for ModuleHandle {
    fn from(module: Arc<M>) -> Self {
        let module: Arc<dyn DynModule> = module;
        Self::from_arc(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Module for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn operations(&self) -> Vec<OperationId> {
            vec![OperationId::new("noop")]
        }

        async fn invoke(
            &self,
            _storage: &dyn Storage,
            _operation: &OperationId,
            args: Calldata,
        ) -> Result<Calldata, BoxError> {
            Ok(args)
        }
    }

    #[test]
    fn test_handles_compare_by_identity() {
        let a = ModuleHandle::new(Noop);
        let b = ModuleHandle::new(Noop);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_sentinel_handle() {
        let none = ModuleHandle::none();
        assert!(none.is_none());
        assert_eq!(none.address(), 0);
        assert_eq!(none.name(), "<none>");
        assert!(none.operations().is_empty());
        assert_eq!(none, ModuleHandle::default());
    }

    #[test]
    fn test_handle_exposes_module_metadata() {
        let handle = ModuleHandle::new(Noop);
        assert_eq!(handle.name(), "noop");
        assert_eq!(handle.operations(), [OperationId::new("noop")]);
    }

    #[test]
    fn test_operations_are_read_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Listing(Arc<AtomicUsize>);

        impl Module for Listing {
            fn name(&self) -> &str {
                "listing"
            }

            fn operations(&self) -> Vec<OperationId> {
                self.0.fetch_add(1, Ordering::SeqCst);
                vec![OperationId::new("list")]
            }

            async fn invoke(
                &self,
                _storage: &dyn Storage,
                _operation: &OperationId,
                args: Calldata,
            ) -> Result<Calldata, BoxError> {
                Ok(args)
            }
        }

        let reads = Arc::new(AtomicUsize::new(0));
        let handle = ModuleHandle::new(Listing(reads.clone()));
        let clone = handle.clone();
        assert_eq!(handle.operations(), [OperationId::new("list")]);
        assert_eq!(clone.operations(), [OperationId::new("list")]);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}

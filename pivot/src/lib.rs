//! # pivot - Versioned Logic Modules with Per-Entity Dispatch
//!
//! `pivot` lets many entities share a library of deployed logic modules and
//! upgrade independently. Modules are registered into a versioned registry,
//! assembled into named, versioned configurations, and every entity's
//! [`Dispatcher`] forwards calls to whatever module its pinned configuration
//! version assigns the operation to. Upgrading an entity is a repoint; its
//! storage stays where it is.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pivot::prelude::*;
//!
//! let admin = CallerId::new("admin");
//! let resolver = Arc::new(Resolver::default());
//!
//! // Register v1 of the "transfers" key and publish it as Equity v1.
//! resolver.register_modules(&admin, vec![("transfers".into(), ModuleHandle::new(TransfersV1))])?;
//! resolver.create_configuration_batch(&admin, &"Equity".into(), vec![("transfers".into(), 1)], true)?;
//!
//! // Pin an entity to Equity v1 and call it.
//! let token = Dispatcher::default();
//! token.initialize(&admin, resolver.clone(), "Equity", 1)?;
//! let reply = token.dispatch(&"transfer".into(), args).await?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use pivot_core::{
    // Access
    AccessControl,
    // Errors
    AccessError,
    BoxError,
    // Data
    Calldata,
    // Identifiers
    CallerId,
    Capability,
    ConfigurationId,
    ConfigurationVersion,
    // Modules
    DynModule,
    ErrorKind,
    GlobalVersion,
    Module,
    ModuleHandle,
    ModuleKey,
    OperationId,
    Page,
    PivotError,
    StateError,
    Storage,
    Suspension,
    ValidationError,
    VersionStatus,
};

// Registry
pub use pivot_std::registry::{
    BatchOutcome, Blacklist, ConfigurationRegistry, ConfigurationSnapshot, ConfiguredModule,
    Implementation, ModuleRecord, ModuleRegistry, Resolver, ResolverBuilder,
};

// Dispatch
pub use pivot_std::dispatcher::{ConfigInfo, Dispatcher, DispatcherBuilder};

// Ambient
pub use pivot_std::{
    config::{DEFAULT_MAX_BATCH_LEN, ResolverConfig},
    observer::{Observer, RegistryEvent},
    storage::MemoryStorage,
};

#[cfg(feature = "macros")]
pub use pivot_macros::logic_module;

/// Standard access-control and suspension collaborators.
pub mod collaborators {
    #![allow(clippy::wildcard_imports)]
    pub use pivot_std::collaborators::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use pivot_std::testing::*;
}

/// Prelude module - common imports for Pivot.
///
/// # Usage
///
/// ```rust,ignore
/// use pivot::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        BoxError,
        // Data
        Calldata,
        // Identifiers
        CallerId,
        Capability,
        ConfigurationId,
        // Dispatch
        Dispatcher,
        // Modules
        Module,
        ModuleHandle,
        ModuleKey,
        OperationId,
        Page,
        PivotError,
        // Registry
        Resolver,
        Storage,
    };

    #[cfg(feature = "macros")]
    pub use crate::logic_module;

    pub use std::sync::Arc;
}

//! # pivot-std
//!
//! Standard in-process implementation of the Pivot module registry and
//! dispatcher.
//!
//! This crate provides:
//! - **Registry**: [`ModuleRegistry`], [`ConfigurationRegistry`], [`Blacklist`]
//!   and the guarded [`Resolver`] that combines them
//! - **Dispatch**: [`Dispatcher`], the per-entity pointer and forwarding path
//! - **Collaborators**: [`AllowAll`], [`RoleTable`], [`SuspensionSwitch`]
//! - **Storage**: [`MemoryStorage`]
//! - **Observation**: [`Observer`] and [`RegistryEvent`]
//!
//! [`ModuleRegistry`]: registry::ModuleRegistry
//! [`ConfigurationRegistry`]: registry::ConfigurationRegistry
//! [`Blacklist`]: registry::Blacklist
//! [`Resolver`]: registry::Resolver
//! [`Dispatcher`]: dispatcher::Dispatcher
//! [`AllowAll`]: collaborators::AllowAll
//! [`RoleTable`]: collaborators::RoleTable
//! [`SuspensionSwitch`]: collaborators::SuspensionSwitch
//! [`MemoryStorage`]: storage::MemoryStorage
//! [`Observer`]: observer::Observer
//! [`RegistryEvent`]: observer::RegistryEvent

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Forwards to `tracing` when the feature is enabled; compiles to nothing otherwise.
macro_rules! emit {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::$level!($($arg)+);
        }
    };
}

// Re-export core traits
pub use pivot_core;

// Modules
pub mod collaborators;
pub mod config;
pub mod dispatcher;
pub mod observer;
pub mod registry;
pub mod storage;
pub mod testing;

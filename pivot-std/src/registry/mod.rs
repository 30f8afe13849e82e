//! Versioned module registry, configuration registry and blacklist.
//!
//! The three stores are plain data structures; [`Resolver`] combines them
//! behind one lock and adds authorization, suspension and notifications.

mod blacklist;
mod configurations;
mod modules;
mod resolver;

pub use blacklist::Blacklist;
pub use configurations::{
    BatchOutcome, ConfigurationRegistry, ConfigurationSnapshot, ConfiguredModule, Implementation,
};
pub use modules::{ModuleRecord, ModuleRegistry};
pub use resolver::{Resolver, ResolverBuilder};

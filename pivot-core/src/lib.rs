//! # pivot-core
//!
//! Core traits and types for the Pivot module registry and dispatcher.
//!
//! This crate has minimal dependencies and is meant to be imported by logic
//! module authors that don't need the full `pivot-std` implementation.
//!
//! # Layers
//!
//! Pivot separates three concerns, each with its own vocabulary:
//!
//! ## Modules ([`Module`])
//!
//! A module is a stateless implementation of a fixed set of operations. It is
//! invoked with the entity's [`Storage`], the [`OperationId`] being called and
//! the raw [`Calldata`] arguments. All durable state lives in the storage, never
//! in the module.
//!
//! ## Versions ([`GlobalVersion`], [`ConfigurationVersion`])
//!
//! Module implementations are grouped into global versions; named
//! configurations pick, per global version, which implementation serves each
//! module key. Both counters start at zero, which never denotes a real version.
//!
//! ## Collaborators ([`AccessControl`], [`Suspension`])
//!
//! Every mutation is gated by a capability check and a suspension check that
//! are delegated to external collaborators.
//!
//! # Error Types
//!
//! - [`PivotError`] - Top-level error type
//! - [`ValidationError`] - Rejected input, nothing was written
//! - [`StateError`] - Resolution failures at call time
//! - [`AccessError`] - Missing standing or wrong lifecycle phase

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod access;
mod calldata;
mod error;
mod id;
mod module;
mod page;
mod storage;
mod version;

// Re-exports
pub use access::{AccessControl, Capability, Suspension};
pub use calldata::Calldata;
pub use error::{AccessError, BoxError, ErrorKind, PivotError, StateError, ValidationError};
pub use id::{CallerId, ConfigurationId, ModuleKey, OperationId};
pub use module::{DynModule, Module, ModuleHandle};
pub use page::Page;
pub use storage::Storage;
pub use version::{ConfigurationVersion, GlobalVersion, VersionStatus};

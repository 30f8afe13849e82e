//! Error types for Pivot.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PivotError`] - Top-level error type for all Pivot operations
//! - [`ValidationError`] - Rejected input; the caller must fix it and retry
//! - [`StateError`] - Resolution failures; retry after an administrative fix
//! - [`AccessError`] - Missing capability or wrong lifecycle phase
//!
//! Every mutation that returns an error has left no state behind.

use crate::{
    access::Capability,
    id::{CallerId, ConfigurationId, ModuleKey, OperationId},
    version::{ConfigurationVersion, GlobalVersion},
};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Pivot operations.
#[derive(Error, Debug)]
pub enum PivotError {
    /// The request was malformed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The request could not be resolved against the current state.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The caller lacks standing, or the subsystem is in the wrong phase.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// The module that served the call failed; its error is passed through.
    #[error(transparent)]
    Module(BoxError),
}

/// Input rejected before any state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A key or identifier was the zero (empty) value.
    #[error("zero key is not a valid identifier")]
    ZeroKeyInvalid,

    /// The same key appeared twice in one batch.
    #[error("duplicate key in batch: {0}")]
    DuplicateKeyInBatch(ModuleKey),

    /// A registration omitted keys present in the latest global version.
    #[error("registration omits previously registered keys: {}", join(.missing))]
    IncompleteKeySet {
        /// Keys of the latest version that the batch did not re-declare.
        missing: Vec<ModuleKey>,
    },

    /// Nothing to apply.
    #[error("batch is empty")]
    EmptyBatch,

    /// A single call carried more entries than the configured limit.
    #[error("batch of {len} entries exceeds the limit of {max}")]
    BatchTooLarge {
        /// Entries in the rejected call.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A registration entry carried the "no implementation" handle.
    #[error("no implementation supplied for key {0}")]
    MissingImplementation(ModuleKey),

    /// A configuration selected a key that the chosen global version lacks.
    #[error("module {key} is not part of global version {version}")]
    ModuleNotInVersion {
        /// Requested key.
        key: ModuleKey,
        /// Requested global version.
        version: GlobalVersion,
    },

    /// Two modules of one configuration expose the same operation.
    #[error("operation {operation} is provided by both {first} and {second}")]
    OperationConflict {
        /// Contested operation.
        operation: OperationId,
        /// Module that claimed it first.
        first: ModuleKey,
        /// Module that claimed it again.
        second: ModuleKey,
    },
}

/// The request cannot be resolved against the committed state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Version `0` or a version that was never created.
    #[error("global version {0} does not exist")]
    VersionDoesNotExist(GlobalVersion),

    /// The global version was soft-disabled and cannot be newly selected.
    #[error("global version {0} is deactivated")]
    VersionDeactivated(GlobalVersion),

    /// No finalized configuration version with this number.
    #[error("configuration {id} has no finalized version {version}")]
    ConfigurationVersionDoesNotExist {
        /// Configuration name.
        id: ConfigurationId,
        /// Requested version.
        version: ConfigurationVersion,
    },

    /// No module of the pinned configuration implements the operation.
    #[error("operation not supported: {0}")]
    OperationNotSupported(OperationId),

    /// The operation is blacklisted for the pinned configuration.
    #[error("operation blacklisted: {0}")]
    OperationBlacklisted(OperationId),

    /// The dispatcher has not been pointed at a configuration yet.
    #[error("dispatcher is not configured")]
    NotConfigured,
}

/// The caller lacks standing or the subsystem is in the wrong phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The access-control collaborator refused the capability.
    #[error("{caller} lacks capability {capability:?}")]
    NotAuthorized {
        /// Rejected caller.
        caller: CallerId,
        /// Capability that was checked.
        capability: Capability,
    },

    /// The suspension collaborator reports the subsystem as suspended.
    #[error("subsystem is suspended")]
    Suspended,

    /// The dispatcher was already initialized.
    #[error("dispatcher is already initialized")]
    AlreadyInitialized,

    /// Another caller owns the in-progress batch for this configuration.
    #[error("configuration {id} has a batch in progress owned by {owner}")]
    BatchOwnedByOtherCaller {
        /// Configuration name.
        id: ConfigurationId,
        /// Caller that opened the batch.
        owner: CallerId,
    },
}

/// Coarse error category, for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fix the input and retry.
    Validation,
    /// Retry after an administrative fix.
    State,
    /// The caller lacks standing or the phase is wrong.
    Authorization,
    /// The module itself failed.
    Module,
}

impl PivotError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PivotError::Validation(_) => ErrorKind::Validation,
            PivotError::State(_) => ErrorKind::State,
            PivotError::Access(_) => ErrorKind::Authorization,
            PivotError::Module(_) => ErrorKind::Module,
        }
    }

    /// The validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            PivotError::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// The state error, if this is one.
    pub fn as_state(&self) -> Option<&StateError> {
        match self {
            PivotError::State(err) => Some(err),
            _ => None,
        }
    }

    /// The access error, if this is one.
    pub fn as_access(&self) -> Option<&AccessError> {
        match self {
            PivotError::Access(err) => Some(err),
            _ => None,
        }
    }
}

// Convenience conversions
impl From<BoxError> for PivotError {
    fn from(err: BoxError) -> Self {
        PivotError::Module(err)
    }
}

fn join(keys: &[ModuleKey]) -> String {
    keys.iter()
        .map(ModuleKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

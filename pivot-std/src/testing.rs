//! Testing utilities for Pivot.
//!
//! This module provides ready-made modules and observers for exercising
//! registries and dispatchers in tests.
//!
//! # Contents
//!
//! - [`RecordingObserver`]: An observer that records every event it receives
//! - [`EchoModule`]: A module that replies with its arguments
//! - [`CountingModule`]: A module that keeps a counter in entity storage
//! - [`FailingModule`]: A module whose every operation fails

use crate::observer::{Observer, RegistryEvent};
use parking_lot::Mutex;
use pivot_core::{BoxError, Calldata, Module, OperationId, Storage};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Collect operation ids from names.
pub fn operation_ids<I>(names: I) -> Vec<OperationId>
where
    I: IntoIterator,
    I::Item: Into<OperationId>,
{
    names.into_iter().map(Into::into).collect()
}

// ============================================================================
// Recording Observer
// ============================================================================

/// An observer that records every event it receives.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingObserver::new();
/// let resolver = Resolver::builder().observer(recorder.clone()).build();
///
/// resolver.register_modules(&admin, batch)?;
///
/// assert_eq!(recorder.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<RegistryEvent>>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &RegistryEvent) {
        self.events.lock().push(event.clone());
    }
}

// ============================================================================
// Echo Module
// ============================================================================

/// A module that replies with its arguments for every declared operation.
#[derive(Debug, Clone)]
pub struct EchoModule {
    name: String,
    operations: Vec<OperationId>,
}

impl EchoModule {
    /// Create an echo module serving `operations`.
    pub fn new<I>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OperationId>,
    {
        Self {
            name: name.into(),
            operations: operation_ids(operations),
        }
    }
}

impl Module for EchoModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<OperationId> {
        self.operations.clone()
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

// ============================================================================
// Counting Module
// ============================================================================

/// Storage slot holding the counter.
pub const COUNTER_SLOT: &str = "counter";

/// A module that keeps a counter in entity storage.
///
/// Serves `increment` (adds the step, replies with the new value) and
/// `current` (replies with the value). Values are little-endian `u64`s.
/// The step lets two implementations of the same key behave differently
/// while sharing the storage layout.
///
/// The invocation count behind [`calls`](Self::calls) is a test spy, not
/// module state: it is never read while serving an operation, so replies
/// depend only on storage and arguments.
#[derive(Debug, Clone)]
pub struct CountingModule {
    name: String,
    step: u64,
    // Write-only from `invoke`.
    calls: Arc<AtomicUsize>,
}

impl CountingModule {
    /// Create a counter that increments by one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step: 1,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Increment by `step` instead.
    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    /// Number of invocations so far, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn read(storage: &dyn Storage) -> u64 {
        storage
            .load(COUNTER_SLOT)
            .and_then(|bytes| Calldata::new(bytes).to_u64())
            .unwrap_or(0)
    }
}

impl Module for CountingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<OperationId> {
        operation_ids(["increment", "current"])
    }

    async fn invoke(
        &self,
        storage: &dyn Storage,
        operation: &OperationId,
        _args: Calldata,
    ) -> Result<Calldata, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = Self::read(storage);
        match operation.as_str() {
            "increment" => {
                let next = value.checked_add(self.step).ok_or("counter overflow")?;
                storage.store(COUNTER_SLOT, Calldata::from_u64(next).into_inner());
                Ok(Calldata::from_u64(next))
            }
            "current" => Ok(Calldata::from_u64(value)),
            other => Err(format!("{} does not serve {other}", self.name).into()),
        }
    }
}

// ============================================================================
// Failing Module
// ============================================================================

/// A module whose every operation fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingModule {
    name: String,
    operations: Vec<OperationId>,
    message: String,
}

impl FailingModule {
    /// Create a module failing every one of `operations` with `message`.
    pub fn new<I>(name: impl Into<String>, operations: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OperationId>,
    {
        Self {
            name: name.into(),
            operations: operation_ids(operations),
            message: message.into(),
        }
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<OperationId> {
        self.operations.clone()
    }

    async fn invoke(
        &self,
        _storage: &dyn Storage,
        _operation: &OperationId,
        _args: Calldata,
    ) -> Result<Calldata, BoxError> {
        Err(self.message.clone().into())
    }
}
